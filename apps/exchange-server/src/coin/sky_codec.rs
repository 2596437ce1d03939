// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Skycoin Encoding
//!
//! Address and unsigned-transaction encoding for the Skycoin chain.
//!
//! ## Addresses
//!
//! `key = RIPEMD160(SHA256(SHA256(pubkey)))`, rendered as base58 of
//! `key (20) || version (1) || checksum (4)` where the checksum is the first
//! four bytes of `SHA256(key || version)`.
//!
//! ## Transactions
//!
//! Little-endian, length-prefixed:
//!
//! ```text
//! length u32 | type u8 | inner_hash [32] | sigs (u32 count) | inputs (u32 count, [32] each)
//!   | outputs (u32 count, version u8 + key [20] + coins u64 + hours u64 each)
//! ```
//!
//! `inner_hash = SHA256(encode(inputs) || encode(outputs))`.

use std::fmt;
use std::str::FromStr;

use bitcoin::hashes::{ripemd160, Hash};
use sha2::{Digest, Sha256};

/// Droplets per whole coin.
pub const DROPLETS_PER_COIN: u64 = 1_000_000;
const COIN_DECIMALS: usize = 6;

pub const ADDRESS_VERSION: u8 = 0;
const KEY_LEN: usize = 20;
const CHECKSUM_LEN: usize = 4;
const OUTPUT_LEN: usize = 1 + KEY_LEN + 8 + 8;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid skycoin address: {0}")]
    InvalidAddress(String),
    #[error("invalid unspent output hash: {0}")]
    InvalidHash(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkyAddress {
    pub version: u8,
    pub key: [u8; KEY_LEN],
}

impl SkyAddress {
    /// Address for a compressed secp256k1 public key.
    pub fn from_public_key(compressed: &[u8]) -> Self {
        let inner = sha256(&sha256(compressed));
        let key = ripemd160::Hash::hash(&inner).to_byte_array();
        Self {
            version: ADDRESS_VERSION,
            key,
        }
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let mut data = Vec::with_capacity(KEY_LEN + 1);
        data.extend_from_slice(&self.key);
        data.push(self.version);
        let digest = sha256(&data);
        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(&digest[..CHECKSUM_LEN]);
        out
    }
}

impl fmt::Display for SkyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = Vec::with_capacity(KEY_LEN + 1 + CHECKSUM_LEN);
        raw.extend_from_slice(&self.key);
        raw.push(self.version);
        raw.extend_from_slice(&self.checksum());
        f.write_str(&bitcoin::base58::encode(&raw))
    }
}

impl FromStr for SkyAddress {
    type Err = CodecError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || CodecError::InvalidAddress(value.to_string());

        let raw = bitcoin::base58::decode(value.trim()).map_err(|_| invalid())?;
        if raw.len() != KEY_LEN + 1 + CHECKSUM_LEN {
            return Err(invalid());
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&raw[..KEY_LEN]);
        let address = SkyAddress {
            version: raw[KEY_LEN],
            key,
        };

        if address.version != ADDRESS_VERSION || address.checksum()[..] != raw[KEY_LEN + 1..] {
            return Err(invalid());
        }
        Ok(address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkyOutput {
    pub address: SkyAddress,
    pub coins: u64,
    pub hours: u64,
}

/// A transaction with no signatures yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsignedTx {
    pub inputs: Vec<[u8; 32]>,
    pub outputs: Vec<SkyOutput>,
}

impl UnsignedTx {
    fn encode_inputs(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.inputs.len() * 32);
        out.extend_from_slice(&len_prefix(self.inputs.len()));
        for input in &self.inputs {
            out.extend_from_slice(input);
        }
        out
    }

    fn encode_outputs(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.outputs.len() * OUTPUT_LEN);
        out.extend_from_slice(&len_prefix(self.outputs.len()));
        for output in &self.outputs {
            out.push(output.address.version);
            out.extend_from_slice(&output.address.key);
            out.extend_from_slice(&output.coins.to_le_bytes());
            out.extend_from_slice(&output.hours.to_le_bytes());
        }
        out
    }

    pub fn inner_hash(&self) -> [u8; 32] {
        let mut data = self.encode_inputs();
        data.extend_from_slice(&self.encode_outputs());
        sha256(&data)
    }

    pub fn encode(&self) -> Vec<u8> {
        let inputs = self.encode_inputs();
        let outputs = self.encode_outputs();
        let total = 4 + 1 + 32 + 4 + inputs.len() + outputs.len();

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&len_prefix(total));
        out.push(0); // transaction type
        out.extend_from_slice(&self.inner_hash());
        out.extend_from_slice(&0u32.to_le_bytes()); // no signatures
        out.extend_from_slice(&inputs);
        out.extend_from_slice(&outputs);
        out
    }

    pub fn encode_hex(&self) -> String {
        hex::encode(self.encode())
    }
}

pub fn parse_hash(value: &str) -> Result<[u8; 32], CodecError> {
    let bytes = hex::decode(value.trim()).map_err(|_| CodecError::InvalidHash(value.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| CodecError::InvalidHash(value.to_string()))
}

/// Parse a decimal coin amount (up to six decimals) into droplets.
pub fn parse_coins(value: &str) -> Option<u64> {
    let value = value.trim();
    let (whole, frac) = value.split_once('.').unwrap_or((value, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if frac.len() > COIN_DECIMALS
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac: u64 = format!("{frac:0<width$}", width = COIN_DECIMALS).parse().ok()?;
    whole.checked_mul(DROPLETS_PER_COIN)?.checked_add(frac)
}

fn len_prefix(len: usize) -> [u8; 4] {
    u32::try_from(len).unwrap_or(u32::MAX).to_le_bytes()
}

fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure::KeyPair;

    fn address() -> SkyAddress {
        SkyAddress::from_public_key(&KeyPair::generate().public_bytes())
    }

    #[test]
    fn address_string_round_trips() {
        let address = address();
        let text = address.to_string();
        assert_eq!(text.parse::<SkyAddress>().unwrap(), address);
    }

    #[test]
    fn corrupted_address_is_rejected() {
        let text = address().to_string();
        let mut chars: Vec<char> = text.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == '2' { '3' } else { '2' };
        let corrupted: String = chars.into_iter().collect();

        assert!(corrupted.parse::<SkyAddress>().is_err());
        assert!("1Bxyz".parse::<SkyAddress>().is_err());
        assert!("".parse::<SkyAddress>().is_err());
    }

    #[test]
    fn encodes_layout() {
        let tx = UnsignedTx {
            inputs: vec![[0x11; 32], [0x22; 32]],
            outputs: vec![SkyOutput {
                address: address(),
                coins: 2_500_000,
                hours: 7,
            }],
        };
        let bytes = tx.encode();

        let expected_len = 4 + 1 + 32 + 4 + (4 + 64) + (4 + OUTPUT_LEN);
        assert_eq!(bytes.len(), expected_len);
        assert_eq!(&bytes[..4], &(expected_len as u32).to_le_bytes());
        assert_eq!(bytes[4], 0);
        assert_eq!(&bytes[5..37], &tx.inner_hash());
        assert_eq!(&bytes[37..41], &0u32.to_le_bytes());
        assert_eq!(&bytes[41..45], &2u32.to_le_bytes());

        let coins_at = expected_len - 16;
        assert_eq!(&bytes[coins_at..coins_at + 8], &2_500_000u64.to_le_bytes());
        assert_eq!(&bytes[expected_len - 8..], &7u64.to_le_bytes());
    }

    #[test]
    fn inner_hash_covers_outputs() {
        let mut tx = UnsignedTx {
            inputs: vec![[0x11; 32]],
            outputs: vec![SkyOutput {
                address: address(),
                coins: 1,
                hours: 0,
            }],
        };
        let before = tx.inner_hash();
        tx.outputs[0].hours = 1;
        assert_ne!(before, tx.inner_hash());
    }

    #[test]
    fn coin_amounts() {
        assert_eq!(parse_coins("1"), Some(1_000_000));
        assert_eq!(parse_coins("2.5"), Some(2_500_000));
        assert_eq!(parse_coins("0.000001"), Some(1));
        assert_eq!(parse_coins(".5"), Some(500_000));
        assert_eq!(parse_coins("1.0000001"), None);
        assert_eq!(parse_coins("-1"), None);
        assert_eq!(parse_coins("abc"), None);
        assert_eq!(parse_coins(""), None);
    }

    #[test]
    fn hash_parsing() {
        assert_eq!(parse_hash(&"ab".repeat(32)).unwrap(), [0xab; 32]);
        assert!(parse_hash("abc123").is_err());
    }
}
