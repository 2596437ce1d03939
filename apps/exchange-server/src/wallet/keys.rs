// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Deterministic key chains and per-coin address encoding.
//!
//! Each wallet keeps one chain per coin:
//!
//! ```text
//! state_0     = SHA256(seed ":" coin)
//! state_{i+1} = SHA256(state_i)
//! secret_i    = SHA256(state_{i+1} || "seckey")
//! ```
//!
//! A candidate secret outside the curve order advances the chain once more.

use bitcoin::{Address, Network};
use k256::SecretKey;
use sha2::{Digest, Sha256};

use super::{WalletError, WalletResult};
use crate::coin::sky_codec::SkyAddress;
use crate::models::CoinType;
use crate::secure::keys::public_key_bytes;

const SECKEY_TAG: &[u8] = b"seckey";

pub fn chain_origin(seed: &str, coin: CoinType) -> [u8; 32] {
    Sha256::digest(format!("{seed}:{coin}").as_bytes()).into()
}

/// Advance the chain and return the new state with its secret key.
pub fn derive_next(state: &[u8; 32]) -> ([u8; 32], SecretKey) {
    let mut next: [u8; 32] = Sha256::digest(state).into();
    loop {
        let mut hasher = Sha256::new();
        hasher.update(next);
        hasher.update(SECKEY_TAG);
        let candidate: [u8; 32] = hasher.finalize().into();
        if let Ok(secret) = SecretKey::from_slice(&candidate) {
            return (next, secret);
        }
        next = Sha256::digest(next).into();
    }
}

/// Receiving address of `secret` on `coin`.
pub fn address_for(coin: CoinType, secret: &SecretKey, network: Network) -> WalletResult<String> {
    let compressed = public_key_bytes(&secret.public_key());
    match coin {
        CoinType::Bitcoin => {
            let public = bitcoin::PublicKey::from_slice(&compressed)
                .map_err(|e| WalletError::Derivation(e.to_string()))?;
            Ok(Address::p2pkh(public.pubkey_hash(), network).to_string())
        }
        CoinType::Skycoin => Ok(SkyAddress::from_public_key(&compressed).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::address::NetworkUnchecked;

    #[test]
    fn chain_is_deterministic_and_distinct_per_coin() {
        let btc = chain_origin("seed", CoinType::Bitcoin);
        let sky = chain_origin("seed", CoinType::Skycoin);
        assert_ne!(btc, sky);
        assert_eq!(btc, chain_origin("seed", CoinType::Bitcoin));

        let (state_a, key_a) = derive_next(&btc);
        let (state_b, key_b) = derive_next(&btc);
        assert_eq!(state_a, state_b);
        assert_eq!(key_a.to_bytes(), key_b.to_bytes());

        let (_, key_c) = derive_next(&state_a);
        assert_ne!(key_a.to_bytes(), key_c.to_bytes());
    }

    #[test]
    fn bitcoin_addresses_match_network() {
        let (_, secret) = derive_next(&chain_origin("seed", CoinType::Bitcoin));

        let mainnet = address_for(CoinType::Bitcoin, &secret, Network::Bitcoin).unwrap();
        assert!(mainnet.starts_with('1'));
        assert!(mainnet
            .parse::<Address<NetworkUnchecked>>()
            .unwrap()
            .require_network(Network::Bitcoin)
            .is_ok());

        let testnet = address_for(CoinType::Bitcoin, &secret, Network::Testnet).unwrap();
        assert!(testnet.starts_with('m') || testnet.starts_with('n'));
    }

    #[test]
    fn skycoin_addresses_parse_back() {
        let (_, secret) = derive_next(&chain_origin("seed", CoinType::Skycoin));
        let address = address_for(CoinType::Skycoin, &secret, Network::Bitcoin).unwrap();
        assert!(address.parse::<SkyAddress>().is_ok());
    }
}
