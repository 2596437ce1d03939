// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! secp256k1 identity keys.
//!
//! Accounts and the server are identified by compressed SEC1 public keys,
//! exchanged as lowercase hex.

use std::fmt;

use k256::{elliptic_curve::sec1::ToEncodedPoint, pkcs8::DecodePrivateKey, PublicKey, SecretKey};
use rand::rngs::OsRng;

use crate::models::AccountId;

/// Length of a compressed SEC1 public key.
pub const PUBLIC_KEY_LEN: usize = 33;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid hex encoding")]
    InvalidHex,
    #[error("invalid secret key")]
    InvalidSecretKey,
    #[error("invalid PEM private key")]
    InvalidPem,
    #[error("invalid public key")]
    InvalidPublicKey,
}

/// A secp256k1 keypair. The secret never appears in `Debug` output.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self::from_secret(SecretKey::random(&mut OsRng))
    }

    pub fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Parse a 32-byte secret key given as hex.
    pub fn from_secret_hex(value: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(value.trim()).map_err(|_| KeyError::InvalidHex)?;
        let secret = SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_secret(secret))
    }

    /// Parse a secret key given either as hex or as a PKCS#8 / SEC1 PEM document.
    pub fn parse(value: &str) -> Result<Self, KeyError> {
        let value = value.trim();
        if value.starts_with("-----BEGIN") {
            let secret = SecretKey::from_pkcs8_pem(value)
                .or_else(|_| SecretKey::from_sec1_pem(value))
                .map_err(|_| KeyError::InvalidPem)?;
            return Ok(Self::from_secret(secret));
        }
        Self::from_secret_hex(value)
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret.to_bytes())
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        public_key_bytes(&self.public)
    }

    pub fn public_hex(&self) -> String {
        public_key_hex(&self.public)
    }

    pub fn account_id(&self) -> AccountId {
        AccountId::from_public_key(&self.public)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_hex())
            .finish_non_exhaustive()
    }
}

pub fn public_key_bytes(public: &PublicKey) -> [u8; PUBLIC_KEY_LEN] {
    let point = public.to_encoded_point(true);
    let mut out = [0u8; PUBLIC_KEY_LEN];
    out.copy_from_slice(point.as_bytes());
    out
}

pub fn public_key_hex(public: &PublicKey) -> String {
    hex::encode(public_key_bytes(public))
}

/// Parse a hex SEC1 public key (compressed or uncompressed).
pub fn public_key_from_hex(value: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(value).map_err(|_| KeyError::InvalidHex)?;
    PublicKey::from_sec1_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}
