// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sealed Envelopes
//!
//! Per-message authenticated encryption between two secp256k1 identities.
//! No session is kept: each envelope carries the sender key, a timestamp and
//! a fresh nonce, which is enough for the recipient to derive the same key.
//!
//! ## Layout (version 1)
//!
//! ```text
//! version (1) | sender pubkey (33) | timestamp ms BE (8) | nonce (12) | ciphertext + tag
//! ```
//!
//! The 54-byte header is bound as associated data, so any modified byte
//! anywhere in the envelope fails authentication.
//!
//! ## Key Derivation
//!
//! ECDH over secp256k1, then HKDF-SHA256 with the nonce as salt and
//! `"skyexchange/envelope/v1" || sender_pk || recipient_pk` as info.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use k256::{ecdh::diffie_hellman, PublicKey, SecretKey};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

use super::keys::{public_key_bytes, KeyPair, PUBLIC_KEY_LEN};

pub const VERSION: u8 = 1;
pub const NONCE_LEN: usize = 12;
const TIMESTAMP_LEN: usize = 8;
const TAG_LEN: usize = 16;
pub const HEADER_LEN: usize = 1 + PUBLIC_KEY_LEN + TIMESTAMP_LEN + NONCE_LEN;

const KDF_INFO: &[u8] = b"skyexchange/envelope/v1";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Malformed, tampered, or addressed to another key.
    #[error("envelope authentication failed")]
    AuthenticationFailure,
    #[error("failed to seal envelope")]
    SealFailure,
}

/// A successfully authenticated and decrypted envelope.
#[derive(Debug, Clone)]
pub struct OpenedEnvelope {
    pub sender: PublicKey,
    pub timestamp_ms: u64,
    pub nonce: [u8; NONCE_LEN],
    pub payload: Vec<u8>,
}

pub fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Seal `payload` from `sender` to `recipient`, stamped with the current time.
pub fn encrypt(
    payload: &[u8],
    sender: &KeyPair,
    recipient: &PublicKey,
) -> Result<Vec<u8>, EnvelopeError> {
    encrypt_at(payload, sender, recipient, now_ms())
}

pub fn encrypt_at(
    payload: &[u8],
    sender: &KeyPair,
    recipient: &PublicKey,
    timestamp_ms: u64,
) -> Result<Vec<u8>, EnvelopeError> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let sender_pk = sender.public_bytes();
    let recipient_pk = public_key_bytes(recipient);

    let mut envelope = Vec::with_capacity(HEADER_LEN + payload.len() + TAG_LEN);
    envelope.push(VERSION);
    envelope.extend_from_slice(&sender_pk);
    envelope.extend_from_slice(&timestamp_ms.to_be_bytes());
    envelope.extend_from_slice(&nonce);

    let key = derive_key(sender.secret(), recipient, &nonce, &sender_pk, &recipient_pk)
        .ok_or(EnvelopeError::SealFailure)?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| EnvelopeError::SealFailure)?;
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: payload,
                aad: &envelope,
            },
        )
        .map_err(|_| EnvelopeError::SealFailure)?;

    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Authenticate and decrypt an envelope addressed to `recipient`.
///
/// Every failure, including a truncated or malformed header, collapses to
/// [`EnvelopeError::AuthenticationFailure`].
pub fn decrypt(envelope: &[u8], recipient: &KeyPair) -> Result<OpenedEnvelope, EnvelopeError> {
    if envelope.len() < HEADER_LEN + TAG_LEN || envelope[0] != VERSION {
        return Err(EnvelopeError::AuthenticationFailure);
    }

    let (header, ciphertext) = envelope.split_at(HEADER_LEN);
    let sender_pk = &header[1..1 + PUBLIC_KEY_LEN];
    let sender = PublicKey::from_sec1_bytes(sender_pk)
        .map_err(|_| EnvelopeError::AuthenticationFailure)?;

    let mut timestamp = [0u8; TIMESTAMP_LEN];
    timestamp.copy_from_slice(&header[1 + PUBLIC_KEY_LEN..1 + PUBLIC_KEY_LEN + TIMESTAMP_LEN]);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&header[HEADER_LEN - NONCE_LEN..]);

    let recipient_pk = recipient.public_bytes();
    let key = derive_key(recipient.secret(), &sender, &nonce, sender_pk, &recipient_pk)
        .ok_or(EnvelopeError::AuthenticationFailure)?;
    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|_| EnvelopeError::AuthenticationFailure)?;
    let payload = cipher
        .decrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: ciphertext,
                aad: header,
            },
        )
        .map_err(|_| EnvelopeError::AuthenticationFailure)?;

    Ok(OpenedEnvelope {
        sender,
        timestamp_ms: u64::from_be_bytes(timestamp),
        nonce,
        payload,
    })
}

fn derive_key(
    secret: &SecretKey,
    peer: &PublicKey,
    nonce: &[u8; NONCE_LEN],
    sender_pk: &[u8],
    recipient_pk: &[u8],
) -> Option<[u8; 32]> {
    let shared = diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
    let hkdf = shared.extract::<Sha256>(Some(&nonce[..]));
    let mut key = [0u8; 32];
    hkdf.expand_multi_info(&[KDF_INFO, sender_pk, recipient_pk], &mut key)
        .ok()?;
    Some(key)
}
