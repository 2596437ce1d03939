// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Secure Channel
//!
//! Every account-bearing request and reply travels as a sealed envelope
//! (see [`envelope`]). On HTTP the binary envelope is base64 encoded and
//! carried as [`SealedMessage`].
//!
//! ## Flow
//!
//! 1. [`extractor::Sealed`] opens the inbound envelope with the server key,
//!    enforces the replay window and yields a [`CallerContext`] for the
//!    sender together with the decoded request.
//! 2. Handlers run with that context passed explicitly.
//! 3. [`reply::sealed_reply`] seals the outcome, success or failure, back to
//!    the caller's key.

use std::time::Duration;

use base64ct::{Base64, Encoding};
use k256::PublicKey;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::{IntoParams, ToSchema};

use crate::error::ExchangeError;
use crate::models::AccountId;

pub mod envelope;
pub mod extractor;
pub mod keys;
pub mod replay;
pub mod reply;

pub use envelope::EnvelopeError;
pub use extractor::Sealed;
pub use keys::KeyPair;
pub use replay::ReplayGuard;

/// Wire form of an envelope: base64 of the binary layout.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SealedMessage {
    /// Base64 of the binary envelope.
    pub envelope: String,
}

impl SealedMessage {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            envelope: Base64::encode_string(bytes),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        Base64::decode_vec(self.envelope.trim()).map_err(|_| EnvelopeError::AuthenticationFailure)
    }
}

/// Identity of the party that sealed an inbound request.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub account_id: AccountId,
    pub public_key: PublicKey,
}

impl CallerContext {
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            account_id: AccountId::from_public_key(&public_key),
            public_key,
        }
    }
}

impl From<EnvelopeError> for ExchangeError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::AuthenticationFailure => ExchangeError::AuthenticationFailure,
            EnvelopeError::SealFailure => ExchangeError::server("failed to seal reply"),
        }
    }
}

/// Server side of the channel: the server identity plus the replay guard.
pub struct SecureChannel {
    keys: KeyPair,
    replay: ReplayGuard,
}

impl SecureChannel {
    pub fn new(keys: KeyPair, replay_window: Duration) -> Self {
        Self {
            keys,
            replay: ReplayGuard::new(replay_window, replay::DEFAULT_CAPACITY),
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        self.keys.public_key()
    }

    /// Open an inbound envelope and bind its sender as the caller.
    pub fn open(&self, sealed: &SealedMessage) -> Result<(CallerContext, Vec<u8>), ExchangeError> {
        let bytes = sealed.to_bytes()?;
        let opened = envelope::decrypt(&bytes, &self.keys).inspect_err(|_| {
            debug!(len = bytes.len(), "Rejected envelope that failed authentication");
        })?;

        let sender = keys::public_key_bytes(&opened.sender);
        self.replay
            .check(sender, opened.nonce, opened.timestamp_ms, envelope::now_ms())
            .map_err(|err| {
                warn!(sender = %hex::encode(sender), error = %err, "Rejected replayed envelope");
                ExchangeError::AuthenticationFailure
            })?;

        Ok((CallerContext::new(opened.sender), opened.payload))
    }

    /// Seal a payload addressed to `recipient`.
    pub fn seal(&self, recipient: &PublicKey, payload: &[u8]) -> Result<SealedMessage, ExchangeError> {
        let bytes = envelope::encrypt(payload, &self.keys, recipient)?;
        Ok(SealedMessage::from_bytes(&bytes))
    }
}
