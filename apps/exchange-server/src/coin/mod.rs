// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Coin Gateways
//!
//! One [`CoinGateway`] implementation per supported chain, selected through
//! the [`GatewayRegistry`] by [`CoinType`].
//!
//! Gateways talk to their chain daemon over HTTP and normalize what comes
//! back. Building a raw transaction is purely local and never touches the
//! daemon.

use async_trait::async_trait;

use crate::error::ExchangeError;
use crate::models::CoinType;

pub mod btc;
pub mod daemon;
pub mod registry;
pub mod sky;
pub mod sky_codec;
pub mod types;

pub use btc::BitcoinGateway;
pub use registry::GatewayRegistry;
pub use sky::SkycoinGateway;
pub use types::{Balance, NormalizedInput, NormalizedOutput, NormalizedTx, TxIn, TxOut};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("transaction not found: {0}")]
    NotFound(String),
    /// The daemon refused the request (bad transaction, double spend, ...).
    #[error("rejected: {0}")]
    Rejected(String),
    /// Transport, timeout or decoding failure.
    #[error("upstream: {0}")]
    Upstream(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<GatewayError> for ExchangeError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(txid) => ExchangeError::NotFound(format!("transaction {txid} not found")),
            GatewayError::Rejected(msg) => ExchangeError::RejectedByNetwork(msg),
            GatewayError::Upstream(msg) => ExchangeError::Upstream(msg),
            GatewayError::InvalidRequest(msg) => ExchangeError::InvalidRequest(msg),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Uniform operations over one chain.
#[async_trait]
pub trait CoinGateway: Send + Sync {
    fn coin_type(&self) -> CoinType;

    async fn get_tx(&self, txid: &str) -> GatewayResult<NormalizedTx>;

    /// Serialized transaction, hex encoded, exactly as the chain stores it.
    async fn get_raw_tx(&self, txid: &str) -> GatewayResult<String>;

    /// Broadcast a hex-encoded raw transaction and return its id.
    async fn inject_tx(&self, raw_tx: &str) -> GatewayResult<String>;

    async fn get_balance(&self, addresses: &[String]) -> GatewayResult<Balance>;

    /// Build an unsigned transaction, hex encoded.
    fn create_raw_tx(&self, inputs: &[TxIn], outputs: &[TxOut]) -> GatewayResult<String>;
}

/// Whether `value` is a 32-byte hash in hex.
pub(crate) fn is_hash_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}
