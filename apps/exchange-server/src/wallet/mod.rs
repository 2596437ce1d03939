// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Manager
//!
//! Owns key material and address derivation. Accounts only hold a wallet id
//! and go through [`WalletManager`] for everything else.
//!
//! The trait is synchronous: implementations do blocking file I/O and are
//! called from async code through [`run_blocking`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;
use crate::models::CoinType;
use crate::storage::StorageError;

pub mod keys;
pub mod store;

pub use store::FsWalletManager;

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("wallet not found: {0}")]
    NotFound(String),
    #[error("wallet already exists: {0}")]
    AlreadyExists(String),
    #[error("address not in wallet: {0}")]
    UnknownAddress(String),
    #[error("wallet does not track {0}")]
    CoinNotTracked(CoinType),
    #[error("empty wallet seed")]
    EmptySeed,
    #[error("wallet needs at least one coin type")]
    NoCoins,
    #[error("key derivation failed: {0}")]
    Derivation(String),
    #[error("wallet storage: {0}")]
    Storage(#[from] StorageError),
}

impl From<WalletError> for ExchangeError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::NotFound(_) => ExchangeError::invalid("unknown wallet"),
            WalletError::AlreadyExists(_) => ExchangeError::invalid("wallet already exists"),
            WalletError::UnknownAddress(_) => ExchangeError::invalid("unknown address"),
            WalletError::CoinNotTracked(coin) => ExchangeError::UnsupportedCoin(coin.to_string()),
            WalletError::EmptySeed => ExchangeError::invalid("no seed"),
            WalletError::NoCoins => ExchangeError::invalid("no coin_type"),
            WalletError::Derivation(msg) => ExchangeError::server(msg),
            WalletError::Storage(e) => ExchangeError::server(e.to_string()),
        }
    }
}

pub type WalletResult<T> = Result<T, WalletError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInfo {
    pub id: String,
    /// Account id of the creator.
    pub owner: String,
    pub coins: Vec<CoinType>,
    pub created_at: DateTime<Utc>,
}

/// Key-pair of an issued address, both hex encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressKeys {
    pub pubkey: String,
    pub seckey: String,
}

pub trait WalletManager: Send + Sync {
    /// Create a wallet tracking `coins`, derived from `seed`.
    ///
    /// The id is a function of `(owner, coins, seed)`; creating the same
    /// wallet twice fails with [`WalletError::AlreadyExists`] carrying the id.
    fn create(&self, owner: &str, coins: &[CoinType], seed: &str) -> WalletResult<String>;

    /// Derive, persist and return `count` new addresses.
    fn new_addresses(&self, wallet_id: &str, coin: CoinType, count: usize) -> WalletResult<Vec<String>>;

    /// All addresses issued so far for `coin`, oldest first.
    fn addresses(&self, wallet_id: &str, coin: CoinType) -> WalletResult<Vec<String>>;

    fn keypair(&self, wallet_id: &str, address: &str) -> WalletResult<AddressKeys>;

    fn info(&self, wallet_id: &str) -> WalletResult<WalletInfo>;
}

/// Run a blocking wallet call off the async runtime.
pub async fn run_blocking<T, F>(wallets: &Arc<dyn WalletManager>, f: F) -> Result<T, ExchangeError>
where
    T: Send + 'static,
    F: FnOnce(&dyn WalletManager) -> WalletResult<T> + Send + 'static,
{
    let wallets = Arc::clone(wallets);
    tokio::task::spawn_blocking(move || f(wallets.as_ref()))
        .await
        .map_err(|e| ExchangeError::server(format!("wallet task failed: {e}")))?
        .map_err(ExchangeError::from)
}
