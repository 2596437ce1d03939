// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sky Exchange - Bitcoin and Skycoin exchange backend
//!
//! Accounts are identified by secp256k1 public keys. Every account-bearing
//! request and reply travels inside an ECDH + AES-256-GCM sealed envelope.
//!
//! ## Modules
//!
//! - `secure` - Envelope codec, replay guard and the sealed-request extractor
//! - `account` - Per-account balances and wallet-mutation serialization
//! - `coin` - Coin gateways over the Bitcoin and Skycoin daemons
//! - `wallet` - File-backed deterministic wallets
//! - `api` - HTTP API handlers (Axum)
//! - `balance_poller` - Background balance refresh
//! - `client` - Typed client for the sealed API
//! - `storage` - Atomic JSON file storage

pub mod account;
pub mod api;
pub mod balance_poller;
pub mod client;
pub mod coin;
pub mod config;
pub mod error;
pub mod models;
pub mod secure;
pub mod state;
pub mod storage;
pub mod wallet;
