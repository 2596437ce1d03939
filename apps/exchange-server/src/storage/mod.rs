// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! File-backed JSON persistence under `DATA_DIR`.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   wallets/
//!     {wallet_id}.json   # Wallet record: owner, coins, key chains, issued addresses
//! ```
//!
//! Writes go to a temporary file first and are renamed into place, so a
//! record on disk is always either the old or the new version.

pub mod fs;
pub mod paths;

pub use fs::{JsonStorage, StorageError, StorageResult};
pub use paths::StoragePaths;
