// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Ledger
//!
//! Per-account balances and wallet references, safe under concurrent
//! requests.
//!
//! ## Locking
//!
//! Each [`AccountState`] owns two independent locks:
//!
//! - a read/write lock over its balance map (many readers or one writer);
//! - an async mutex serializing wallet mutations such as address derivation.
//!
//! The ledger's own map lock is only held to look an account up or to
//! insert one, never across I/O.

pub mod ledger;
pub mod state;

pub use ledger::AccountLedger;
pub use state::AccountState;
