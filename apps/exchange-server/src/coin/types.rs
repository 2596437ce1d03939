// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain-neutral transaction and balance shapes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::CoinType;

/// Reference to a previously unspent output.
///
/// Bitcoin inputs use `txid` + `vout`; Skycoin inputs are unspent-output
/// hashes and ignore `vout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TxIn {
    pub txid: String,
    #[serde(default)]
    pub vout: u32,
}

/// Requested transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TxOut {
    pub address: String,
    /// Amount in the smallest unit (satoshis or droplets).
    pub value: u64,
    /// Coin hours. Skycoin only.
    #[serde(default)]
    pub hours: u64,
}

/// Confirmed balance over a set of addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Balance {
    pub amount: u64,
    pub hours: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NormalizedInput {
    pub txid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vout: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NormalizedOutput {
    pub address: String,
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<u64>,
}

/// A transaction as seen through any gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NormalizedTx {
    pub coin_type: CoinType,
    pub txid: String,
    pub inputs: Vec<NormalizedInput>,
    pub outputs: Vec<NormalizedOutput>,
    pub confirmed: bool,
    /// Block height, `0` while unconfirmed.
    pub height: u64,
}
