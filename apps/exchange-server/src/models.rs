// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response payloads carried inside sealed envelopes, plus the
//! identifiers shared across the exchange.
//!
//! ## Coin Type
//!
//! [`CoinType`] is the closed set of chains the exchange brokers. Requests
//! carry it as a plain string so an unknown value surfaces as
//! `UnsupportedCoin` instead of a generic decoding failure.
//!
//! ## Reply Shape
//!
//! Every reply is a [`Reply`]: a `result` object followed by the
//! operation-specific fields, which are absent on failure.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use k256::PublicKey;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::coin::{NormalizedTx, TxIn, TxOut};
use crate::error::{ExchangeError, ResultCode};
use crate::secure::keys;

// =============================================================================
// Identifiers
// =============================================================================

/// Chains supported by the exchange.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum CoinType {
    Bitcoin,
    Skycoin,
}

impl CoinType {
    pub const ALL: [CoinType; 2] = [CoinType::Bitcoin, CoinType::Skycoin];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoinType::Bitcoin => "bitcoin",
            CoinType::Skycoin => "skycoin",
        }
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoinType {
    type Err = ExchangeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" => Err(ExchangeError::invalid("missing coin_type")),
            "bitcoin" => Ok(CoinType::Bitcoin),
            "skycoin" => Ok(CoinType::Skycoin),
            other => Err(ExchangeError::UnsupportedCoin(other.to_string())),
        }
    }
}

/// Account identity: the hex-encoded compressed public key of the account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn from_public_key(public: &PublicKey) -> Self {
        AccountId(keys::public_key_hex(public))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = keys::KeyError;

    /// Parses and normalizes a hex public key.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let public = keys::public_key_from_hex(value.trim())?;
        Ok(AccountId::from_public_key(&public))
    }
}

// =============================================================================
// Reply Envelope Contents
// =============================================================================

/// The `result` object present in every reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApiResult {
    pub success: bool,
    pub code: ResultCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ApiResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            code: ResultCode::Success,
            reason: None,
        }
    }
}

impl From<&ExchangeError> for ApiResult {
    fn from(err: &ExchangeError) -> Self {
        Self {
            success: false,
            code: err.code(),
            reason: Some(err.public_reason()),
        }
    }
}

/// Decrypted reply payload: `result` plus the flattened operation fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply<T> {
    pub result: ApiResult,
    #[serde(flatten)]
    pub body: Option<T>,
}

impl<T> Reply<T> {
    pub fn success(body: T) -> Self {
        Self {
            result: ApiResult::ok(),
            body: Some(body),
        }
    }

    pub fn failure(err: &ExchangeError) -> Self {
        Self {
            result: ApiResult::from(err),
            body: None,
        }
    }
}

// =============================================================================
// Account Models
// =============================================================================

/// Registers the envelope sender as an account. Carries no fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateAccountRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAccountResponse {
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DepositAddressRequest {
    #[serde(default)]
    pub coin_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepositAddressResponse {
    pub account_id: AccountId,
    pub coin_type: CoinType,
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GetBalanceRequest {
    #[serde(default)]
    pub coin_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GetBalanceResponse {
    pub coin_type: CoinType,
    /// Recorded balance in the coin's smallest unit.
    pub balance: u64,
    /// Coin hours (always zero for Bitcoin).
    pub hours: u64,
}

// =============================================================================
// Transaction Models
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct InjectTxRequest {
    #[serde(default)]
    pub coin_type: String,
    /// Raw transaction, hex encoded.
    #[serde(default)]
    pub tx: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InjectTxResponse {
    pub txid: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GetTxRequest {
    #[serde(default)]
    pub coin_type: String,
    #[serde(default)]
    pub txid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GetTxResponse {
    pub tx: NormalizedTx,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GetRawTxRequest {
    #[serde(default)]
    pub coin_type: String,
    #[serde(default)]
    pub txid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GetRawTxResponse {
    pub coin_type: CoinType,
    pub rawtx: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateRawTxRequest {
    #[serde(default)]
    pub coin_type: String,
    #[serde(default)]
    pub tx_ins: Vec<TxIn>,
    #[serde(default)]
    pub tx_outs: Vec<TxOut>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateRawTxResponse {
    pub rawtx: String,
}

// =============================================================================
// Wallet Models
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateWalletRequest {
    #[serde(default)]
    pub coin_type: String,
    #[serde(default)]
    pub seed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateWalletResponse {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewAddressRequest {
    #[serde(default)]
    pub wallet_id: String,
    /// Required only when the wallet tracks more than one coin.
    #[serde(default)]
    pub coin_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewAddressResponse {
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GetKeysRequest {
    #[serde(default)]
    pub wallet_id: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GetKeysResponse {
    pub pubkey: String,
    pub seckey: String,
}

// =============================================================================
// Admin Models
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ListAccountsRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountSummary {
    pub account_id: AccountId,
    pub wallet_id: String,
    pub balances: BTreeMap<CoinType, u64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListAccountsResponse {
    pub accounts: Vec<AccountSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_type_parsing() {
        assert_eq!("bitcoin".parse::<CoinType>().unwrap(), CoinType::Bitcoin);
        assert_eq!(" Skycoin ".parse::<CoinType>().unwrap(), CoinType::Skycoin);

        let err = "ethereum".parse::<CoinType>().unwrap_err();
        assert!(matches!(err, ExchangeError::UnsupportedCoin(ref c) if c == "ethereum"));

        let err = "".parse::<CoinType>().unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidRequest(_)));
    }

    #[test]
    fn failure_reply_omits_body_fields() {
        let reply = Reply::<InjectTxResponse>::failure(&ExchangeError::invalid("empty tx"));
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["result"]["code"], "invalid_request");
        assert_eq!(json["result"]["reason"], "empty tx");
        assert!(json.get("txid").is_none());
    }

    #[test]
    fn success_reply_flattens_body() {
        let reply = Reply::success(InjectTxResponse {
            txid: "ab".repeat(32),
        });
        let json = serde_json::to_string(&reply).unwrap();
        let back: Reply<InjectTxResponse> = serde_json::from_str(&json).unwrap();
        assert!(back.result.success);
        assert_eq!(back.body.unwrap().txid, "ab".repeat(32));
    }

    #[test]
    fn account_id_normalizes_hex() {
        let keys = crate::secure::KeyPair::generate();
        let upper = keys.account_id().0.to_uppercase();
        let parsed: AccountId = upper.parse().unwrap();
        assert_eq!(parsed, keys.account_id());
        assert!("not-a-key".parse::<AccountId>().is_err());
    }
}
