// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Skycoin gateway over the node's REST API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{
    daemon::DaemonClient,
    is_hash_hex,
    sky_codec::{self, SkyAddress, SkyOutput, UnsignedTx},
    Balance, CoinGateway, GatewayError, GatewayResult, NormalizedInput, NormalizedOutput,
    NormalizedTx, TxIn, TxOut,
};
use crate::models::CoinType;

#[derive(Debug, Deserialize)]
struct TransactionResult {
    status: TransactionStatus,
    txn: ReadableTransaction,
}

#[derive(Debug, Deserialize)]
struct TransactionStatus {
    #[serde(default)]
    confirmed: bool,
    #[serde(default)]
    height: u64,
    #[serde(default)]
    unknown: bool,
}

#[derive(Debug, Deserialize)]
struct ReadableTransaction {
    txid: String,
    #[serde(default)]
    inputs: Vec<String>,
    #[serde(default)]
    outputs: Vec<ReadableOutput>,
}

#[derive(Debug, Deserialize)]
struct ReadableOutput {
    dst: String,
    coins: String,
    #[serde(default)]
    hours: u64,
}

#[derive(Debug, Deserialize)]
struct RawTxResult {
    rawtx: String,
}

#[derive(Debug, Deserialize)]
struct BalanceResult {
    confirmed: BalancePair,
}

#[derive(Debug, Deserialize)]
struct BalancePair {
    coins: u64,
    hours: u64,
}

impl TryFrom<TransactionResult> for NormalizedTx {
    type Error = GatewayError;

    fn try_from(result: TransactionResult) -> Result<Self, Self::Error> {
        let outputs = result
            .txn
            .outputs
            .into_iter()
            .map(|out| {
                let amount = sky_codec::parse_coins(&out.coins).ok_or_else(|| {
                    GatewayError::Upstream(format!("unparseable coin amount {}", out.coins))
                })?;
                Ok(NormalizedOutput {
                    address: out.dst,
                    amount,
                    hours: Some(out.hours),
                })
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        let confirmed = result.status.confirmed;
        Ok(NormalizedTx {
            coin_type: CoinType::Skycoin,
            txid: result.txn.txid,
            inputs: result
                .txn
                .inputs
                .into_iter()
                .map(|uxid| NormalizedInput {
                    txid: uxid,
                    vout: None,
                })
                .collect(),
            outputs,
            confirmed,
            height: if confirmed { result.status.height } else { 0 },
        })
    }
}

pub struct SkycoinGateway {
    daemon: DaemonClient,
}

impl SkycoinGateway {
    pub fn new(daemon: DaemonClient) -> Self {
        Self { daemon }
    }
}

fn check_txid(txid: &str) -> GatewayResult<()> {
    if is_hash_hex(txid) {
        Ok(())
    } else {
        Err(GatewayError::InvalidRequest(format!("invalid txid: {txid}")))
    }
}

#[async_trait]
impl CoinGateway for SkycoinGateway {
    fn coin_type(&self) -> CoinType {
        CoinType::Skycoin
    }

    async fn get_tx(&self, txid: &str) -> GatewayResult<NormalizedTx> {
        check_txid(txid)?;
        let result: TransactionResult = self
            .daemon
            .get_json("transaction", &[("txid", txid)])
            .await
            .map_err(|e| match e {
                GatewayError::NotFound(_) => GatewayError::NotFound(txid.to_string()),
                other => other,
            })?;

        if result.status.unknown {
            return Err(GatewayError::NotFound(txid.to_string()));
        }
        result.try_into()
    }

    async fn get_raw_tx(&self, txid: &str) -> GatewayResult<String> {
        check_txid(txid)?;
        let result: RawTxResult = self
            .daemon
            .get_json("rawtx", &[("txid", txid)])
            .await
            .map_err(|e| match e {
                GatewayError::NotFound(_) => GatewayError::NotFound(txid.to_string()),
                other => other,
            })?;
        Ok(result.rawtx)
    }

    async fn inject_tx(&self, raw_tx: &str) -> GatewayResult<String> {
        let raw_tx = raw_tx.trim();
        if hex::decode(raw_tx).is_err() {
            return Err(GatewayError::InvalidRequest(
                "raw transaction is not hex".to_string(),
            ));
        }

        let txid: String = self
            .daemon
            .post_json("injectTransaction", &json!({ "rawtx": raw_tx }))
            .await?;
        info!(%txid, "Broadcast skycoin transaction");
        Ok(txid)
    }

    async fn get_balance(&self, addresses: &[String]) -> GatewayResult<Balance> {
        if addresses.is_empty() {
            return Ok(Balance::default());
        }

        let addrs = addresses.join(",");
        let result: BalanceResult = self.daemon.get_json("balance", &[("addrs", &addrs)]).await?;
        Ok(Balance {
            amount: result.confirmed.coins,
            hours: result.confirmed.hours,
        })
    }

    fn create_raw_tx(&self, inputs: &[TxIn], outputs: &[TxOut]) -> GatewayResult<String> {
        if inputs.is_empty() {
            return Err(GatewayError::InvalidRequest("no inputs".to_string()));
        }
        if outputs.is_empty() {
            return Err(GatewayError::InvalidRequest("no outputs".to_string()));
        }

        let inputs = inputs
            .iter()
            .map(|txin| {
                sky_codec::parse_hash(&txin.txid)
                    .map_err(|e| GatewayError::InvalidRequest(e.to_string()))
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        let outputs = outputs
            .iter()
            .map(|txout| {
                if txout.value == 0 {
                    return Err(GatewayError::InvalidRequest(format!(
                        "zero coin output to {}",
                        txout.address
                    )));
                }
                let address = txout
                    .address
                    .parse::<SkyAddress>()
                    .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
                Ok(SkyOutput {
                    address,
                    coins: txout.value,
                    hours: txout.hours,
                })
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        Ok(UnsignedTx { inputs, outputs }.encode_hex())
    }
}
