// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bitcoin gateway over an Esplora-style REST daemon.
//!
//! Raw transactions are built locally with the `bitcoin` crate; the daemon is
//! only used for lookups, balances and broadcasting.

use async_trait::async_trait;
use bitcoin::{
    absolute::LockTime, address::NetworkUnchecked, consensus::encode, transaction::Version,
    Address, Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, Txid, Witness,
};
use serde::Deserialize;
use tracing::info;

use super::{
    daemon::DaemonClient, is_hash_hex, Balance, CoinGateway, GatewayError, GatewayResult,
    NormalizedInput, NormalizedOutput, NormalizedTx, TxIn, TxOut,
};
use crate::models::CoinType;

#[derive(Debug, Deserialize)]
struct EsploraTx {
    txid: String,
    #[serde(default)]
    vin: Vec<EsploraVin>,
    #[serde(default)]
    vout: Vec<EsploraVout>,
    status: EsploraStatus,
}

#[derive(Debug, Deserialize)]
struct EsploraVin {
    txid: String,
    vout: u32,
}

#[derive(Debug, Deserialize)]
struct EsploraVout {
    #[serde(default)]
    scriptpubkey_address: Option<String>,
    value: u64,
}

#[derive(Debug, Deserialize)]
struct EsploraStatus {
    confirmed: bool,
    #[serde(default)]
    block_height: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EsploraAddress {
    chain_stats: EsploraChainStats,
}

#[derive(Debug, Deserialize)]
struct EsploraChainStats {
    funded_txo_sum: u64,
    spent_txo_sum: u64,
}

impl From<EsploraTx> for NormalizedTx {
    fn from(tx: EsploraTx) -> Self {
        let height = if tx.status.confirmed {
            tx.status.block_height.unwrap_or(0)
        } else {
            0
        };

        NormalizedTx {
            coin_type: CoinType::Bitcoin,
            txid: tx.txid,
            inputs: tx
                .vin
                .into_iter()
                .map(|vin| NormalizedInput {
                    txid: vin.txid,
                    vout: Some(vin.vout),
                })
                .collect(),
            outputs: tx
                .vout
                .into_iter()
                .map(|vout| NormalizedOutput {
                    // Non-standard scripts have no address.
                    address: vout.scriptpubkey_address.unwrap_or_default(),
                    amount: vout.value,
                    hours: None,
                })
                .collect(),
            confirmed: tx.status.confirmed,
            height,
        }
    }
}

pub struct BitcoinGateway {
    daemon: DaemonClient,
    network: Network,
}

impl BitcoinGateway {
    pub fn new(daemon: DaemonClient, network: Network) -> Self {
        Self { daemon, network }
    }

    fn parse_address(&self, address: &str) -> GatewayResult<Address> {
        address
            .trim()
            .parse::<Address<NetworkUnchecked>>()
            .map_err(|_| GatewayError::InvalidRequest(format!("invalid bitcoin address: {address}")))?
            .require_network(self.network)
            .map_err(|_| {
                GatewayError::InvalidRequest(format!(
                    "address {address} is not valid for {}",
                    self.network
                ))
            })
    }
}

fn check_txid(txid: &str) -> GatewayResult<()> {
    if is_hash_hex(txid) {
        Ok(())
    } else {
        Err(GatewayError::InvalidRequest(format!("invalid txid: {txid}")))
    }
}

fn with_txid(err: GatewayError, txid: &str) -> GatewayError {
    match err {
        GatewayError::NotFound(_) => GatewayError::NotFound(txid.to_string()),
        other => other,
    }
}

#[async_trait]
impl CoinGateway for BitcoinGateway {
    fn coin_type(&self) -> CoinType {
        CoinType::Bitcoin
    }

    async fn get_tx(&self, txid: &str) -> GatewayResult<NormalizedTx> {
        check_txid(txid)?;
        let tx: EsploraTx = self
            .daemon
            .get_json(&format!("tx/{txid}"), &[])
            .await
            .map_err(|e| with_txid(e, txid))?;
        Ok(tx.into())
    }

    async fn get_raw_tx(&self, txid: &str) -> GatewayResult<String> {
        check_txid(txid)?;
        let raw = self
            .daemon
            .get_text(&format!("tx/{txid}/hex"), &[])
            .await
            .map_err(|e| with_txid(e, txid))?;
        Ok(raw.trim().to_string())
    }

    async fn inject_tx(&self, raw_tx: &str) -> GatewayResult<String> {
        let bytes = hex::decode(raw_tx.trim())
            .map_err(|_| GatewayError::InvalidRequest("raw transaction is not hex".to_string()))?;
        let tx: Transaction = encode::deserialize(&bytes).map_err(|_| {
            GatewayError::InvalidRequest("raw transaction does not decode".to_string())
        })?;

        let txid = self.daemon.post_text("tx", raw_tx.trim().to_string()).await?;
        let txid = txid.trim().to_string();
        info!(%txid, local_txid = %tx.compute_txid(), "Broadcast bitcoin transaction");
        Ok(txid)
    }

    async fn get_balance(&self, addresses: &[String]) -> GatewayResult<Balance> {
        let mut amount = 0u64;
        for address in addresses {
            let info: EsploraAddress = self
                .daemon
                .get_json(&format!("address/{address}"), &[])
                .await?;
            let confirmed = info
                .chain_stats
                .funded_txo_sum
                .saturating_sub(info.chain_stats.spent_txo_sum);
            amount = amount.saturating_add(confirmed);
        }
        Ok(Balance { amount, hours: 0 })
    }

    fn create_raw_tx(&self, inputs: &[TxIn], outputs: &[TxOut]) -> GatewayResult<String> {
        if inputs.is_empty() {
            return Err(GatewayError::InvalidRequest("no inputs".to_string()));
        }
        if outputs.is_empty() {
            return Err(GatewayError::InvalidRequest("no outputs".to_string()));
        }

        let input = inputs
            .iter()
            .map(|txin| {
                check_txid(&txin.txid)?;
                let txid = txin
                    .txid
                    .parse::<Txid>()
                    .map_err(|_| GatewayError::InvalidRequest(format!("invalid txid: {}", txin.txid)))?;
                Ok(bitcoin::TxIn {
                    previous_output: OutPoint::new(txid, txin.vout),
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                })
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        let output = outputs
            .iter()
            .map(|txout| {
                if txout.value == 0 {
                    return Err(GatewayError::InvalidRequest(format!(
                        "zero value output to {}",
                        txout.address
                    )));
                }
                let address = self.parse_address(&txout.address)?;
                Ok(bitcoin::TxOut {
                    value: Amount::from_sat(txout.value),
                    script_pubkey: address.script_pubkey(),
                })
            })
            .collect::<GatewayResult<Vec<_>>>()?;

        let tx = Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input,
            output,
        };
        Ok(encode::serialize_hex(&tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use url::Url;

    const GENESIS_ADDRESS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

    fn gateway(network: Network) -> BitcoinGateway {
        let base = Url::parse("http://127.0.0.1:9/").unwrap();
        let daemon = DaemonClient::new("bitcoin", &base, Duration::from_secs(1)).unwrap();
        BitcoinGateway::new(daemon, network)
    }

    fn input() -> TxIn {
        TxIn {
            txid: "ab".repeat(32),
            vout: 0,
        }
    }

    #[test]
    fn builds_unsigned_transaction() {
        let gateway = gateway(Network::Bitcoin);
        let raw = gateway
            .create_raw_tx(
                &[input()],
                &[TxOut {
                    address: GENESIS_ADDRESS.to_string(),
                    value: 50_000,
                    hours: 0,
                }],
            )
            .unwrap();

        let bytes = hex::decode(&raw).unwrap();
        let tx: Transaction = encode::deserialize(&bytes).unwrap();
        assert_eq!(tx.version, Version::ONE);
        assert_eq!(tx.input.len(), 1);
        assert_eq!(tx.input[0].previous_output.vout, 0);
        assert_eq!(tx.input[0].sequence, Sequence::MAX);
        assert!(tx.input[0].script_sig.is_empty());
        assert_eq!(tx.output[0].value, Amount::from_sat(50_000));
    }

    #[test]
    fn rejects_bad_outputs() {
        let gateway = gateway(Network::Bitcoin);

        let malformed = TxOut {
            address: "1Bxyz".to_string(),
            value: 50_000,
            hours: 0,
        };
        assert!(matches!(
            gateway.create_raw_tx(&[input()], &[malformed]),
            Err(GatewayError::InvalidRequest(_))
        ));

        let zero = TxOut {
            address: GENESIS_ADDRESS.to_string(),
            value: 0,
            hours: 0,
        };
        assert!(matches!(
            gateway.create_raw_tx(&[input()], &[zero]),
            Err(GatewayError::InvalidRequest(_))
        ));

        assert!(gateway.create_raw_tx(&[input()], &[]).is_err());
    }

    #[test]
    fn rejects_address_for_other_network() {
        let gateway = gateway(Network::Testnet);
        let out = TxOut {
            address: GENESIS_ADDRESS.to_string(),
            value: 1,
            hours: 0,
        };
        assert!(matches!(
            gateway.create_raw_tx(&[input()], &[out]),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn rejects_short_txid() {
        let gateway = gateway(Network::Bitcoin);
        let bad = TxIn {
            txid: "abc123".to_string(),
            vout: 0,
        };
        let out = TxOut {
            address: GENESIS_ADDRESS.to_string(),
            value: 1,
            hours: 0,
        };
        assert!(matches!(
            gateway.create_raw_tx(&[bad], &[out]),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn inject_rejects_undecodable_tx_without_daemon_call() {
        // The daemon address is unroutable: reaching it would be an Upstream error.
        let gateway = gateway(Network::Bitcoin);
        assert!(matches!(
            gateway.inject_tx("zz").await,
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            gateway.inject_tx("deadbeef").await,
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn normalizes_unconfirmed_transaction() {
        let json = serde_json::json!({
            "txid": "cd".repeat(32),
            "vin": [{ "txid": "ab".repeat(32), "vout": 1 }],
            "vout": [
                { "scriptpubkey_address": GENESIS_ADDRESS, "value": 1200 },
                { "value": 0 }
            ],
            "status": { "confirmed": false }
        });
        let tx: NormalizedTx = serde_json::from_value::<EsploraTx>(json).unwrap().into();

        assert!(!tx.confirmed);
        assert_eq!(tx.height, 0);
        assert_eq!(tx.inputs[0].vout, Some(1));
        assert_eq!(tx.outputs[0].amount, 1200);
        assert_eq!(tx.outputs[1].address, "");
        assert_eq!(tx.outputs[0].hours, None);
    }
}
