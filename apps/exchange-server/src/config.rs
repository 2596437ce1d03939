// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read once from the environment at startup and is
//! immutable afterwards.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `127.0.0.1` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Wallet storage root | `.skycoin-exchange` |
//! | `EXCHANGE_SECKEY` | Server identity secret key (hex or PKCS#8 PEM) | Required |
//! | `WALLET_SEED` | Seed for account wallets | Required |
//! | `BITCOIN_NODE_ADDR` | Esplora-style Bitcoin REST endpoint | `http://127.0.0.1:3002` |
//! | `BITCOIN_NETWORK` | `bitcoin`, `testnet`, `signet` or `regtest` | `bitcoin` |
//! | `SKYCOIN_NODE_ADDR` | Skycoin node REST endpoint | `http://127.0.0.1:6420/api/v1` |
//! | `ADMINS` | Comma-separated admin public keys (hex) | empty |
//! | `DAEMON_TIMEOUT_SECS` | Timeout on every daemon call | `10` |
//! | `REPLAY_WINDOW_SECS` | Accepted envelope clock skew | `300` |
//! | `BALANCE_POLL_SECS` | Background balance refresh, `0` disables | `60` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate and key; HTTPS when both set | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use bitcoin::Network;
use k256::PublicKey;
use url::Url;

use crate::secure::keys::{self, KeyPair};
use crate::storage::paths::DEFAULT_DATA_DIR;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const EXCHANGE_SECKEY_ENV: &str = "EXCHANGE_SECKEY";
pub const WALLET_SEED_ENV: &str = "WALLET_SEED";
pub const BITCOIN_NODE_ADDR_ENV: &str = "BITCOIN_NODE_ADDR";
pub const BITCOIN_NETWORK_ENV: &str = "BITCOIN_NETWORK";
pub const SKYCOIN_NODE_ADDR_ENV: &str = "SKYCOIN_NODE_ADDR";
pub const ADMINS_ENV: &str = "ADMINS";
pub const DAEMON_TIMEOUT_ENV: &str = "DAEMON_TIMEOUT_SECS";
pub const REPLAY_WINDOW_ENV: &str = "REPLAY_WINDOW_SECS";
pub const BALANCE_POLL_ENV: &str = "BALANCE_POLL_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_BITCOIN_NODE: &str = "http://127.0.0.1:3002";
const DEFAULT_SKYCOIN_NODE: &str = "http://127.0.0.1:6420/api/v1";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

fn invalid(name: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub server_keys: KeyPair,
    pub wallet_seed: String,
    pub bitcoin_node: Url,
    pub bitcoin_network: Network,
    pub skycoin_node: Url,
    pub admins: Vec<PublicKey>,
    pub daemon_timeout: Duration,
    pub replay_window: Duration,
    /// `None` disables the background balance refresh.
    pub balance_poll: Option<Duration>,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = parse_or(get(PORT_ENV), PORT_ENV, 8080)?;
        let bind_addr = format!("{host}:{port}")
            .parse()
            .map_err(|e| invalid(HOST_ENV, e))?;

        let secret = get(EXCHANGE_SECKEY_ENV).ok_or(ConfigError::Missing(EXCHANGE_SECKEY_ENV))?;
        let server_keys = KeyPair::parse(&secret).map_err(|e| invalid(EXCHANGE_SECKEY_ENV, e))?;

        let wallet_seed = get(WALLET_SEED_ENV).ok_or(ConfigError::Missing(WALLET_SEED_ENV))?;

        let bitcoin_node = parse_url(get(BITCOIN_NODE_ADDR_ENV), BITCOIN_NODE_ADDR_ENV, DEFAULT_BITCOIN_NODE)?;
        let skycoin_node = parse_url(get(SKYCOIN_NODE_ADDR_ENV), SKYCOIN_NODE_ADDR_ENV, DEFAULT_SKYCOIN_NODE)?;

        let bitcoin_network = match get(BITCOIN_NETWORK_ENV) {
            Some(name) => Network::from_str(name.trim()).map_err(|e| invalid(BITCOIN_NETWORK_ENV, e))?,
            None => Network::Bitcoin,
        };

        let admins = get(ADMINS_ENV)
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(|key| keys::public_key_from_hex(key).map_err(|e| invalid(ADMINS_ENV, e)))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let daemon_timeout = Duration::from_secs(parse_or(get(DAEMON_TIMEOUT_ENV), DAEMON_TIMEOUT_ENV, 10)?);
        let replay_window = Duration::from_secs(parse_or(get(REPLAY_WINDOW_ENV), REPLAY_WINDOW_ENV, 300)?);
        let balance_poll = match parse_or(get(BALANCE_POLL_ENV), BALANCE_POLL_ENV, 60u64)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(invalid(LOG_FORMAT_ENV, format!("unknown format {other}"))),
        };

        Ok(Self {
            bind_addr,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            server_keys,
            wallet_seed,
            bitcoin_node,
            bitcoin_network,
            skycoin_node,
            admins,
            daemon_timeout,
            replay_window,
            balance_poll,
            tls,
            log_format,
        })
    }
}

fn parse_or<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.trim().parse().map_err(|e| invalid(name, e)),
        None => Ok(default),
    }
}

fn parse_url(value: Option<String>, name: &'static str, default: &str) -> Result<Url, ConfigError> {
    let raw = value.unwrap_or_else(|| default.to_string());
    let url = Url::parse(raw.trim()).map_err(|e| invalid(name, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(name, "scheme must be http or https"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn required() -> Vec<(&'static str, String)> {
        vec![
            (EXCHANGE_SECKEY_ENV, KeyPair::generate().secret_hex()),
            (WALLET_SEED_ENV, "exchange seed".to_string()),
        ]
    }

    fn with(extra: &[(&'static str, &str)]) -> Result<Config, ConfigError> {
        let mut vars: Vec<(&str, String)> = required();
        vars.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));
        let borrowed: Vec<(&str, &str)> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
        Config::from_lookup(lookup(&borrowed))
    }

    #[test]
    fn defaults() {
        let config = with(&[]).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.bitcoin_network, Network::Bitcoin);
        assert_eq!(config.skycoin_node.as_str(), "http://127.0.0.1:6420/api/v1");
        assert_eq!(config.daemon_timeout, Duration::from_secs(10));
        assert_eq!(config.balance_poll, Some(Duration::from_secs(60)));
        assert!(config.admins.is_empty());
        assert!(config.tls.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn required_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[(WALLET_SEED_ENV, "s")])),
            Err(ConfigError::Missing(EXCHANGE_SECKEY_ENV))
        ));
        let secret = KeyPair::generate().secret_hex();
        assert!(matches!(
            Config::from_lookup(lookup(&[(EXCHANGE_SECKEY_ENV, &secret)])),
            Err(ConfigError::Missing(WALLET_SEED_ENV))
        ));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(with(&[(PORT_ENV, "http")]).is_err());
        assert!(with(&[(BITCOIN_NETWORK_ENV, "dogecoin")]).is_err());
        assert!(with(&[(SKYCOIN_NODE_ADDR_ENV, "ftp://node")]).is_err());
        assert!(with(&[(ADMINS_ENV, "02zz")]).is_err());
        assert!(with(&[(LOG_FORMAT_ENV, "xml")]).is_err());
        assert!(with(&[(TLS_CERT_PATH_ENV, "/cert.pem")]).is_err());
    }

    #[test]
    fn parses_overrides() {
        let admin = KeyPair::generate().public_hex();
        let admins = format!("{admin}, ");
        let config = with(&[
            (BITCOIN_NETWORK_ENV, "regtest"),
            (ADMINS_ENV, &admins),
            (BALANCE_POLL_ENV, "0"),
            (LOG_FORMAT_ENV, "json"),
            (PORT_ENV, "9000"),
        ])
        .unwrap();

        assert_eq!(config.bitcoin_network, Network::Regtest);
        assert_eq!(config.admins.len(), 1);
        assert_eq!(config.balance_poll, None);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.bind_addr.port(), 9000);
    }
}
