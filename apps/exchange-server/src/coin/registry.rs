// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Dispatch from [`CoinType`] to its gateway.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::CoinGateway;
use crate::error::ExchangeError;
use crate::models::CoinType;

#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: BTreeMap<CoinType, Arc<dyn CoinGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gateway under its own coin type, replacing any previous one.
    pub fn register(&mut self, gateway: Arc<dyn CoinGateway>) {
        self.gateways.insert(gateway.coin_type(), gateway);
    }

    pub fn get(&self, coin: CoinType) -> Result<Arc<dyn CoinGateway>, ExchangeError> {
        self.gateways
            .get(&coin)
            .cloned()
            .ok_or_else(|| ExchangeError::UnsupportedCoin(coin.to_string()))
    }

    /// Parse a caller-supplied coin type and look up its gateway.
    pub fn resolve(&self, coin_type: &str) -> Result<(CoinType, Arc<dyn CoinGateway>), ExchangeError> {
        let coin: CoinType = coin_type.parse()?;
        Ok((coin, self.get(coin)?))
    }

    pub fn coins(&self) -> Vec<CoinType> {
        self.gateways.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::{daemon::DaemonClient, SkycoinGateway};
    use std::time::Duration;
    use url::Url;

    fn registry() -> GatewayRegistry {
        let base = Url::parse("http://127.0.0.1:9/").unwrap();
        let daemon = DaemonClient::new("skycoin", &base, Duration::from_secs(1)).unwrap();
        let mut registry = GatewayRegistry::new();
        registry.register(Arc::new(SkycoinGateway::new(daemon)));
        registry
    }

    #[test]
    fn resolves_registered_coin() {
        let (coin, gateway) = registry().resolve("skycoin").unwrap();
        assert_eq!(coin, CoinType::Skycoin);
        assert_eq!(gateway.coin_type(), CoinType::Skycoin);
    }

    #[test]
    fn unknown_or_unregistered_coin_is_unsupported() {
        let registry = registry();
        assert!(matches!(
            registry.resolve("dogecoin"),
            Err(ExchangeError::UnsupportedCoin(_))
        ));
        assert!(matches!(
            registry.get(CoinType::Bitcoin),
            Err(ExchangeError::UnsupportedCoin(_))
        ));
        assert_eq!(registry.coins(), vec![CoinType::Skycoin]);
    }
}
