// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use k256::PublicKey;

use crate::account::AccountLedger;
use crate::coin::{daemon::DaemonClient, BitcoinGateway, GatewayRegistry, SkycoinGateway};
use crate::config::Config;
use crate::error::ExchangeError;
use crate::models::AccountId;
use crate::secure::SecureChannel;
use crate::storage::{JsonStorage, StoragePaths};
use crate::wallet::{FsWalletManager, WalletManager};

/// Shared application state, cheap to clone into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub channel: Arc<SecureChannel>,
    pub ledger: Arc<AccountLedger>,
    pub gateways: Arc<GatewayRegistry>,
    pub wallets: Arc<dyn WalletManager>,
    pub storage: Arc<JsonStorage>,
    admins: Arc<Vec<AccountId>>,
}

impl AppState {
    pub fn new(
        config: Config,
        gateways: GatewayRegistry,
        wallets: Arc<dyn WalletManager>,
        storage: JsonStorage,
    ) -> Self {
        let channel = SecureChannel::new(config.server_keys.clone(), config.replay_window);
        let ledger = AccountLedger::new(gateways.coins(), Arc::clone(&wallets));
        let admins = config.admins.iter().map(AccountId::from_public_key).collect();

        Self {
            config: Arc::new(config),
            channel: Arc::new(channel),
            ledger: Arc::new(ledger),
            gateways: Arc::new(gateways),
            wallets,
            storage: Arc::new(storage),
            admins: Arc::new(admins),
        }
    }

    /// Wire up storage, the wallet manager and both coin gateways.
    pub fn from_config(config: Config) -> Result<Self, ExchangeError> {
        let mut storage = JsonStorage::new(StoragePaths::new(&config.data_dir));
        storage
            .initialize()
            .map_err(|e| ExchangeError::server(format!("failed to initialize storage: {e}")))?;

        let wallets: Arc<dyn WalletManager> =
            Arc::new(FsWalletManager::new(storage.clone(), config.bitcoin_network));

        let bitcoin = DaemonClient::new("bitcoin", &config.bitcoin_node, config.daemon_timeout)?;
        let skycoin = DaemonClient::new("skycoin", &config.skycoin_node, config.daemon_timeout)?;

        let mut gateways = GatewayRegistry::new();
        gateways.register(Arc::new(BitcoinGateway::new(bitcoin, config.bitcoin_network)));
        gateways.register(Arc::new(SkycoinGateway::new(skycoin)));

        Ok(Self::new(config, gateways, wallets, storage))
    }

    pub fn server_public_key(&self) -> &PublicKey {
        self.channel.public_key()
    }

    pub fn is_admin(&self, account: &AccountId) -> bool {
        self.admins.contains(account)
    }
}
