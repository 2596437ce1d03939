// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File-backed [`WalletManager`].
//!
//! One JSON record per wallet under `wallets/{id}.json`. Every
//! read-modify-write of a record runs under that wallet's own lock, so
//! concurrent derivations never lose an address.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use bitcoin::Network;
use chrono::{DateTime, Utc};
use k256::SecretKey;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{keys, AddressKeys, WalletError, WalletInfo, WalletManager, WalletResult};
use crate::models::CoinType;
use crate::secure::keys::public_key_hex;
use crate::storage::{JsonStorage, StorageError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WalletRecord {
    id: String,
    owner: String,
    created_at: DateTime<Utc>,
    chains: BTreeMap<CoinType, KeyChain>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeyChain {
    /// Hex chain state the next derivation starts from.
    next_state: String,
    entries: Vec<KeyEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeyEntry {
    address: String,
    pubkey: String,
    seckey: String,
}

impl WalletRecord {
    fn info(&self) -> WalletInfo {
        WalletInfo {
            id: self.id.clone(),
            owner: self.owner.clone(),
            coins: self.chains.keys().copied().collect(),
            created_at: self.created_at,
        }
    }
}

impl KeyChain {
    fn derive(&mut self, coin: CoinType, network: Network) -> WalletResult<String> {
        let state: [u8; 32] = hex::decode(&self.next_state)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| WalletError::Derivation("corrupt chain state".to_string()))?;

        let (next, secret) = keys::derive_next(&state);
        let address = keys::address_for(coin, &secret, network)?;
        self.entries.push(entry(address.clone(), &secret));
        self.next_state = hex::encode(next);
        Ok(address)
    }
}

fn entry(address: String, secret: &SecretKey) -> KeyEntry {
    KeyEntry {
        address,
        pubkey: public_key_hex(&secret.public_key()),
        seckey: hex::encode(secret.to_bytes()),
    }
}

pub struct FsWalletManager {
    storage: JsonStorage,
    network: Network,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FsWalletManager {
    /// `storage` must already be initialized.
    pub fn new(storage: JsonStorage, network: Network) -> Self {
        Self {
            storage,
            network,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` holding the per-wallet lock. The lock entry is dropped again
    /// once no other caller holds or waits on it.
    fn with_wallet_lock<T>(&self, wallet_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(wallet_id.to_string()).or_default())
        };

        let result = {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f()
        };

        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Clones are only taken under the map lock: the map and `lock` are the last two.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(wallet_id);
        }
        result
    }

    fn load(&self, wallet_id: &str) -> WalletResult<WalletRecord> {
        // Ids are UUIDs; anything else cannot name a record and must not reach the filesystem.
        if Uuid::parse_str(wallet_id).is_err() {
            return Err(WalletError::NotFound(wallet_id.to_string()));
        }
        let path = self.storage.paths().wallet_file(wallet_id);
        self.storage.read_json(&path).map_err(|e| match e {
            StorageError::NotFound(_) => WalletError::NotFound(wallet_id.to_string()),
            other => WalletError::Storage(other),
        })
    }

    fn save(&self, record: &WalletRecord) -> WalletResult<()> {
        let path = self.storage.paths().wallet_file(&record.id);
        self.storage.write_json(&path, record)?;
        Ok(())
    }

    fn create_locked(&self, id: &str, owner: &str, coins: &[CoinType], seed: &str) -> WalletResult<()> {
        if self.storage.exists(self.storage.paths().wallet_file(id)) {
            return Err(WalletError::AlreadyExists(id.to_string()));
        }

        let chains = coins
            .iter()
            .map(|coin| {
                let chain = KeyChain {
                    next_state: hex::encode(keys::chain_origin(seed, *coin)),
                    entries: Vec::new(),
                };
                (*coin, chain)
            })
            .collect();

        let record = WalletRecord {
            id: id.to_string(),
            owner: owner.to_string(),
            created_at: Utc::now(),
            chains,
        };
        self.save(&record)
    }
}

/// Deterministic wallet id over owner, coin set and seed.
pub fn wallet_id(owner: &str, coins: &[CoinType], seed: &str) -> String {
    let coins = coins
        .iter()
        .map(CoinType::as_str)
        .collect::<Vec<_>>()
        .join(",");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{owner}|{coins}|{seed}").as_bytes()).to_string()
}

impl WalletManager for FsWalletManager {
    fn create(&self, owner: &str, coins: &[CoinType], seed: &str) -> WalletResult<String> {
        if seed.is_empty() {
            return Err(WalletError::EmptySeed);
        }
        let mut coins = coins.to_vec();
        coins.sort();
        coins.dedup();
        if coins.is_empty() {
            return Err(WalletError::NoCoins);
        }

        let id = wallet_id(owner, &coins, seed);
        self.with_wallet_lock(&id, || self.create_locked(&id, owner, &coins, seed))?;

        info!(wallet_id = %id, coins = ?coins, "Created wallet");
        Ok(id)
    }

    fn new_addresses(&self, wallet_id: &str, coin: CoinType, count: usize) -> WalletResult<Vec<String>> {
        self.with_wallet_lock(wallet_id, || {
            let mut record = self.load(wallet_id)?;
            let chain = record
                .chains
                .get_mut(&coin)
                .ok_or(WalletError::CoinNotTracked(coin))?;

            let addresses = (0..count)
                .map(|_| chain.derive(coin, self.network))
                .collect::<WalletResult<Vec<_>>>()?;
            self.save(&record)?;

            Ok(addresses)
        })
    }

    fn addresses(&self, wallet_id: &str, coin: CoinType) -> WalletResult<Vec<String>> {
        let record = self.load(wallet_id)?;
        let chain = record
            .chains
            .get(&coin)
            .ok_or(WalletError::CoinNotTracked(coin))?;
        Ok(chain.entries.iter().map(|e| e.address.clone()).collect())
    }

    fn keypair(&self, wallet_id: &str, address: &str) -> WalletResult<AddressKeys> {
        let record = self.load(wallet_id)?;
        record
            .chains
            .values()
            .flat_map(|chain| chain.entries.iter())
            .find(|entry| entry.address == address)
            .map(|entry| AddressKeys {
                pubkey: entry.pubkey.clone(),
                seckey: entry.seckey.clone(),
            })
            .ok_or_else(|| WalletError::UnknownAddress(address.to_string()))
    }

    fn info(&self, wallet_id: &str) -> WalletResult<WalletInfo> {
        Ok(self.load(wallet_id)?.info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn manager() -> (TempDir, Arc<FsWalletManager>) {
        let temp = TempDir::new().unwrap();
        let mut storage = JsonStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, Arc::new(FsWalletManager::new(storage, Network::Bitcoin)))
    }

    #[test]
    fn create_is_unique_per_coin_set() {
        let (_temp, manager) = manager();

        let btc = manager.create("owner", &[CoinType::Bitcoin], "seed").unwrap();
        let sky = manager.create("owner", &[CoinType::Skycoin], "seed").unwrap();
        assert_ne!(btc, sky);

        match manager.create("owner", &[CoinType::Bitcoin], "seed") {
            Err(WalletError::AlreadyExists(id)) => assert_eq!(id, btc),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }

    #[test]
    fn create_validates_input() {
        let (_temp, manager) = manager();
        assert!(matches!(
            manager.create("owner", &[CoinType::Bitcoin], ""),
            Err(WalletError::EmptySeed)
        ));
        assert!(matches!(
            manager.create("owner", &[], "seed"),
            Err(WalletError::NoCoins)
        ));
    }

    #[test]
    fn addresses_are_append_only_and_keyed() {
        let (_temp, manager) = manager();
        let id = manager.create("owner", &CoinType::ALL, "seed").unwrap();

        let first = manager.new_addresses(&id, CoinType::Skycoin, 2).unwrap();
        let second = manager.new_addresses(&id, CoinType::Skycoin, 1).unwrap();
        let all = manager.addresses(&id, CoinType::Skycoin).unwrap();
        assert_eq!(all, [first.clone(), second].concat());

        let keys = manager.keypair(&id, &first[0]).unwrap();
        let secret = crate::secure::KeyPair::from_secret_hex(&keys.seckey).unwrap();
        assert_eq!(secret.public_hex(), keys.pubkey);

        assert!(matches!(
            manager.keypair(&id, "not-issued"),
            Err(WalletError::UnknownAddress(_))
        ));
    }

    #[test]
    fn untracked_coin_and_unknown_wallet() {
        let (_temp, manager) = manager();
        let id = manager.create("owner", &[CoinType::Bitcoin], "seed").unwrap();

        assert!(matches!(
            manager.new_addresses(&id, CoinType::Skycoin, 1),
            Err(WalletError::CoinNotTracked(CoinType::Skycoin))
        ));
        assert!(matches!(
            manager.info(&Uuid::new_v4().to_string()),
            Err(WalletError::NotFound(_))
        ));
        assert!(matches!(
            manager.info("../../etc/passwd"),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn records_survive_reload() {
        let temp = TempDir::new().unwrap();
        let open = || {
            let mut storage = JsonStorage::new(StoragePaths::new(temp.path()));
            storage.initialize().unwrap();
            FsWalletManager::new(storage, Network::Bitcoin)
        };

        let id = open().create("owner", &[CoinType::Bitcoin], "seed").unwrap();
        let issued = open().new_addresses(&id, CoinType::Bitcoin, 1).unwrap();

        let reopened = open();
        assert_eq!(reopened.addresses(&id, CoinType::Bitcoin).unwrap(), issued);
        assert_eq!(reopened.info(&id).unwrap().owner, "owner");
    }

    #[test]
    fn concurrent_derivation_loses_nothing() {
        let (_temp, manager) = manager();
        let id = manager.create("owner", &[CoinType::Bitcoin], "seed").unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let id = id.clone();
                std::thread::spawn(move || manager.new_addresses(&id, CoinType::Bitcoin, 1).unwrap())
            })
            .collect();

        let issued: HashSet<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(issued.len(), 16);
        assert_eq!(manager.addresses(&id, CoinType::Bitcoin).unwrap().len(), 16);
        assert!(manager.locks.lock().unwrap().is_empty());
    }

    #[test]
    fn wallet_locks_are_released_after_use() {
        let (_temp, manager) = manager();

        for i in 0..50 {
            let id = manager
                .create("owner", &[CoinType::Bitcoin], &format!("seed {i}"))
                .unwrap();
            manager.new_addresses(&id, CoinType::Bitcoin, 1).unwrap();
        }
        let _ = manager.new_addresses(&Uuid::new_v4().to_string(), CoinType::Bitcoin, 1);
        let _ = manager.create("owner", &[CoinType::Bitcoin], "seed 0");

        assert!(manager.locks.lock().unwrap().is_empty());
    }
}
