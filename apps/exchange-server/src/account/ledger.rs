// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use super::AccountState;
use crate::error::ExchangeError;
use crate::models::{AccountId, CoinType};
use crate::secure::CallerContext;
use crate::wallet::{run_blocking, WalletManager};

/// Keyed container of account states.
pub struct AccountLedger {
    accounts: RwLock<HashMap<AccountId, Arc<AccountState>>>,
    supported: Vec<CoinType>,
    wallets: Arc<dyn WalletManager>,
}

impl AccountLedger {
    pub fn new(supported: Vec<CoinType>, wallets: Arc<dyn WalletManager>) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            supported,
            wallets,
        }
    }

    pub fn supported(&self) -> &[CoinType] {
        &self.supported
    }

    pub fn register(&self, id: AccountId, wallet_id: String) -> Result<Arc<AccountState>, ExchangeError> {
        let mut accounts = self
            .accounts
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if accounts.contains_key(&id) {
            return Err(ExchangeError::invalid("account already exists"));
        }

        let state = Arc::new(AccountState::new(id.clone(), wallet_id, &self.supported));
        accounts.insert(id.clone(), Arc::clone(&state));
        info!(account = %id, wallet_id = %state.wallet_id, "Registered account");
        Ok(state)
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.accounts
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(id)
    }

    /// The account bound to the caller's envelope identity.
    pub fn get_active(&self, caller: &CallerContext) -> Result<Arc<AccountState>, ExchangeError> {
        self.accounts
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&caller.account_id)
            .cloned()
            .ok_or(ExchangeError::NoActiveAccount)
    }

    /// Snapshot of all accounts, ordered by id.
    pub fn accounts(&self) -> Vec<Arc<AccountState>> {
        let mut all: Vec<_> = self
            .accounts
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Derive and persist one new address for `coin`.
    ///
    /// Holds the account's wallet lock across the wallet call; balance
    /// operations are not blocked by it.
    pub async fn get_new_address(
        &self,
        account: &AccountState,
        coin: CoinType,
    ) -> Result<String, ExchangeError> {
        account.balance(coin)?;

        let _guard = account.wallet_lock.lock().await;
        let wallet_id = account.wallet_id.clone();
        let mut addresses =
            run_blocking(&self.wallets, move |wallets| wallets.new_addresses(&wallet_id, coin, 1)).await?;
        let address = addresses
            .pop()
            .ok_or_else(|| ExchangeError::server("wallet returned no address"))?;

        debug!(account = %account.id, %coin, %address, "Issued deposit address");
        Ok(address)
    }

    /// Addresses issued to the account for `coin`.
    pub async fn addresses(
        &self,
        account: &AccountState,
        coin: CoinType,
    ) -> Result<Vec<String>, ExchangeError> {
        account.balance(coin)?;
        let wallet_id = account.wallet_id.clone();
        run_blocking(&self.wallets, move |wallets| wallets.addresses(&wallet_id, coin)).await
    }

    /// Recorded balance. Never calls out to a daemon.
    pub fn get_balance(&self, account: &AccountState, coin: CoinType) -> Result<u64, ExchangeError> {
        account.balance(coin)
    }

    pub(crate) fn set_balance(
        &self,
        account: &AccountState,
        coin: CoinType,
        amount: u64,
    ) -> Result<(), ExchangeError> {
        account.set_balance(coin, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure::KeyPair;
    use crate::storage::{JsonStorage, StoragePaths};
    use crate::wallet::FsWalletManager;
    use bitcoin::Network;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn ledger() -> (TempDir, Arc<AccountLedger>) {
        let temp = TempDir::new().unwrap();
        let mut storage = JsonStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        let wallets: Arc<dyn WalletManager> =
            Arc::new(FsWalletManager::new(storage, Network::Bitcoin));
        (temp, Arc::new(AccountLedger::new(CoinType::ALL.to_vec(), wallets)))
    }

    fn register(ledger: &AccountLedger) -> (CallerContext, Arc<AccountState>) {
        let keys = KeyPair::generate();
        let caller = CallerContext::new(*keys.public_key());
        let wallet_id = ledger
            .wallets
            .create(caller.account_id.as_str(), ledger.supported(), "seed")
            .unwrap();
        let account = ledger.register(caller.account_id.clone(), wallet_id).unwrap();
        (caller, account)
    }

    #[tokio::test]
    async fn unregistered_caller_has_no_active_account() {
        let (_temp, ledger) = ledger();
        let caller = CallerContext::new(*KeyPair::generate().public_key());
        assert!(matches!(
            ledger.get_active(&caller),
            Err(ExchangeError::NoActiveAccount)
        ));

        let (caller, _) = register(&ledger);
        assert_eq!(ledger.get_active(&caller).unwrap().id, caller.account_id);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let (_temp, ledger) = ledger();
        let (caller, account) = register(&ledger);
        assert!(matches!(
            ledger.register(caller.account_id.clone(), account.wallet_id.clone()),
            Err(ExchangeError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn balance_updates_are_isolated() {
        let (_temp, ledger) = ledger();
        let (_, a1) = register(&ledger);
        let (_, a2) = register(&ledger);

        for coin in CoinType::ALL {
            assert_eq!(ledger.get_balance(&a1, coin).unwrap(), 0);
        }

        ledger.set_balance(&a1, CoinType::Bitcoin, 70_000).unwrap();
        ledger.set_balance(&a1, CoinType::Skycoin, 3).unwrap();

        assert_eq!(ledger.get_balance(&a1, CoinType::Bitcoin).unwrap(), 70_000);
        assert_eq!(ledger.get_balance(&a2, CoinType::Bitcoin).unwrap(), 0);
        assert_eq!(ledger.get_balance(&a2, CoinType::Skycoin).unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_address_derivation_yields_distinct_addresses() {
        let (_temp, ledger) = ledger();
        let (_, account) = register(&ledger);

        let tasks: Vec<_> = (0..24)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let account = Arc::clone(&account);
                tokio::spawn(async move { ledger.get_new_address(&account, CoinType::Skycoin).await })
            })
            .collect();

        let mut issued = HashSet::new();
        for task in tasks {
            issued.insert(task.await.unwrap().unwrap());
        }

        assert_eq!(issued.len(), 24);
        let stored = ledger.addresses(&account, CoinType::Skycoin).await.unwrap();
        assert_eq!(stored.len(), 24);
        assert_eq!(stored.into_iter().collect::<HashSet<_>>(), issued);
    }

    #[tokio::test]
    async fn wallet_lock_does_not_block_balances() {
        let (_temp, ledger) = ledger();
        let (_, account) = register(&ledger);

        let _wallet_guard = account.wallet_lock.lock().await;
        ledger.set_balance(&account, CoinType::Bitcoin, 9).unwrap();
        assert_eq!(ledger.get_balance(&account, CoinType::Bitcoin).unwrap(), 9);
    }
}
