// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::ExchangeError;
use crate::models::{AccountId, CoinType};

/// One registered account.
#[derive(Debug)]
pub struct AccountState {
    pub id: AccountId,
    pub wallet_id: String,
    pub created_at: DateTime<Utc>,
    balances: RwLock<BTreeMap<CoinType, u64>>,
    pub(crate) wallet_lock: Mutex<()>,
    /// Serializes daemon refreshes per coin so a slow, older reading never
    /// overwrites a newer one. Balance reads do not take it.
    refresh_locks: BTreeMap<CoinType, Mutex<()>>,
}

impl AccountState {
    /// Starts with a zero balance for every coin in `coins`.
    pub fn new(id: AccountId, wallet_id: String, coins: &[CoinType]) -> Self {
        Self {
            id,
            wallet_id,
            created_at: Utc::now(),
            balances: RwLock::new(coins.iter().map(|coin| (*coin, 0)).collect()),
            wallet_lock: Mutex::new(()),
            refresh_locks: coins.iter().map(|coin| (*coin, Mutex::new(()))).collect(),
        }
    }

    pub(crate) fn refresh_lock(&self, coin: CoinType) -> Result<&Mutex<()>, ExchangeError> {
        self.refresh_locks
            .get(&coin)
            .ok_or_else(|| ExchangeError::UnsupportedCoin(coin.to_string()))
    }

    pub fn balance(&self, coin: CoinType) -> Result<u64, ExchangeError> {
        let balances = self
            .balances
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        balances
            .get(&coin)
            .copied()
            .ok_or_else(|| ExchangeError::UnsupportedCoin(coin.to_string()))
    }

    pub(crate) fn set_balance(&self, coin: CoinType, amount: u64) -> Result<(), ExchangeError> {
        let mut balances = self
            .balances
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match balances.get_mut(&coin) {
            Some(slot) => {
                *slot = amount;
                Ok(())
            }
            None => Err(ExchangeError::UnsupportedCoin(coin.to_string())),
        }
    }

    pub fn balances(&self) -> BTreeMap<CoinType, u64> {
        self.balances
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn coins(&self) -> Vec<CoinType> {
        self.balances
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balances_cover_exactly_tracked_coins() {
        let state = AccountState::new(AccountId("02ab".into()), "w".into(), &[CoinType::Skycoin]);

        assert_eq!(state.balance(CoinType::Skycoin).unwrap(), 0);
        assert!(matches!(
            state.balance(CoinType::Bitcoin),
            Err(ExchangeError::UnsupportedCoin(_))
        ));
        assert!(matches!(
            state.set_balance(CoinType::Bitcoin, 5),
            Err(ExchangeError::UnsupportedCoin(_))
        ));
        assert_eq!(state.coins(), vec![CoinType::Skycoin]);
        assert!(state.refresh_lock(CoinType::Skycoin).is_ok());
        assert!(state.refresh_lock(CoinType::Bitcoin).is_err());

        state.set_balance(CoinType::Skycoin, 42).unwrap();
        assert_eq!(state.balances().get(&CoinType::Skycoin), Some(&42));
    }
}
