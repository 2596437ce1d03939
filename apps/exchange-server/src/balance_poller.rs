// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Balance Poller
//!
//! Background task that periodically refreshes every account's recorded
//! balances from the coin gateways, so `GetBalance` reads stay close to the
//! chain even for accounts that never ask.
//!
//! ## Strategy
//!
//! Every `poll_interval` the poller snapshots the ledger's accounts and, for
//! each tracked coin, queries the gateway for the account's addresses and
//! stores the result. No ledger lock is held while a daemon call is in
//! flight; the write lock is only taken for the final store.
//!
//! ## Shutdown
//!
//! Stops when its `CancellationToken` is cancelled.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::account::AccountState;
use crate::coin::Balance;
use crate::error::ExchangeError;
use crate::models::CoinType;
use crate::state::AppState;

/// Refresh one account's balance for `coin` from its gateway.
///
/// Accounts without issued addresses are recorded as zero without a daemon
/// call. Refreshes of the same account and coin run one at a time, so the
/// stored value is always the most recent daemon reading.
pub async fn refresh_balance(
    state: &AppState,
    account: &AccountState,
    coin: CoinType,
) -> Result<Balance, ExchangeError> {
    let _refresh = account.refresh_lock(coin)?.lock().await;
    let gateway = state.gateways.get(coin)?;

    let addresses = state.ledger.addresses(account, coin).await?;
    let balance = if addresses.is_empty() {
        Balance::default()
    } else {
        gateway.get_balance(&addresses).await?
    };

    state.ledger.set_balance(account, coin, balance.amount)?;
    debug!(account = %account.id, %coin, amount = balance.amount, "Refreshed balance");
    Ok(balance)
}

pub struct BalancePoller {
    state: AppState,
    poll_interval: Duration,
}

impl BalancePoller {
    pub fn new(state: AppState, poll_interval: Duration) -> Self {
        Self {
            state,
            poll_interval,
        }
    }

    /// Run the poller loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(poller.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Balance poller starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Balance poller shutting down");
                    return;
                }
            }

            self.poll_step().await;
        }
    }

    /// One sweep over all accounts.
    pub async fn poll_step(&self) {
        let accounts = self.state.ledger.accounts();
        if accounts.is_empty() {
            return;
        }

        debug!(count = accounts.len(), "Balance poller: refreshing accounts");

        for account in &accounts {
            for coin in account.coins() {
                if let Err(e) = refresh_balance(&self.state, account, coin).await {
                    warn!(
                        account = %account.id,
                        %coin,
                        error = %e,
                        "Balance poller: refresh failed"
                    );
                }
            }
        }
    }
}
