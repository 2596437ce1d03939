// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account registration, deposit addresses and balances.

use axum::{extract::State, response::Response};
use tracing::info;

use crate::balance_poller::refresh_balance;
use crate::error::{ExchangeError, PlainErrorBody};
use crate::models::{
    CoinType, CreateAccountRequest, CreateAccountResponse, DepositAddressRequest,
    DepositAddressResponse, GetBalanceRequest, GetBalanceResponse,
};
use crate::secure::{reply::sealed_reply, CallerContext, Sealed, SealedMessage};
use crate::state::AppState;
use crate::wallet::{run_blocking, WalletError};

/// Register the envelope sender as an account.
///
/// The account's deposit wallet is owned by the exchange identity, so its
/// keys are never reachable through the wallet endpoints.
#[utoipa::path(
    post,
    path = "/v1/auth/create/account",
    tag = "Accounts",
    request_body = SealedMessage,
    responses(
        (status = 200, description = "Sealed reply with CreateAccountResponse", body = SealedMessage),
        (status = 401, description = "Envelope rejected", body = PlainErrorBody)
    )
)]
pub async fn create_account(
    State(state): State<AppState>,
    Sealed { caller, .. }: Sealed<CreateAccountRequest>,
) -> Response {
    let outcome = create(&state, &caller).await;
    sealed_reply(&state.channel, &caller, outcome)
}

async fn create(state: &AppState, caller: &CallerContext) -> Result<CreateAccountResponse, ExchangeError> {
    if state.ledger.contains(&caller.account_id) {
        return Err(ExchangeError::invalid("account already exists"));
    }

    let owner = crate::secure::keys::public_key_hex(state.server_public_key());
    let seed = format!("{}:{}", state.config.wallet_seed, caller.account_id);
    let coins = state.ledger.supported().to_vec();

    // The wallet outlives the in-memory ledger; re-registering after a
    // restart picks the existing one up again.
    let wallet_id = run_blocking(&state.wallets, move |wallets| {
        match wallets.create(&owner, &coins, &seed) {
            Err(WalletError::AlreadyExists(id)) => Ok(id),
            other => other,
        }
    })
    .await?;

    let account = state.ledger.register(caller.account_id.clone(), wallet_id)?;
    Ok(CreateAccountResponse {
        account_id: account.id.clone(),
        created_at: account.created_at,
    })
}

/// Issue a fresh deposit address for the caller's account.
#[utoipa::path(
    post,
    path = "/v1/auth/create/deposit_address",
    tag = "Accounts",
    request_body = SealedMessage,
    responses(
        (status = 200, description = "Sealed reply with DepositAddressResponse", body = SealedMessage),
        (status = 401, description = "Envelope rejected", body = PlainErrorBody)
    )
)]
pub async fn deposit_address(
    State(state): State<AppState>,
    Sealed { caller, payload }: Sealed<DepositAddressRequest>,
) -> Response {
    let outcome = new_deposit_address(&state, &caller, payload).await;
    sealed_reply(&state.channel, &caller, outcome)
}

async fn new_deposit_address(
    state: &AppState,
    caller: &CallerContext,
    req: DepositAddressRequest,
) -> Result<DepositAddressResponse, ExchangeError> {
    let account = state.ledger.get_active(caller)?;
    let coin: CoinType = req.coin_type.parse()?;
    let address = state.ledger.get_new_address(&account, coin).await?;

    info!(account = %account.id, %coin, %address, "Issued deposit address");
    Ok(DepositAddressResponse {
        account_id: account.id.clone(),
        coin_type: coin,
        address,
    })
}

/// Refresh and return the caller's balance for one coin.
#[utoipa::path(
    method(get, post),
    path = "/v1/auth/get/balance",
    tag = "Accounts",
    params(SealedMessage),
    request_body = SealedMessage,
    responses(
        (status = 200, description = "Sealed reply with GetBalanceResponse", body = SealedMessage),
        (status = 401, description = "Envelope rejected", body = PlainErrorBody)
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    Sealed { caller, payload }: Sealed<GetBalanceRequest>,
) -> Response {
    let outcome = balance(&state, &caller, payload).await;
    sealed_reply(&state.channel, &caller, outcome)
}

async fn balance(
    state: &AppState,
    caller: &CallerContext,
    req: GetBalanceRequest,
) -> Result<GetBalanceResponse, ExchangeError> {
    let account = state.ledger.get_active(caller)?;
    let coin: CoinType = req.coin_type.parse()?;

    let refreshed = refresh_balance(state, &account, coin).await?;
    let balance = state.ledger.get_balance(&account, coin)?;

    Ok(GetBalanceResponse {
        coin_type: coin,
        balance,
        hours: refreshed.hours,
    })
}
