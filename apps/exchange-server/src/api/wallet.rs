// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller-owned wallets: create, derive addresses, export key-pairs.
//!
//! A wallet is only visible to the account that created it. Any other
//! caller gets the same "unknown wallet" answer as for an id that does not
//! exist, so wallet ids cannot be enumerated.

use axum::{extract::State, response::Response};
use tracing::info;

use super::required;
use crate::error::{ExchangeError, PlainErrorBody};
use crate::models::{
    CoinType, CreateWalletRequest, CreateWalletResponse, GetKeysRequest, GetKeysResponse,
    NewAddressRequest, NewAddressResponse,
};
use crate::secure::{reply::sealed_reply, CallerContext, Sealed, SealedMessage};
use crate::state::AppState;
use crate::wallet::{run_blocking, WalletInfo};

/// Create a wallet for one coin from a caller-chosen seed.
#[utoipa::path(
    post,
    path = "/v1/auth/create/wallet",
    tag = "Wallets",
    request_body = SealedMessage,
    responses(
        (status = 200, description = "Sealed reply with CreateWalletResponse", body = SealedMessage),
        (status = 401, description = "Envelope rejected", body = PlainErrorBody)
    )
)]
pub async fn create_wallet(
    State(state): State<AppState>,
    Sealed { caller, payload }: Sealed<CreateWalletRequest>,
) -> Response {
    let outcome = create(&state, &caller, payload).await;
    sealed_reply(&state.channel, &caller, outcome)
}

async fn create(
    state: &AppState,
    caller: &CallerContext,
    req: CreateWalletRequest,
) -> Result<CreateWalletResponse, ExchangeError> {
    let account = state.ledger.get_active(caller)?;
    let (coin, _) = state.gateways.resolve(&req.coin_type)?;
    let seed = required(&req.seed, "seed")?.to_string();

    let owner = account.id.to_string();
    let id = run_blocking(&state.wallets, move |wallets| {
        wallets.create(&owner, &[coin], &seed)
    })
    .await?;

    info!(account = %account.id, %coin, wallet_id = %id, "Created wallet");
    Ok(CreateWalletResponse { id })
}

/// Derive one new address in a caller-owned wallet.
#[utoipa::path(
    post,
    path = "/v1/auth/create/wallet/address",
    tag = "Wallets",
    request_body = SealedMessage,
    responses(
        (status = 200, description = "Sealed reply with NewAddressResponse", body = SealedMessage),
        (status = 401, description = "Envelope rejected", body = PlainErrorBody)
    )
)]
pub async fn new_address(
    State(state): State<AppState>,
    Sealed { caller, payload }: Sealed<NewAddressRequest>,
) -> Response {
    let outcome = derive_address(&state, &caller, payload).await;
    sealed_reply(&state.channel, &caller, outcome)
}

async fn derive_address(
    state: &AppState,
    caller: &CallerContext,
    req: NewAddressRequest,
) -> Result<NewAddressResponse, ExchangeError> {
    state.ledger.get_active(caller)?;
    let wallet_id = required(&req.wallet_id, "wallet_id")?.to_string();
    let wallet = owned_wallet(state, caller, &wallet_id).await?;

    let coin = match (req.coin_type.trim(), wallet.coins.as_slice()) {
        ("", [only]) => *only,
        ("", _) => return Err(ExchangeError::invalid("no coin_type")),
        (name, _) => name.parse::<CoinType>()?,
    };

    let mut addresses = run_blocking(&state.wallets, move |wallets| {
        wallets.new_addresses(&wallet_id, coin, 1)
    })
    .await?;

    let address = addresses
        .pop()
        .ok_or_else(|| ExchangeError::server("wallet returned no address"))?;
    Ok(NewAddressResponse { address })
}

/// Export the key-pair behind one address of a caller-owned wallet.
#[utoipa::path(
    method(get, post),
    path = "/v1/auth/get/wallet/keys",
    tag = "Wallets",
    params(SealedMessage),
    request_body = SealedMessage,
    responses(
        (status = 200, description = "Sealed reply with GetKeysResponse", body = SealedMessage),
        (status = 401, description = "Envelope rejected", body = PlainErrorBody)
    )
)]
pub async fn get_keys(
    State(state): State<AppState>,
    Sealed { caller, payload }: Sealed<GetKeysRequest>,
) -> Response {
    let outcome = export_keys(&state, &caller, payload).await;
    sealed_reply(&state.channel, &caller, outcome)
}

async fn export_keys(
    state: &AppState,
    caller: &CallerContext,
    req: GetKeysRequest,
) -> Result<GetKeysResponse, ExchangeError> {
    state.ledger.get_active(caller)?;
    let wallet_id = required(&req.wallet_id, "wallet_id")?.to_string();
    let address = required(&req.address, "address")?.to_string();
    owned_wallet(state, caller, &wallet_id).await?;

    let keys = run_blocking(&state.wallets, move |wallets| {
        wallets.keypair(&wallet_id, &address)
    })
    .await?;

    Ok(GetKeysResponse {
        pubkey: keys.pubkey,
        seckey: keys.seckey,
    })
}

async fn owned_wallet(
    state: &AppState,
    caller: &CallerContext,
    wallet_id: &str,
) -> Result<WalletInfo, ExchangeError> {
    let id = wallet_id.to_string();
    let info = run_blocking(&state.wallets, move |wallets| wallets.info(&id)).await?;
    if info.owner != caller.account_id.as_str() {
        return Err(ExchangeError::invalid("unknown wallet"));
    }
    Ok(info)
}
