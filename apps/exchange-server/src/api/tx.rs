// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction operations dispatched to the coin gateways.
//!
//! Each handler checks, in order: the caller has an account, the coin type
//! resolves to a gateway, and the required fields are present. Only then is
//! the gateway called.

use axum::{extract::State, response::Response};
use tracing::info;

use super::required;
use crate::error::{ExchangeError, PlainErrorBody};
use crate::models::{
    CreateRawTxRequest, CreateRawTxResponse, GetRawTxRequest, GetRawTxResponse, GetTxRequest,
    GetTxResponse, InjectTxRequest, InjectTxResponse,
};
use crate::secure::{reply::sealed_reply, CallerContext, Sealed, SealedMessage};
use crate::state::AppState;

/// Broadcast a raw transaction.
#[utoipa::path(
    post,
    path = "/v1/auth/inject/tx",
    tag = "Transactions",
    request_body = SealedMessage,
    responses(
        (status = 200, description = "Sealed reply with InjectTxResponse", body = SealedMessage),
        (status = 401, description = "Envelope rejected", body = PlainErrorBody)
    )
)]
pub async fn inject_tx(
    State(state): State<AppState>,
    Sealed { caller, payload }: Sealed<InjectTxRequest>,
) -> Response {
    let outcome = inject(&state, &caller, payload).await;
    sealed_reply(&state.channel, &caller, outcome)
}

async fn inject(
    state: &AppState,
    caller: &CallerContext,
    req: InjectTxRequest,
) -> Result<InjectTxResponse, ExchangeError> {
    let account = state.ledger.get_active(caller)?;
    let (coin, gateway) = state.gateways.resolve(&req.coin_type)?;
    let raw = required(&req.tx, "tx")?;

    let txid = gateway.inject_tx(raw).await?;
    info!(account = %account.id, %coin, %txid, "Injected transaction");
    Ok(InjectTxResponse { txid })
}

/// Fetch a normalized transaction.
#[utoipa::path(
    method(get, post),
    path = "/v1/auth/get/tx",
    tag = "Transactions",
    params(SealedMessage),
    request_body = SealedMessage,
    responses(
        (status = 200, description = "Sealed reply with GetTxResponse", body = SealedMessage),
        (status = 401, description = "Envelope rejected", body = PlainErrorBody)
    )
)]
pub async fn get_tx(
    State(state): State<AppState>,
    Sealed { caller, payload }: Sealed<GetTxRequest>,
) -> Response {
    let outcome = fetch_tx(&state, &caller, payload).await;
    sealed_reply(&state.channel, &caller, outcome)
}

async fn fetch_tx(
    state: &AppState,
    caller: &CallerContext,
    req: GetTxRequest,
) -> Result<GetTxResponse, ExchangeError> {
    state.ledger.get_active(caller)?;
    let (_, gateway) = state.gateways.resolve(&req.coin_type)?;
    let txid = required(&req.txid, "txid")?;

    let tx = gateway.get_tx(txid).await?;
    Ok(GetTxResponse { tx })
}

/// Fetch a transaction exactly as the chain serializes it.
#[utoipa::path(
    method(get, post),
    path = "/v1/auth/get/rawtx",
    tag = "Transactions",
    params(SealedMessage),
    request_body = SealedMessage,
    responses(
        (status = 200, description = "Sealed reply with GetRawTxResponse", body = SealedMessage),
        (status = 401, description = "Envelope rejected", body = PlainErrorBody)
    )
)]
pub async fn get_raw_tx(
    State(state): State<AppState>,
    Sealed { caller, payload }: Sealed<GetRawTxRequest>,
) -> Response {
    let outcome = fetch_raw_tx(&state, &caller, payload).await;
    sealed_reply(&state.channel, &caller, outcome)
}

async fn fetch_raw_tx(
    state: &AppState,
    caller: &CallerContext,
    req: GetRawTxRequest,
) -> Result<GetRawTxResponse, ExchangeError> {
    state.ledger.get_active(caller)?;
    let (coin, gateway) = state.gateways.resolve(&req.coin_type)?;
    let txid = required(&req.txid, "txid")?;

    let rawtx = gateway.get_raw_tx(txid).await?;
    Ok(GetRawTxResponse {
        coin_type: coin,
        rawtx,
    })
}

/// Build an unsigned transaction. Never contacts the daemon.
#[utoipa::path(
    post,
    path = "/v1/auth/create/rawtx",
    tag = "Transactions",
    request_body = SealedMessage,
    responses(
        (status = 200, description = "Sealed reply with CreateRawTxResponse", body = SealedMessage),
        (status = 401, description = "Envelope rejected", body = PlainErrorBody)
    )
)]
pub async fn create_raw_tx(
    State(state): State<AppState>,
    Sealed { caller, payload }: Sealed<CreateRawTxRequest>,
) -> Response {
    let outcome = build_raw_tx(&state, &caller, payload);
    sealed_reply(&state.channel, &caller, outcome)
}

fn build_raw_tx(
    state: &AppState,
    caller: &CallerContext,
    req: CreateRawTxRequest,
) -> Result<CreateRawTxResponse, ExchangeError> {
    state.ledger.get_active(caller)?;
    let (_, gateway) = state.gateways.resolve(&req.coin_type)?;
    if req.tx_ins.is_empty() {
        return Err(ExchangeError::invalid("no tx_ins"));
    }
    if req.tx_outs.is_empty() {
        return Err(ExchangeError::invalid("no tx_outs"));
    }

    let rawtx = gateway.create_raw_tx(&req.tx_ins, &req.tx_outs)?;
    Ok(CreateRawTxResponse { rawtx })
}
