// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operator endpoints, restricted to the configured admin keys.

use axum::{extract::State, response::Response};

use crate::error::{ExchangeError, PlainErrorBody};
use crate::models::{AccountSummary, ListAccountsRequest, ListAccountsResponse};
use crate::secure::{reply::sealed_reply, CallerContext, Sealed, SealedMessage};
use crate::state::AppState;

/// List every registered account with its recorded balances.
#[utoipa::path(
    method(get, post),
    path = "/v1/admin/get/accounts",
    tag = "Admin",
    params(SealedMessage),
    request_body = SealedMessage,
    responses(
        (status = 200, description = "Sealed reply with ListAccountsResponse", body = SealedMessage),
        (status = 401, description = "Envelope rejected", body = PlainErrorBody)
    )
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    Sealed { caller, .. }: Sealed<ListAccountsRequest>,
) -> Response {
    let outcome = accounts(&state, &caller);
    sealed_reply(&state.channel, &caller, outcome)
}

fn accounts(state: &AppState, caller: &CallerContext) -> Result<ListAccountsResponse, ExchangeError> {
    if !state.is_admin(&caller.account_id) {
        return Err(ExchangeError::PermissionDenied);
    }

    let accounts = state
        .ledger
        .accounts()
        .iter()
        .map(|account| AccountSummary {
            account_id: account.id.clone(),
            wallet_id: account.wallet_id.clone(),
            balances: account.balances(),
            created_at: account.created_at,
        })
        .collect();

    Ok(ListAccountsResponse { accounts })
}
