// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    coin::{NormalizedInput, NormalizedOutput, NormalizedTx, TxIn, TxOut},
    error::{ExchangeError, PlainErrorBody, ResultCode},
    models::{
        AccountId, AccountSummary, ApiResult, CoinType, CreateAccountRequest,
        CreateAccountResponse, CreateRawTxRequest, CreateRawTxResponse, CreateWalletRequest,
        CreateWalletResponse, DepositAddressRequest, DepositAddressResponse, GetBalanceRequest,
        GetBalanceResponse, GetKeysRequest, GetKeysResponse, GetRawTxRequest, GetRawTxResponse,
        GetTxRequest, GetTxResponse, InjectTxRequest, InjectTxResponse, ListAccountsRequest,
        ListAccountsResponse, NewAddressRequest, NewAddressResponse,
    },
    secure::SealedMessage,
    state::AppState,
};

pub mod account;
pub mod admin;
pub mod health;
pub mod tx;
pub mod wallet;

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/create/account", post(account::create_account))
        .route("/create/deposit_address", post(account::deposit_address))
        .route(
            "/get/balance",
            get(account::get_balance).post(account::get_balance),
        )
        .route("/inject/tx", post(tx::inject_tx))
        .route("/get/tx", get(tx::get_tx).post(tx::get_tx))
        .route("/get/rawtx", get(tx::get_raw_tx).post(tx::get_raw_tx))
        .route("/create/rawtx", post(tx::create_raw_tx))
        .route("/create/wallet", post(wallet::create_wallet))
        .route("/create/wallet/address", post(wallet::new_address))
        .route(
            "/get/wallet/keys",
            get(wallet::get_keys).post(wallet::get_keys),
        );

    let admin_routes = Router::new().route(
        "/get/accounts",
        get(admin::list_accounts).post(admin::list_accounts),
    );

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Trimmed value of a required request field, or `InvalidRequest("no {name}")`.
pub(crate) fn required<'a>(value: &'a str, name: &str) -> Result<&'a str, ExchangeError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ExchangeError::invalid(format!("no {name}")));
    }
    Ok(value)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        account::create_account,
        account::deposit_address,
        account::get_balance,
        tx::inject_tx,
        tx::get_tx,
        tx::get_raw_tx,
        tx::create_raw_tx,
        wallet::create_wallet,
        wallet::new_address,
        wallet::get_keys,
        admin::list_accounts,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            SealedMessage,
            PlainErrorBody,
            ApiResult,
            ResultCode,
            CoinType,
            AccountId,
            CreateAccountRequest,
            CreateAccountResponse,
            DepositAddressRequest,
            DepositAddressResponse,
            GetBalanceRequest,
            GetBalanceResponse,
            InjectTxRequest,
            InjectTxResponse,
            GetTxRequest,
            GetTxResponse,
            GetRawTxRequest,
            GetRawTxResponse,
            CreateRawTxRequest,
            CreateRawTxResponse,
            CreateWalletRequest,
            CreateWalletResponse,
            NewAddressRequest,
            NewAddressResponse,
            GetKeysRequest,
            GetKeysResponse,
            ListAccountsRequest,
            ListAccountsResponse,
            AccountSummary,
            NormalizedTx,
            NormalizedInput,
            NormalizedOutput,
            TxIn,
            TxOut
        )
    ),
    tags(
        (name = "Accounts", description = "Account registration, deposit addresses and balances"),
        (name = "Transactions", description = "Transaction lookup, building and broadcast"),
        (name = "Wallets", description = "Caller-owned deterministic wallets"),
        (name = "Admin", description = "Operator endpoints"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
