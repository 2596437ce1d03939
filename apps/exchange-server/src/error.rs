// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy shared by every layer of the exchange.
//!
//! Internal detail (daemon responses, storage paths) stays in the error value
//! and in the logs. Clients only ever see a [`ResultCode`] and a short reason.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::ApiResult;

/// Coarse status code carried in the `result` object of every reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    Success,
    InvalidRequest,
    UnsupportedCoin,
    AuthenticationFailure,
    NoActiveAccount,
    NotFound,
    RejectedByNetwork,
    UpstreamError,
    PermissionDenied,
    ServerError,
}

/// Every failure an exchange operation can end in.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unsupported coin type: {0}")]
    UnsupportedCoin(String),

    #[error("envelope authentication failed")]
    AuthenticationFailure,

    #[error("caller has no registered account")]
    NoActiveAccount,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rejected by network: {0}")]
    RejectedByNetwork(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error("server error: {0}")]
    Server(String),
}

impl ExchangeError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::Server(message.into())
    }

    pub fn code(&self) -> ResultCode {
        match self {
            ExchangeError::InvalidRequest(_) => ResultCode::InvalidRequest,
            ExchangeError::UnsupportedCoin(_) => ResultCode::UnsupportedCoin,
            ExchangeError::AuthenticationFailure => ResultCode::AuthenticationFailure,
            ExchangeError::NoActiveAccount => ResultCode::NoActiveAccount,
            ExchangeError::NotFound(_) => ResultCode::NotFound,
            ExchangeError::RejectedByNetwork(_) => ResultCode::RejectedByNetwork,
            ExchangeError::Upstream(_) => ResultCode::UpstreamError,
            ExchangeError::PermissionDenied => ResultCode::PermissionDenied,
            ExchangeError::Server(_) => ResultCode::ServerError,
        }
    }

    /// Reason string safe to hand back to a client.
    ///
    /// Upstream, network and server failures collapse to fixed strings so
    /// daemon output and internal topology never leave the process.
    pub fn public_reason(&self) -> String {
        match self {
            ExchangeError::InvalidRequest(msg) => msg.clone(),
            ExchangeError::UnsupportedCoin(coin) => format!("unsupported coin type: {coin}"),
            ExchangeError::AuthenticationFailure => "envelope authentication failed".to_string(),
            ExchangeError::NoActiveAccount => "no active account".to_string(),
            ExchangeError::NotFound(msg) => msg.clone(),
            ExchangeError::RejectedByNetwork(_) => "transaction rejected by network".to_string(),
            ExchangeError::Upstream(_) => "upstream service unavailable".to_string(),
            ExchangeError::PermissionDenied => "admin privileges required".to_string(),
            ExchangeError::Server(_) => "internal server error".to_string(),
        }
    }

    /// HTTP status used when the error has to be sent in plaintext.
    pub fn status(&self) -> StatusCode {
        match self {
            ExchangeError::InvalidRequest(_) | ExchangeError::UnsupportedCoin(_) => {
                StatusCode::BAD_REQUEST
            }
            ExchangeError::AuthenticationFailure | ExchangeError::NoActiveAccount => {
                StatusCode::UNAUTHORIZED
            }
            ExchangeError::PermissionDenied => StatusCode::FORBIDDEN,
            ExchangeError::NotFound(_) => StatusCode::NOT_FOUND,
            ExchangeError::RejectedByNetwork(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ExchangeError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            ExchangeError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this failure points at the exchange or its daemons rather than
    /// at the caller.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ExchangeError::Upstream(_) | ExchangeError::Server(_)
        )
    }
}

/// Body of a plaintext error reply.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlainErrorBody {
    pub result: ApiResult,
}

impl IntoResponse for ExchangeError {
    fn into_response(self) -> Response {
        let body = Json(PlainErrorBody {
            result: ApiResult::from(&self),
        });
        (self.status(), body).into_response()
    }
}
