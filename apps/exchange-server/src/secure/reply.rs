// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sealing handler outcomes back to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use super::{CallerContext, SecureChannel};
use crate::error::ExchangeError;
use crate::models::Reply;

/// Seal `outcome` to the caller.
///
/// Business failures are sealed like successes and sent with `200 OK`. Only a
/// failure to seal falls back to a plaintext error.
pub fn sealed_reply<T: Serialize>(
    channel: &SecureChannel,
    caller: &CallerContext,
    outcome: Result<T, ExchangeError>,
) -> Response {
    let reply = match outcome {
        Ok(body) => Reply::success(body),
        Err(err) => {
            log_failure(caller, &err);
            Reply::failure(&err)
        }
    };

    let payload = match serde_json::to_vec(&reply) {
        Ok(payload) => payload,
        Err(e) => {
            error!(account = %caller.account_id, error = %e, "Failed to encode reply");
            return ExchangeError::server("reply encoding").into_response();
        }
    };

    match channel.seal(&caller.public_key, &payload) {
        Ok(sealed) => (StatusCode::OK, Json(sealed)).into_response(),
        Err(err) => {
            error!(account = %caller.account_id, error = %err, "Failed to seal reply");
            err.into_response()
        }
    }
}

fn log_failure(caller: &CallerContext, err: &ExchangeError) {
    if err.is_internal() {
        error!(account = %caller.account_id, code = ?err.code(), error = %err, "Request failed");
    } else if matches!(err, ExchangeError::RejectedByNetwork(_)) {
        warn!(account = %caller.account_id, error = %err, "Transaction rejected by network");
    } else {
        info!(account = %caller.account_id, code = ?err.code(), error = %err, "Request refused");
    }
}
