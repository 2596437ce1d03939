// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for sealed requests.
//!
//! ```rust,ignore
//! async fn handler(State(state): State<AppState>, Sealed { caller, payload }: Sealed<GetTxRequest>) -> Response {
//!     // caller is the authenticated sender, payload the decrypted request
//! }
//! ```
//!
//! `GET` requests carry the envelope as the `envelope` query parameter,
//! everything else as a JSON body.

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::Method,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{reply::sealed_reply, CallerContext, SealedMessage};
use crate::error::ExchangeError;
use crate::state::AppState;

/// A decrypted request together with its authenticated sender.
#[derive(Debug)]
pub struct Sealed<T> {
    pub caller: CallerContext,
    pub payload: T,
}

impl<T> FromRequest<AppState> for Sealed<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let sealed = if req.method() == Method::GET {
            let (mut parts, _body) = req.into_parts();
            Query::<SealedMessage>::from_request_parts(&mut parts, state)
                .await
                .map(|Query(sealed)| sealed)
                .map_err(|rejection| {
                    debug!(error = %rejection, "Missing envelope query parameter");
                    ExchangeError::invalid("missing envelope").into_response()
                })?
        } else {
            Json::<SealedMessage>::from_request(req, state)
                .await
                .map(|Json(sealed)| sealed)
                .map_err(|rejection| {
                    debug!(error = %rejection, "Missing envelope body");
                    ExchangeError::invalid("missing envelope").into_response()
                })?
        };

        let (caller, plaintext) = state
            .channel
            .open(&sealed)
            .map_err(IntoResponse::into_response)?;

        // An empty plaintext stands for a request without parameters.
        let decoded = if plaintext.is_empty() {
            serde_json::from_slice(b"{}")
        } else {
            serde_json::from_slice(&plaintext)
        };

        match decoded {
            Ok(payload) => Ok(Sealed { caller, payload }),
            Err(e) => {
                debug!(account = %caller.account_id, error = %e, "Undecodable request payload");
                Err(sealed_reply::<()>(
                    &state.channel,
                    &caller,
                    Err(ExchangeError::invalid("malformed request payload")),
                ))
            }
        }
    }
}
