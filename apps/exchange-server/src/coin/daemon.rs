// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client shared by the gateways for talking to chain daemons.
//!
//! Every call is bounded by the configured timeout. Responses map onto
//! [`GatewayError`] as follows:
//!
//! | Daemon answer | Error |
//! |---|---|
//! | 404 on a read | `NotFound` |
//! | 404 on a write | `Upstream` (the daemon lacks the endpoint) |
//! | other 4xx on a write | `Rejected` |
//! | other 4xx on a read | `InvalidRequest` |
//! | 5xx, timeout, transport or decode failure | `Upstream` |

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{GatewayError, GatewayResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Read,
    Write,
}

#[derive(Debug, Clone)]
pub struct DaemonClient {
    name: &'static str,
    base: Url,
    http: Client,
}

impl DaemonClient {
    pub fn new(name: &'static str, base: &Url, timeout: Duration) -> GatewayResult<Self> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Upstream(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { name, base, http })
    }

    fn url(&self, path: &str) -> GatewayResult<Url> {
        self.base
            .join(path)
            .map_err(|e| GatewayError::InvalidRequest(format!("invalid daemon path {path}: {e}")))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> GatewayResult<T> {
        let request = self.http.get(self.url(path)?).query(query);
        let response = self.send(request, path, CallKind::Read).await?;
        response.json::<T>().await.map_err(|e| self.decode_error(path, e))
    }

    pub async fn get_text(&self, path: &str, query: &[(&str, &str)]) -> GatewayResult<String> {
        let request = self.http.get(self.url(path)?).query(query);
        let response = self.send(request, path, CallKind::Read).await?;
        response.text().await.map_err(|e| self.decode_error(path, e))
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> GatewayResult<T> {
        let request = self.http.post(self.url(path)?).json(body);
        let response = self.send(request, path, CallKind::Write).await?;
        response.json::<T>().await.map_err(|e| self.decode_error(path, e))
    }

    pub async fn post_text(&self, path: &str, body: String) -> GatewayResult<String> {
        let request = self.http.post(self.url(path)?).body(body);
        let response = self.send(request, path, CallKind::Write).await?;
        response.text().await.map_err(|e| self.decode_error(path, e))
    }

    async fn send(
        &self,
        request: RequestBuilder,
        path: &str,
        kind: CallKind,
    ) -> GatewayResult<reqwest::Response> {
        debug!(daemon = self.name, path, "Daemon request");

        let response = request.send().await.map_err(|e| {
            warn!(daemon = self.name, path, error = %e, timeout = e.is_timeout(), "Daemon unreachable");
            if e.is_timeout() {
                GatewayError::Upstream(format!("{} timed out on {path}", self.name))
            } else {
                GatewayError::Upstream(format!("{} request to {path} failed: {e}", self.name))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(daemon = self.name, path, %status, body = %body, "Daemon returned an error");

        Err(match status {
            StatusCode::NOT_FOUND if kind == CallKind::Read => GatewayError::NotFound(path.to_string()),
            StatusCode::NOT_FOUND => {
                GatewayError::Upstream(format!("{} has no endpoint {path}", self.name))
            }
            s if s.is_client_error() && kind == CallKind::Write => GatewayError::Rejected(body),
            s if s.is_client_error() => GatewayError::InvalidRequest(format!("{} refused the query", self.name)),
            s => GatewayError::Upstream(format!("{} returned {s} on {path}: {body}", self.name)),
        })
    }

    fn decode_error(&self, path: &str, e: reqwest::Error) -> GatewayError {
        warn!(daemon = self.name, path, error = %e, "Undecodable daemon response");
        GatewayError::Upstream(format!("{} sent an undecodable response on {path}", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::get, routing::post, Router};

    async fn spawn(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/api")).unwrap()
    }

    fn test_router() -> Router {
        Router::new()
            .route("/api/ok", get(|| async { "hello" }))
            .route("/api/missing", get(|| async { (AxumStatus::NOT_FOUND, "no such tx") }))
            .route("/api/bad", get(|| async { (AxumStatus::BAD_REQUEST, "bad query") }))
            .route("/api/reject", post(|| async { (AxumStatus::BAD_REQUEST, "double spend") }))
            .route("/api/gone", post(|| async { (AxumStatus::NOT_FOUND, "404 page not found") }))
            .route("/api/boom", get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }))
            .route("/api/json", get(|| async { "not json" }))
            .route(
                "/api/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    "late"
                }),
            )
    }

    #[tokio::test]
    async fn maps_daemon_statuses() {
        let base = spawn(test_router()).await;
        let client = DaemonClient::new("test", &base, Duration::from_secs(5)).unwrap();

        assert_eq!(client.get_text("ok", &[]).await.unwrap(), "hello");
        assert!(matches!(
            client.get_text("missing", &[]).await,
            Err(GatewayError::NotFound(_))
        ));
        assert!(matches!(
            client.get_text("bad", &[]).await,
            Err(GatewayError::InvalidRequest(_))
        ));
        assert!(matches!(
            client.post_text("reject", "00".into()).await,
            Err(GatewayError::Rejected(body)) if body == "double spend"
        ));
        assert!(matches!(
            client.get_text("boom", &[]).await,
            Err(GatewayError::Upstream(_))
        ));
        assert!(matches!(
            client.get_json::<serde_json::Value>("json", &[]).await,
            Err(GatewayError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn missing_write_endpoint_is_not_a_lookup_miss() {
        let base = spawn(test_router()).await;
        let client = DaemonClient::new("test", &base, Duration::from_secs(5)).unwrap();

        assert!(matches!(
            client.post_text("gone", "00".into()).await,
            Err(GatewayError::Upstream(msg)) if msg.contains("no endpoint")
        ));
    }

    #[tokio::test]
    async fn timeout_is_upstream_error() {
        let base = spawn(test_router()).await;
        let client = DaemonClient::new("test", &base, Duration::from_millis(200)).unwrap();

        assert!(matches!(
            client.get_text("slow", &[]).await,
            Err(GatewayError::Upstream(msg)) if msg.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn unreachable_daemon_is_upstream_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = Url::parse(&format!("http://{addr}/")).unwrap();
        let client = DaemonClient::new("test", &base, Duration::from_secs(1)).unwrap();
        assert!(matches!(
            client.get_text("anything", &[]).await,
            Err(GatewayError::Upstream(_))
        ));
    }

    #[test]
    fn base_path_gets_trailing_slash() {
        let base = Url::parse("http://127.0.0.1:6420/api").unwrap();
        let client = DaemonClient::new("test", &base, Duration::from_secs(1)).unwrap();
        assert_eq!(client.base.as_str(), "http://127.0.0.1:6420/api/");
        assert_eq!(
            client.url("tx/abc/hex").unwrap().as_str(),
            "http://127.0.0.1:6420/api/tx/abc/hex"
        );
    }
}
