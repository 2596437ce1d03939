// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Exchange Client
//!
//! Caller side of the secure channel. Every request is sealed with the
//! account key to the exchange key; every reply is opened with the account
//! key and must have been sealed by the exchange key the client was built
//! with.
//!
//! ```rust,ignore
//! let client = ExchangeClient::discover(base_url, KeyPair::generate()).await?;
//! client.create_account().await?;
//! let address = client.deposit_address(CoinType::Skycoin).await?.address;
//! ```

use std::time::Duration;

use k256::PublicKey;
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::api::health::ReadyResponse;
use crate::coin::{TxIn, TxOut};
use crate::error::PlainErrorBody;
use crate::models::{
    ApiResult, CoinType, CreateAccountRequest, CreateAccountResponse, CreateRawTxRequest,
    CreateRawTxResponse, CreateWalletRequest, CreateWalletResponse, DepositAddressRequest,
    DepositAddressResponse, GetBalanceRequest, GetBalanceResponse, GetKeysRequest,
    GetKeysResponse, GetRawTxRequest, GetRawTxResponse, GetTxRequest, GetTxResponse,
    InjectTxRequest, InjectTxResponse, ListAccountsRequest, ListAccountsResponse,
    NewAddressRequest, NewAddressResponse, Reply,
};
use crate::secure::{envelope, keys, KeyPair, SealedMessage};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(String),

    /// Non-200 reply; the exchange answers envelope failures in plaintext.
    #[error("exchange returned HTTP {status}")]
    Http {
        status: u16,
        result: Option<ApiResult>,
    },

    #[error("reply envelope could not be opened")]
    Envelope,

    #[error("reply was not sealed by the exchange key")]
    UnexpectedSender,

    #[error("reply payload was invalid: {0}")]
    InvalidResponse(String),

    /// The exchange processed the request and refused it.
    #[error("exchange refused the request: {0:?}")]
    Exchange(ApiResult),
}

impl ClientError {
    /// The structured result carried by a refusal, if any.
    pub fn result(&self) -> Option<&ApiResult> {
        match self {
            ClientError::Exchange(result) => Some(result),
            ClientError::Http { result, .. } => result.as_ref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Request(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeClient {
    base: Url,
    keys: KeyPair,
    server: PublicKey,
    http: Client,
}

impl ExchangeClient {
    pub fn new(base: Url, keys: KeyPair, server: PublicKey) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self::with_http(base, keys, server, http))
    }

    fn with_http(base: Url, keys: KeyPair, server: PublicKey, http: Client) -> Self {
        Self {
            base: with_trailing_slash(base),
            keys,
            server,
            http,
        }
    }

    /// Build a client, learning the exchange key from `/health`.
    pub async fn discover(base: Url, keys: KeyPair) -> Result<Self, ClientError> {
        Self::discover_with_timeout(base, keys, DEFAULT_TIMEOUT).await
    }

    /// [`ExchangeClient::discover`] with a custom per-request timeout.
    pub async fn discover_with_timeout(
        base: Url,
        keys: KeyPair,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        let base = with_trailing_slash(base);
        let url = join(&base, "health")?;

        let response = http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                result: None,
            });
        }

        let ready: ReadyResponse = response.json().await?;
        let server = keys::public_key_from_hex(&ready.server_public_key)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(Self::with_http(base, keys, server, http))
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    pub fn server_key(&self) -> &PublicKey {
        &self.server
    }

    /// Seal `request` for the exchange.
    pub fn seal<Req: Serialize>(&self, request: &Req) -> Result<SealedMessage, ClientError> {
        let payload =
            serde_json::to_vec(request).map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        let bytes = envelope::encrypt(&payload, &self.keys, &self.server)
            .map_err(|_| ClientError::Envelope)?;
        Ok(SealedMessage::from_bytes(&bytes))
    }

    /// Open a sealed reply and check it came from the exchange.
    pub fn open<Resp: DeserializeOwned>(&self, sealed: &SealedMessage) -> Result<Reply<Resp>, ClientError> {
        let bytes = sealed.to_bytes().map_err(|_| ClientError::Envelope)?;
        let opened = envelope::decrypt(&bytes, &self.keys).map_err(|_| ClientError::Envelope)?;
        if opened.sender != self.server {
            return Err(ClientError::UnexpectedSender);
        }
        serde_json::from_slice(&opened.payload).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Send an already sealed envelope and return the opened reply.
    ///
    /// GET requests carry the envelope as the `envelope` query parameter,
    /// everything else as a JSON body.
    pub async fn send_sealed<Resp: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        sealed: &SealedMessage,
    ) -> Result<Reply<Resp>, ClientError> {
        let url = join(&self.base, path)?;
        let request = if method == Method::GET {
            self.http.get(url).query(sealed)
        } else {
            self.http.request(method, url).json(sealed)
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let result = response
                .json::<PlainErrorBody>()
                .await
                .ok()
                .map(|body| body.result);
            return Err(ClientError::Http {
                status: status.as_u16(),
                result,
            });
        }

        let sealed: SealedMessage = response.json().await?;
        self.open(&sealed)
    }

    /// Seal, send and open, returning the full reply.
    pub async fn call<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        request: &Req,
    ) -> Result<Reply<Resp>, ClientError> {
        let sealed = self.seal(request)?;
        self.send_sealed(method, path, &sealed).await
    }

    /// Like [`ExchangeClient::call`], but a refusal becomes
    /// [`ClientError::Exchange`].
    pub async fn request<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        request: &Req,
    ) -> Result<Resp, ClientError> {
        let reply: Reply<Resp> = self.call(method, path, request).await?;
        if !reply.result.success {
            return Err(ClientError::Exchange(reply.result));
        }
        reply
            .body
            .ok_or_else(|| ClientError::InvalidResponse("successful reply without body".into()))
    }

    pub async fn create_account(&self) -> Result<CreateAccountResponse, ClientError> {
        self.request(Method::POST, "v1/auth/create/account", &CreateAccountRequest {})
            .await
    }

    pub async fn deposit_address(&self, coin: CoinType) -> Result<DepositAddressResponse, ClientError> {
        let req = DepositAddressRequest {
            coin_type: coin.to_string(),
        };
        self.request(Method::POST, "v1/auth/create/deposit_address", &req)
            .await
    }

    pub async fn get_balance(&self, coin: CoinType) -> Result<GetBalanceResponse, ClientError> {
        let req = GetBalanceRequest {
            coin_type: coin.to_string(),
        };
        self.request(Method::GET, "v1/auth/get/balance", &req).await
    }

    pub async fn inject_tx(&self, coin: CoinType, tx: &str) -> Result<InjectTxResponse, ClientError> {
        let req = InjectTxRequest {
            coin_type: coin.to_string(),
            tx: tx.to_string(),
        };
        self.request(Method::POST, "v1/auth/inject/tx", &req).await
    }

    pub async fn get_tx(&self, coin: CoinType, txid: &str) -> Result<GetTxResponse, ClientError> {
        let req = GetTxRequest {
            coin_type: coin.to_string(),
            txid: txid.to_string(),
        };
        self.request(Method::GET, "v1/auth/get/tx", &req).await
    }

    pub async fn get_raw_tx(&self, coin: CoinType, txid: &str) -> Result<GetRawTxResponse, ClientError> {
        let req = GetRawTxRequest {
            coin_type: coin.to_string(),
            txid: txid.to_string(),
        };
        self.request(Method::GET, "v1/auth/get/rawtx", &req).await
    }

    pub async fn create_raw_tx(
        &self,
        coin: CoinType,
        tx_ins: Vec<TxIn>,
        tx_outs: Vec<TxOut>,
    ) -> Result<CreateRawTxResponse, ClientError> {
        let req = CreateRawTxRequest {
            coin_type: coin.to_string(),
            tx_ins,
            tx_outs,
        };
        self.request(Method::POST, "v1/auth/create/rawtx", &req).await
    }

    pub async fn create_wallet(&self, coin: CoinType, seed: &str) -> Result<CreateWalletResponse, ClientError> {
        let req = CreateWalletRequest {
            coin_type: coin.to_string(),
            seed: seed.to_string(),
        };
        self.request(Method::POST, "v1/auth/create/wallet", &req).await
    }

    pub async fn new_address(
        &self,
        wallet_id: &str,
        coin: Option<CoinType>,
    ) -> Result<NewAddressResponse, ClientError> {
        let req = NewAddressRequest {
            wallet_id: wallet_id.to_string(),
            coin_type: coin.map(|c| c.to_string()).unwrap_or_default(),
        };
        self.request(Method::POST, "v1/auth/create/wallet/address", &req)
            .await
    }

    pub async fn get_keys(&self, wallet_id: &str, address: &str) -> Result<GetKeysResponse, ClientError> {
        let req = GetKeysRequest {
            wallet_id: wallet_id.to_string(),
            address: address.to_string(),
        };
        self.request(Method::POST, "v1/auth/get/wallet/keys", &req).await
    }

    pub async fn list_accounts(&self) -> Result<ListAccountsResponse, ClientError> {
        self.request(Method::GET, "v1/admin/get/accounts", &ListAccountsRequest {})
            .await
    }
}

fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn join(base: &Url, path: &str) -> Result<Url, ClientError> {
    base.join(path)
        .map_err(|e| ClientError::Request(format!("invalid path {path}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    async fn spawn(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    fn client() -> (ExchangeClient, KeyPair) {
        let server = KeyPair::generate();
        let base = Url::parse("http://127.0.0.1:1/exchange").unwrap();
        let client = ExchangeClient::new(base, KeyPair::generate(), *server.public_key()).unwrap();
        (client, server)
    }

    #[test]
    fn paths_join_below_base() {
        let (client, _) = client();
        let url = join(&client.base, "v1/auth/get/tx").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:1/exchange/v1/auth/get/tx");
    }

    #[test]
    fn opens_replies_from_the_exchange() {
        let (client, server) = client();
        let reply = Reply::success(InjectTxResponse {
            txid: "ab".repeat(32),
        });
        let payload = serde_json::to_vec(&reply).unwrap();
        let bytes = envelope::encrypt(&payload, &server, client.keys().public_key()).unwrap();

        let opened: Reply<InjectTxResponse> = client.open(&SealedMessage::from_bytes(&bytes)).unwrap();
        assert!(opened.result.success);
        assert_eq!(opened.body.unwrap().txid, "ab".repeat(32));
    }

    #[test]
    fn rejects_replies_from_another_key() {
        let (client, _) = client();
        let impostor = KeyPair::generate();
        let payload = serde_json::to_vec(&Reply::success(InjectTxResponse { txid: "00".into() })).unwrap();
        let bytes = envelope::encrypt(&payload, &impostor, client.keys().public_key()).unwrap();

        let err = client
            .open::<InjectTxResponse>(&SealedMessage::from_bytes(&bytes))
            .unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedSender));
    }

    #[test]
    fn sealed_requests_open_on_the_server() {
        let (client, server) = client();
        let sealed = client
            .seal(&GetTxRequest {
                coin_type: "skycoin".into(),
                txid: "cd".repeat(32),
            })
            .unwrap();

        let opened = envelope::decrypt(&sealed.to_bytes().unwrap(), &server).unwrap();
        assert_eq!(&opened.sender, client.keys().public_key());
        let req: GetTxRequest = serde_json::from_slice(&opened.payload).unwrap();
        assert_eq!(req.coin_type, "skycoin");
    }

    #[tokio::test]
    async fn discover_refuses_unhealthy_exchange() {
        let app = Router::new().route(
            "/health",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "storage down") }),
        );
        let base = spawn(app).await;

        let err = ExchangeClient::discover(base, KeyPair::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Http { status: 503, result: None }));
    }

    #[tokio::test]
    async fn discover_gives_up_on_a_stalled_exchange() {
        let app = Router::new().route(
            "/health",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let base = spawn(app).await;

        let err = ExchangeClient::discover_with_timeout(
            base,
            KeyPair::generate(),
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClientError::Request(_)));
    }

    #[tokio::test]
    async fn discover_learns_exchange_key() {
        let server = KeyPair::generate();
        let server_hex = keys::public_key_hex(server.public_key());
        let app = Router::new().route(
            "/health",
            get(move || {
                let server_hex = server_hex.clone();
                async move {
                    axum::Json(serde_json::json!({
                        "status": "ok",
                        "server_public_key": server_hex,
                        "checks": { "service": "ok", "storage": "ok" }
                    }))
                }
            }),
        );
        let base = spawn(app).await;

        let client = ExchangeClient::discover(base, KeyPair::generate()).await.unwrap();
        assert_eq!(client.server_key(), server.public_key());
    }
}
