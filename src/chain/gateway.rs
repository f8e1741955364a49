//! Chain node RPC client.
//!
//! # Responsibilities
//! - Expose the five node endpoints the push pipeline needs
//! - Enforce a per-request timeout
//! - Turn HTTP and decoding failures into `ChainError`
//!
//! No call is retried; a failure surfaces immediately to the pipeline.

use std::time::{Duration, Instant};

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::{header, Client, ClientBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, trace};
use url::Url;

use crate::chain::types::{
    AbiBinResponse, Action, ChainError, ChainInfo, ChainResult, Digest, DigestResponse,
    ErrorEnvelope, PushTransactionRequest, RequiredKeysResponse, Transaction,
};
use crate::config::EndpointConfig;
use crate::observability::metrics;

const GET_INFO: &str = "/v1/chain/get_info";
const ABI_JSON_TO_BIN: &str = "/v1/chain/abi_json_to_bin";
const TRX_JSON_TO_DIGEST: &str = "/v1/chain/trx_json_to_digest";
const PUSH_TRANSACTION: &str = "/v1/chain/push_transaction";
const GET_REQUIRED_KEYS: &str = "/v1/chain/get_required_keys";

/// Remote calls made against a chain node.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Current head state of the chain.
    async fn get_info(&self) -> ChainResult<ChainInfo>;

    /// Binary-encode an action's arguments; returns the hex payload.
    async fn abi_json_to_bin(&self, action: &Action) -> ChainResult<String>;

    /// Digest the node expects to be signed for this transaction.
    async fn trx_json_to_digest(&self, transaction: &Transaction) -> ChainResult<Digest>;

    /// Public keys whose signatures authorize `transaction`, chosen from `available_keys`.
    async fn get_required_keys(
        &self,
        transaction: &Transaction,
        available_keys: &[String],
    ) -> ChainResult<Vec<String>>;

    /// Submit a signed transaction. The raw response is returned whatever the
    /// HTTP status, so that rejections can be interpreted by the caller.
    async fn push_transaction(&self, request: &PushTransactionRequest) -> ChainResult<Value>;
}

/// `ChainGateway` over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http_client: Client,
    url: Url,
    timeout_secs: u64,
}

impl HttpGateway {
    /// Create a gateway for `base_uri` (e.g. `http://127.0.0.1:8888`).
    pub fn new(base_uri: &str, timeout_secs: u64) -> ChainResult<Self> {
        let url: Url = base_uri
            .parse()
            .map_err(|e| ChainError::Rpc(format!("Invalid node URL '{}': {}", base_uri, e)))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        let user_agent = format!("evt-client-{}", env!("CARGO_PKG_VERSION"));
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&user_agent)
                .map_err(|e| ChainError::Rpc(format!("Invalid user agent format: {e}")))?,
        );

        let http_client = ClientBuilder::new()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ChainError::Rpc(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http_client, url, timeout_secs })
    }

    /// Create a gateway from the `[endpoint]` config section.
    pub fn from_endpoint(endpoint: &EndpointConfig, timeout_secs: u64) -> ChainResult<Self> {
        Self::new(&endpoint.base_url(), timeout_secs)
    }

    fn uri(&self, path: &str) -> String {
        format!("{}{}", self.url.as_str().trim_end_matches('/'), path)
    }

    fn map_send_error(&self, err: reqwest::Error) -> ChainError {
        if err.is_timeout() {
            ChainError::Timeout(self.timeout_secs)
        } else {
            ChainError::Rpc(err.to_string())
        }
    }

    /// Send a request and return status plus body text.
    async fn send<B: Serialize + ?Sized>(
        &self,
        endpoint: &'static str,
        body: Option<&B>,
    ) -> ChainResult<(StatusCode, String)> {
        let uri = self.uri(endpoint);
        debug!(%uri, "Sending request to chain node");

        let request = match body {
            Some(body) => self.http_client.post(&uri).json(body),
            None => self.http_client.get(&uri),
        };

        let started = Instant::now();
        let result = async {
            let response = request.send().await.map_err(|e| self.map_send_error(e))?;
            let status = response.status();
            let text = response.text().await.map_err(|e| self.map_send_error(e))?;
            Ok::<_, ChainError>((status, text))
        }
        .await;

        let success = matches!(&result, Ok((status, _)) if status.is_success());
        metrics::record_remote_call(endpoint, success, started.elapsed());
        trace!(?result, "Received response from chain node");
        result
    }

    /// Send a request and decode a successful JSON body into `T`.
    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        body: Option<&B>,
    ) -> ChainResult<T> {
        let (status, text) = self.send(endpoint, body).await?;

        if !status.is_success() {
            if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&text) {
                return Err(envelope.error.into());
            }
            return Err(ChainError::Http { status: status.as_u16(), body: text });
        }

        serde_json::from_str::<T>(&text)
            .map_err(|err| ChainError::ParseResponse(format!("Error: {err}, Body: {text}")))
    }
}

#[async_trait]
impl ChainGateway for HttpGateway {
    #[instrument(skip(self))]
    async fn get_info(&self) -> ChainResult<ChainInfo> {
        self.call::<Value, ChainInfo>(GET_INFO, None).await
    }

    #[instrument(skip(self, action), fields(action = %action.action))]
    async fn abi_json_to_bin(&self, action: &Action) -> ChainResult<String> {
        let res: AbiBinResponse = self.call(ABI_JSON_TO_BIN, Some(action)).await?;
        Ok(res.binargs)
    }

    #[instrument(skip(self, transaction))]
    async fn trx_json_to_digest(&self, transaction: &Transaction) -> ChainResult<Digest> {
        let res: DigestResponse = self.call(TRX_JSON_TO_DIGEST, Some(transaction)).await?;
        Ok(res.digest)
    }

    #[instrument(skip(self, transaction))]
    async fn get_required_keys(
        &self,
        transaction: &Transaction,
        available_keys: &[String],
    ) -> ChainResult<Vec<String>> {
        let body = json!({
            "transaction": transaction,
            "available_keys": available_keys,
        });
        let res: RequiredKeysResponse = self.call(GET_REQUIRED_KEYS, Some(&body)).await?;
        Ok(res.required_keys)
    }

    #[instrument(skip(self, request), fields(signatures = request.signatures.len()))]
    async fn push_transaction(&self, request: &PushTransactionRequest) -> ChainResult<Value> {
        let (status, text) = self.send(PUSH_TRANSACTION, Some(request)).await?;
        if text.trim().is_empty() {
            debug!(%status, "Empty push_transaction response");
            return Ok(Value::Null);
        }
        // Anything unparseable is left for the caller to report as no response
        Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
    }
}
