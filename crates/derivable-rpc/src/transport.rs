use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, error};

use crate::error::{RpcError, RpcResult};

/// Moves a serialized JSON-RPC body to a node and returns the raw reply.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn post(&self, url: &str, body: Vec<u8>) -> RpcResult<Vec<u8>>;
}

/// HTTP POST transport backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> RpcResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn post(&self, url: &str, body: Vec<u8>) -> RpcResult<Vec<u8>> {
        debug!(url, bytes = body.len(), "posting JSON-RPC request");

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!("JSON-RPC request to {} failed: {}", url, e);
                RpcError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("JSON-RPC endpoint {} returned {}", url, status);
            return Err(RpcError::Network(format!("HTTP status {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RpcError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
