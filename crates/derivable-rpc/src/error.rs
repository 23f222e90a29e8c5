use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extra context a node attaches to an error object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseErrorData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_slots_behind: Option<i64>,
}

/// The `error` member of a JSON-RPC response envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<ResponseErrorData>,
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{code}: ")?,
            None => write!(f, "unknown code: ")?,
        }
        f.write_str(self.message.as_deref().unwrap_or("no message"))
    }
}

/// RPC client errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    #[error("invalid API url: {0}")]
    InvalidApiUrl(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response")]
    InvalidResponse,

    #[error("response error {0}")]
    ResponseError(ResponseError),

    #[error("blockhash not found")]
    BlockhashNotFound,

    #[error("could not retrieve account info")]
    CouldNotRetrieveAccountInfo,

    #[error("transaction simulation failed: {} log lines", .0.len())]
    TransactionSimulationError(Vec<String>),

    #[error("network error: {0}")]
    Network(String),
}

impl RpcError {
    /// True for failures where the node was never reached.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

pub type RpcResult<T> = Result<T, RpcError>;
