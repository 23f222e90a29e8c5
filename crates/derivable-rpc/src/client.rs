use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{ResponseError, RpcError, RpcResult};
use crate::models::{
    AccountInfo, EncodedAccount, EncodedTokenAccount, FeeInfo, LatestBlockhash, SignatureInfo,
    SignatureStatus, SimulationResult, TokenAccount, TokenAccountBalance, TransactionInfo,
    WithContext,
};
use crate::request::{JsonRpcRequest, RequestConfiguration, TokenAccountFilter};
use crate::transport::{HttpTransport, RpcTransport};

const BLOCKHASH_NOT_FOUND_MESSAGE: &str = "Blockhash not found";
const BLOCKHASH_NOT_FOUND_ERR: &str = "BlockhashNotFound";
const SIMULATION_FAILED_PREFIX: &str = "Transaction simulation failed: ";
const LOG_ERROR_MARKER: &str = "Error:";

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    #[serde(default)]
    id: Option<Value>,
    result: Option<T>,
    #[serde(default)]
    error: Option<ResponseError>,
}

impl<T> RpcResponse<T> {
    fn into_result(self, method: &str) -> RpcResult<T> {
        if let Some(error) = self.error {
            warn!(method, %error, "node returned an error");
            return Err(RpcError::ResponseError(error));
        }
        self.result.ok_or_else(|| {
            warn!(method, "node returned no result");
            RpcError::InvalidResponse
        })
    }
}

/// JSON-RPC client bound to one swappable endpoint.
///
/// The client holds no per-call state and can be shared across tasks.
/// `update_endpoint` affects calls started after it returns.
pub struct JsonRpcClient {
    endpoint: RwLock<String>,
    transport: Arc<dyn RpcTransport>,
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("endpoint", &self.endpoint())
            .finish_non_exhaustive()
    }
}

impl JsonRpcClient {
    pub fn new(endpoint: impl Into<String>, transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            endpoint: RwLock::new(endpoint.into()),
            transport,
        }
    }

    /// Client over HTTP with the given request timeout.
    pub fn with_http(endpoint: impl Into<String>, timeout: Duration) -> RpcResult<Self> {
        Ok(Self::new(endpoint, Arc::new(HttpTransport::new(timeout)?)))
    }

    pub fn endpoint(&self) -> String {
        self.endpoint
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn update_endpoint(&self, endpoint: impl Into<String>) {
        let endpoint = endpoint.into();
        debug!(%endpoint, "switching RPC endpoint");
        *self
            .endpoint
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = endpoint;
    }

    fn validated_endpoint(&self) -> RpcResult<String> {
        let endpoint = self.endpoint();
        reqwest::Url::parse(&endpoint).map_err(|_| RpcError::InvalidApiUrl(endpoint.clone()))?;
        Ok(endpoint)
    }

    async fn post<B: serde::Serialize>(&self, body: &B) -> RpcResult<Vec<u8>> {
        let url = self.validated_endpoint()?;
        let body = serde_json::to_vec(body).map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
        self.transport.post(&url, body).await
    }

    // -- generic -----------------------------------------------------------

    /// Single call; the `result` member decoded as `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> RpcResult<T> {
        debug!(method, "JSON-RPC call");
        let request = JsonRpcRequest::new(method, params);
        let bytes = self.post(&request).await?;
        let response: RpcResponse<T> = serde_json::from_slice(&bytes).map_err(|e| {
            warn!(method, "undecodable response: {}", e);
            RpcError::InvalidResponse
        })?;
        response.into_result(method)
    }

    /// One call per params entry, sent as a single batch. Results come back
    /// in input order regardless of the order the node answers in.
    pub async fn batch_request<T: DeserializeOwned>(
        &self,
        method: &str,
        params_list: Vec<Vec<Value>>,
    ) -> RpcResult<Vec<RpcResult<T>>> {
        if params_list.is_empty() {
            return Ok(Vec::new());
        }
        debug!(method, count = params_list.len(), "JSON-RPC batch call");

        let requests: Vec<JsonRpcRequest> = params_list
            .into_iter()
            .map(|params| JsonRpcRequest::new(method, params))
            .collect();
        let bytes = self.post(&requests).await?;

        let responses: Vec<RpcResponse<Value>> = match serde_json::from_slice(&bytes) {
            Ok(responses) => responses,
            Err(_) => {
                // Nodes that reject a batch answer with one error envelope.
                let single: RpcResponse<Value> =
                    serde_json::from_slice(&bytes).map_err(|_| RpcError::InvalidResponse)?;
                return Err(single
                    .into_result(method)
                    .err()
                    .unwrap_or(RpcError::InvalidResponse));
            }
        };

        let mut by_id: HashMap<String, RpcResponse<Value>> = HashMap::new();
        let mut unkeyed = Vec::new();
        for response in responses {
            match response.id.as_ref().and_then(Value::as_str) {
                Some(id) => {
                    by_id.insert(id.to_string(), response);
                }
                None => unkeyed.push(response),
            }
        }
        let mut unkeyed = unkeyed.into_iter();

        Ok(requests
            .iter()
            .map(|request| {
                let response = by_id
                    .remove(&request.id)
                    .or_else(|| unkeyed.next())
                    .ok_or(RpcError::InvalidResponse)?;
                let value = response.into_result(method)?;
                if value.is_null() {
                    return Err(RpcError::InvalidResponse);
                }
                serde_json::from_value(value).map_err(|_| RpcError::InvalidResponse)
            })
            .collect())
    }

    // -- chain state ---------------------------------------------------------

    pub async fn get_balance(&self, account: &str, commitment: Option<&str>) -> RpcResult<u64> {
        let mut params = vec![json!(account)];
        params.extend(commitment_param(commitment));
        let response: WithContext<u64> = self.request("getBalance", params).await?;
        Ok(response.value)
    }

    pub async fn get_block_height(&self) -> RpcResult<u64> {
        self.request("getBlockHeight", Vec::new()).await
    }

    pub async fn get_slot(&self) -> RpcResult<u64> {
        self.request("getSlot", Vec::new()).await
    }

    pub async fn get_fees(&self, commitment: Option<&str>) -> RpcResult<FeeInfo> {
        let response: WithContext<FeeInfo> = self
            .request("getFees", commitment_param(commitment).into_iter().collect())
            .await?;
        Ok(response.value)
    }

    pub async fn get_recent_blockhash(&self, commitment: Option<&str>) -> RpcResult<String> {
        let response: WithContext<FeeInfo> = self
            .request(
                "getRecentBlockhash",
                commitment_param(commitment).into_iter().collect(),
            )
            .await?;
        response.value.blockhash.ok_or(RpcError::BlockhashNotFound)
    }

    pub async fn get_latest_blockhash(
        &self,
        commitment: Option<&str>,
    ) -> RpcResult<LatestBlockhash> {
        let response: WithContext<LatestBlockhash> = self
            .request(
                "getLatestBlockhash",
                commitment_param(commitment).into_iter().collect(),
            )
            .await?;
        Ok(response.value)
    }

    pub async fn get_minimum_balance_for_rent_exemption(&self, span: u64) -> RpcResult<u64> {
        self.request(
            "getMinimumBalanceForRentExemption",
            vec![json!(span), json!({"commitment": "recent"})],
        )
        .await
    }

    // -- accounts ------------------------------------------------------------

    /// `Ok(None)` when the account does not exist. Undecodable account data
    /// and empty replies both surface as `CouldNotRetrieveAccountInfo`.
    pub async fn get_account_info(&self, account: &str) -> RpcResult<Option<AccountInfo>> {
        let params = vec![json!(account), json!({"encoding": "base64"})];
        let response: WithContext<Option<EncodedAccount>> =
            match self.request("getAccountInfo", params).await {
                Ok(response) => response,
                Err(RpcError::InvalidResponse) => return Err(RpcError::CouldNotRetrieveAccountInfo),
                Err(e) => return Err(e),
            };
        match response.value {
            None => Ok(None),
            Some(encoded) => encoded
                .decode()
                .map(Some)
                .ok_or(RpcError::CouldNotRetrieveAccountInfo),
        }
    }

    pub async fn get_token_accounts_by_owner(
        &self,
        owner: &str,
        filter: TokenAccountFilter,
        commitment: Option<&str>,
    ) -> RpcResult<Vec<TokenAccount>> {
        let config = RequestConfiguration {
            commitment: commitment.map(str::to_string),
            encoding: Some("base64".into()),
            ..RequestConfiguration::default()
        };
        let filter =
            serde_json::to_value(filter).map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
        let mut params = vec![json!(owner), filter];
        params.extend(config.into_param());

        let response: WithContext<Vec<EncodedTokenAccount>> =
            self.request("getTokenAccountsByOwner", params).await?;
        response
            .value
            .into_iter()
            .map(|encoded| {
                let account = encoded
                    .account
                    .decode()
                    .ok_or(RpcError::CouldNotRetrieveAccountInfo)?;
                Ok(TokenAccount {
                    pubkey: encoded.pubkey,
                    account,
                })
            })
            .collect()
    }

    pub async fn get_token_account_balance(
        &self,
        pubkey: &str,
        commitment: Option<&str>,
    ) -> RpcResult<TokenAccountBalance> {
        let mut params = vec![json!(pubkey)];
        params.extend(commitment_param(commitment));
        let response: WithContext<TokenAccountBalance> =
            self.request("getTokenAccountBalance", params).await?;
        if response.value.raw_amount().is_none() {
            return Err(RpcError::CouldNotRetrieveAccountInfo);
        }
        Ok(response.value)
    }

    // -- history -------------------------------------------------------------

    pub async fn get_signatures_for_address(
        &self,
        address: &str,
        config: RequestConfiguration,
    ) -> RpcResult<Vec<SignatureInfo>> {
        let mut params = vec![json!(address)];
        params.extend(config.into_param());
        self.request("getSignaturesForAddress", params).await
    }

    pub async fn get_transaction(
        &self,
        signature: &str,
        commitment: Option<&str>,
    ) -> RpcResult<TransactionInfo> {
        self.request("getTransaction", vec![json!(signature), parsed_config(commitment)])
            .await
    }

    /// `getTransaction` for many signatures in one batch.
    pub async fn get_transactions(
        &self,
        signatures: &[String],
        commitment: Option<&str>,
    ) -> RpcResult<Vec<RpcResult<TransactionInfo>>> {
        let params = signatures
            .iter()
            .map(|signature| vec![json!(signature), parsed_config(commitment)])
            .collect();
        self.batch_request("getTransaction", params).await
    }

    pub async fn get_signature_statuses(
        &self,
        signatures: &[String],
        search_transaction_history: bool,
    ) -> RpcResult<Vec<Option<SignatureStatus>>> {
        let mut params = vec![json!(signatures)];
        if search_transaction_history {
            params.push(json!({"searchTransactionHistory": true}));
        }
        let response: WithContext<Vec<Option<SignatureStatus>>> =
            self.request("getSignatureStatuses", params).await?;
        Ok(response.value)
    }

    // -- submission ----------------------------------------------------------

    /// Submit a Base64 wire transaction and return its signature.
    ///
    /// A stale blockhash surfaces as `BlockhashNotFound`. Other node errors
    /// keep their code and data but carry the most readable message found.
    pub async fn send_transaction(
        &self,
        transaction: &str,
        config: Option<RequestConfiguration>,
    ) -> RpcResult<String> {
        let config = config.unwrap_or_else(|| RequestConfiguration::encoding("base64"));
        let mut params = vec![json!(transaction)];
        params.extend(config.into_param());

        match self.request::<String>("sendTransaction", params).await {
            Err(RpcError::ResponseError(error)) => Err(readable_send_error(error)),
            other => other,
        }
    }

    /// Simulate a Base64 wire transaction against the latest blockhash.
    pub async fn simulate_transaction(&self, transaction: &str) -> RpcResult<SimulationResult> {
        let config = RequestConfiguration {
            commitment: Some("confirmed".into()),
            encoding: Some("base64".into()),
            replace_recent_blockhash: Some(true),
            ..RequestConfiguration::default()
        };
        let mut params = vec![json!(transaction)];
        params.extend(config.into_param());

        let response: WithContext<SimulationResult> =
            match self.request("simulateTransaction", params).await {
                Ok(response) => response,
                Err(RpcError::ResponseError(error)) if mentions_missing_blockhash(&error) => {
                    return Err(RpcError::BlockhashNotFound)
                }
                Err(e) => return Err(e),
            };

        let result = response.value;
        match &result.err {
            None => Ok(result),
            Some(err) if err.as_str() == Some(BLOCKHASH_NOT_FOUND_ERR) => {
                Err(RpcError::BlockhashNotFound)
            }
            Some(_) => Err(RpcError::TransactionSimulationError(result.logs)),
        }
    }
}

fn commitment_param(commitment: Option<&str>) -> Option<Value> {
    commitment.map(|c| json!({ "commitment": c }))
}

fn parsed_config(commitment: Option<&str>) -> Value {
    let config = RequestConfiguration {
        commitment: commitment.map(str::to_string),
        encoding: Some("jsonParsed".into()),
        max_supported_transaction_version: Some(0),
        ..RequestConfiguration::default()
    };
    config.into_param().unwrap_or(Value::Null)
}

fn mentions_missing_blockhash(error: &ResponseError) -> bool {
    error
        .message
        .as_deref()
        .is_some_and(|m| m.contains(BLOCKHASH_NOT_FOUND_MESSAGE))
}

fn readable_send_error(error: ResponseError) -> RpcError {
    if mentions_missing_blockhash(&error) {
        return RpcError::BlockhashNotFound;
    }

    let from_logs = error
        .data
        .as_ref()
        .and_then(|d| d.logs.as_ref())
        .and_then(|logs| logs.iter().find(|line| line.contains(LOG_ERROR_MARKER)))
        .and_then(|line| line.rsplit(LOG_ERROR_MARKER).next())
        .map(|tail| tail.trim().to_string());
    let message = from_logs.or_else(|| {
        error.message.as_deref().map(|m| {
            m.rsplit(SIMULATION_FAILED_PREFIX)
                .next()
                .unwrap_or(m)
                .to_string()
        })
    });

    RpcError::ResponseError(ResponseError { message, ..error })
}
