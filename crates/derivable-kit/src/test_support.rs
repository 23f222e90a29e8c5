//! Scripted RPC transport for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use derivable_rpc::{JsonRpcClient, RpcError, RpcResult, RpcTransport};
use serde_json::{json, Value};

type Handler = Box<dyn Fn(&str, &Value) -> Value + Send + Sync>;

/// Answers each request with the envelope `handler(method, params)` returns.
pub(crate) struct StubTransport {
    handler: Handler,
    calls: Mutex<HashMap<String, usize>>,
    params: Mutex<Vec<(String, Value)>>,
    delay: Option<Duration>,
    down: bool,
}

impl StubTransport {
    pub(crate) fn new(handler: impl Fn(&str, &Value) -> Value + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(HashMap::new()),
            params: Mutex::new(Vec::new()),
            delay: None,
            down: false,
        }
    }

    pub(crate) fn unreachable() -> Self {
        Self {
            down: true,
            ..Self::new(|_, _| Value::Null)
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    /// Params of every call to `method`, in call order.
    pub(crate) fn params_of(&self, method: &str) -> Vec<Value> {
        self.params
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn answer(&self, request: &Value) -> Value {
        let method = request["method"].as_str().unwrap().to_string();
        *self.calls.lock().unwrap().entry(method.clone()).or_default() += 1;
        self.params
            .lock()
            .unwrap()
            .push((method.clone(), request["params"].clone()));

        let mut envelope = (self.handler)(&method, &request["params"]);
        if envelope.is_null() {
            envelope = json!({"result": null});
        }
        envelope["jsonrpc"] = json!("2.0");
        envelope["id"] = request["id"].clone();
        envelope
    }
}

#[async_trait]
impl RpcTransport for StubTransport {
    async fn post(&self, _url: &str, body: Vec<u8>) -> RpcResult<Vec<u8>> {
        if self.down {
            return Err(RpcError::Network("connection refused".into()));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let request: Value = serde_json::from_slice(&body).unwrap();
        let reply = match request.as_array() {
            Some(batch) => Value::Array(batch.iter().map(|r| self.answer(r)).collect()),
            None => self.answer(&request),
        };
        Ok(serde_json::to_vec(&reply).unwrap())
    }
}

pub(crate) const URL: &str = "https://api.devnet.solana.com/";

pub(crate) fn client(stub: StubTransport) -> (Arc<JsonRpcClient>, Arc<StubTransport>) {
    let stub = Arc::new(stub);
    (Arc::new(JsonRpcClient::new(URL, stub.clone())), stub)
}

pub(crate) fn ok(result: Value) -> Value {
    json!({ "result": result })
}

pub(crate) fn with_context(value: Value) -> Value {
    ok(json!({"context": {"slot": 1}, "value": value}))
}

pub(crate) fn encoded_account(owner: &str, data: &[u8]) -> Value {
    json!({
        "lamports": 2_039_280u64,
        "owner": owner,
        "data": [BASE64.encode(data), "base64"],
        "executable": false,
        "rentEpoch": 0
    })
}

pub(crate) fn fees(lamports_per_signature: u64) -> Value {
    with_context(json!({
        "blockhash": "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N",
        "feeCalculator": {"lamportsPerSignature": lamports_per_signature},
        "lastValidSlot": 100,
        "lastValidBlockHeight": 100
    }))
}

pub(crate) fn signature_info(signature: &str, block_time: i64) -> Value {
    json!({
        "signature": signature,
        "slot": 1,
        "err": null,
        "memo": null,
        "blockTime": block_time,
        "confirmationStatus": "finalized"
    })
}

pub(crate) fn parsed_transfer(
    signature: &str,
    source: &str,
    destination: &str,
    lamports: u64,
    failed: bool,
) -> Value {
    json!({
        "blockTime": 1_700_000_000,
        "slot": 1,
        "meta": {
            "err": if failed { json!({"InstructionError": [0, "Custom"]}) } else { Value::Null },
            "fee": 5000
        },
        "transaction": {
            "signatures": [signature],
            "message": {
                "recentBlockhash": "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N",
                "instructions": [{
                    "program": "system",
                    "programId": "11111111111111111111111111111111",
                    "parsed": {
                        "type": "transfer",
                        "info": {
                            "source": source,
                            "destination": destination,
                            "lamports": lamports
                        }
                    }
                }]
            }
        }
    })
}
