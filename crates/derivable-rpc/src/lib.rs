//! JSON-RPC 2.0 client for Solana-family nodes.
//!
//! The client is transport-agnostic: [`HttpTransport`] posts over HTTP with
//! `reqwest`, and tests plug in canned transports through [`RpcTransport`].

pub mod client;
pub mod error;
pub mod models;
pub mod request;
pub mod transport;

pub use client::JsonRpcClient;
pub use error::{ResponseError, ResponseErrorData, RpcError, RpcResult};
pub use models::{
    AccountInfo, AnyTransactionError, ErrorDetail, FeeInfo, LatestBlockhash, ParsedInfo,
    ParsedInstruction, SignatureInfo, SignatureStatus, SimulationResult, TokenAccount,
    TokenAccountBalance, TransactionInfo, TransactionMeta, DEFAULT_LAMPORTS_PER_SIGNATURE,
};
pub use request::{DataSlice, JsonRpcRequest, RequestConfiguration, TokenAccountFilter};
pub use transport::{HttpTransport, RpcTransport};
