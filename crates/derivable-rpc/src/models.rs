//! Typed views of node responses.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Used when a node reports no fee calculator.
pub const DEFAULT_LAMPORTS_PER_SIGNATURE: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcContext {
    pub slot: u64,
}

/// `{ context, value }` wrapper most account-level methods reply with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WithContext<T> {
    pub context: RpcContext,
    pub value: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeCalculatorInfo {
    pub lamports_per_signature: u64,
}

/// `getFees` / `getRecentBlockhash` value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeInfo {
    #[serde(default)]
    pub fee_calculator: Option<FeeCalculatorInfo>,
    #[serde(default)]
    pub blockhash: Option<String>,
    #[serde(default)]
    pub last_valid_slot: Option<u64>,
    #[serde(default)]
    pub last_valid_block_height: Option<u64>,
}

impl FeeInfo {
    pub fn lamports_per_signature(&self) -> u64 {
        self.fee_calculator
            .map(|c| c.lamports_per_signature)
            .unwrap_or(DEFAULT_LAMPORTS_PER_SIGNATURE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

/// Account state with its data already Base64-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: String,
    pub data: Vec<u8>,
    pub executable: bool,
    pub rent_epoch: u64,
}

/// Account as it arrives with `encoding: "base64"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EncodedAccount {
    pub lamports: u64,
    pub owner: String,
    pub data: (String, String),
    #[serde(default)]
    pub executable: bool,
    #[serde(default)]
    pub rent_epoch: u64,
}

impl EncodedAccount {
    pub(crate) fn decode(self) -> Option<AccountInfo> {
        let (payload, encoding) = self.data;
        if encoding != "base64" {
            return None;
        }
        let data = BASE64.decode(payload).ok()?;
        Some(AccountInfo {
            lamports: self.lamports,
            owner: self.owner,
            data,
            executable: self.executable,
            rent_epoch: self.rent_epoch,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccount {
    pub pubkey: String,
    pub account: AccountInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EncodedTokenAccount {
    pub pubkey: String,
    pub account: EncodedAccount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountBalance {
    pub amount: String,
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(default)]
    pub ui_amount: Option<f64>,
    #[serde(default)]
    pub ui_amount_string: Option<String>,
}

impl TokenAccountBalance {
    pub fn raw_amount(&self) -> Option<u64> {
        self.amount.parse().ok()
    }
}

/// One element of an instruction error tuple, e.g. `0` or `{"Custom": 1}`.
///
/// Shapes outside these decode to an empty `String`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "RawErrorDetail")]
pub enum ErrorDetail {
    Bool(bool),
    Number(f64),
    String(String),
    Map(BTreeMap<String, i64>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawErrorDetail {
    Bool(bool),
    Number(f64),
    String(String),
    Map(BTreeMap<String, i64>),
    Unknown(IgnoredAny),
}

impl From<RawErrorDetail> for ErrorDetail {
    fn from(raw: RawErrorDetail) -> Self {
        match raw {
            RawErrorDetail::Bool(b) => Self::Bool(b),
            RawErrorDetail::Number(n) => Self::Number(n),
            RawErrorDetail::String(s) => Self::String(s),
            RawErrorDetail::Map(m) => Self::Map(m),
            RawErrorDetail::Unknown(_) => Self::String(String::new()),
        }
    }
}

/// Transaction error as nodes report it: a bare name such as
/// `"BlockhashNotFound"` or an object like `{"InstructionError": [0, {"Custom": 1}]}`.
/// Objects whose payload is not a detail list keep only their name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "RawTransactionError")]
pub enum AnyTransactionError {
    String(String),
    Detailed(BTreeMap<String, Vec<ErrorDetail>>),
    Named(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTransactionError {
    String(String),
    Detailed(BTreeMap<String, Vec<ErrorDetail>>),
    Named(BTreeMap<String, IgnoredAny>),
    Unknown(IgnoredAny),
}

impl From<RawTransactionError> for AnyTransactionError {
    fn from(raw: RawTransactionError) -> Self {
        match raw {
            RawTransactionError::String(s) => Self::String(s),
            RawTransactionError::Detailed(map) => Self::Detailed(map),
            RawTransactionError::Named(map) => {
                Self::Named(map.into_keys().next().unwrap_or_default())
            }
            RawTransactionError::Unknown(_) => Self::Named(String::new()),
        }
    }
}

impl AnyTransactionError {
    /// Bare error name, for errors that carry no instruction details.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Named(s) => Some(s),
            Self::Detailed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub slot: Option<u64>,
    #[serde(default)]
    pub err: Option<AnyTransactionError>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    #[serde(default)]
    pub confirmations: Option<u64>,
    #[serde(default)]
    pub err: Option<AnyTransactionError>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    #[serde(default)]
    pub err: Option<AnyTransactionError>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub units_consumed: Option<u64>,
}

/// `getTransaction` with `jsonParsed` encoding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub slot: Option<u64>,
    #[serde(default)]
    pub meta: Option<TransactionMeta>,
    pub transaction: ParsedTransaction,
}

impl TransactionInfo {
    /// `info` of the first parsed instruction, which is where transfers live.
    pub fn first_parsed_info(&self) -> Option<&ParsedInfo> {
        self.transaction
            .message
            .instructions
            .first()
            .and_then(|ix| ix.parsed.as_ref())
            .map(|p| &p.info)
    }

    pub fn is_failed(&self) -> bool {
        self.meta.as_ref().is_some_and(|m| m.err.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    #[serde(default)]
    pub err: Option<AnyTransactionError>,
    #[serde(default)]
    pub fee: Option<u64>,
    #[serde(default)]
    pub log_messages: Option<Vec<String>>,
    #[serde(default)]
    pub pre_balances: Option<Vec<u64>>,
    #[serde(default)]
    pub post_balances: Option<Vec<u64>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTransaction {
    pub signatures: Vec<String>,
    pub message: ParsedMessage,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMessage {
    #[serde(default)]
    pub recent_blockhash: Option<String>,
    pub instructions: Vec<ParsedInstruction>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInstruction {
    #[serde(default)]
    pub program: Option<String>,
    pub program_id: String,
    #[serde(default, deserialize_with = "lenient_parsed")]
    pub parsed: Option<ParsedBody>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParsedBody {
    pub info: ParsedInfo,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Fields of a parsed system or token instruction the kit reads.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInfo {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub lamports: Option<u64>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub token_amount: Option<TokenAccountBalance>,
    #[serde(default)]
    pub mint: Option<String>,
    #[serde(default)]
    pub authority: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

impl ParsedInfo {
    /// Lamports for native transfers, raw token units otherwise.
    pub fn value(&self) -> u64 {
        self.lamports
            .or_else(|| self.amount.as_deref().and_then(|a| a.parse().ok()))
            .or_else(|| self.token_amount.as_ref().and_then(|t| t.raw_amount()))
            .unwrap_or(0)
    }
}

/// Programs the node can't parse return a string or an unexpected shape
/// under `parsed`; treat those as absent.
fn lenient_parsed<'de, D>(deserializer: D) -> Result<Option<ParsedBody>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}
