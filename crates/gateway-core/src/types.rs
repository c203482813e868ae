//! Core type definitions for JSON-RPC bodies and per-call processing state.
//!
//! # Type Categories
//!
//! ## JSON-RPC Protocol Types
//! - [`JsonRpcRequest`], [`JsonRpcResponse`], [`JsonRpcError`]: Protocol conformance
//! - [`RequestId`]: Correlation identity of a call (integer or string)
//! - [`RpcBody`]: Single-vs-batch shape, resolved once at parse time
//!
//! ## Pipeline Types
//! - [`ProcessedRequest`]: Decision for one call (local, cached, forwarded)
//! - [`ContractType`]: On-chain classification used for rate-limit exemptions
//! - [`CacheStatus`]: Aggregate resolution reported in the `x-cache-status` header

use serde::{Deserialize, Deserializer, Serialize};
use std::{borrow::Cow, fmt};

/// JSON-RPC protocol version constant to avoid repeated allocations.
pub const JSONRPC_VERSION: &str = "2.0";

/// Pre-allocated `Cow` for JSON-RPC version - zero allocation for static usage.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

/// Error code reserved for "no upstream answer for this id".
pub const INTERNAL_ERROR_CODE: i32 = -32603;

/// Message paired with [`INTERNAL_ERROR_CODE`] in synthesized responses.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal error";

/// Identity of a JSON-RPC call used to correlate requests with responses.
///
/// Only integers and strings are accepted; fractional numbers, `null`, objects and
/// arrays fail to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// JSON-RPC 2.0 request structure.
///
/// `id` is the correlation identity; `method` and `params` only define semantics.
/// Missing `params` deserialize to an empty list.
///
/// # Example
///
/// ```
/// use gateway_core::types::JsonRpcRequest;
/// use serde_json::json;
///
/// let request = JsonRpcRequest::new("eth_chainId", vec![], 1);
///
/// assert_eq!(request.method, "eth_chainId");
/// assert_eq!(serde_json::to_value(&request).unwrap()["params"], json!([]));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub id: RequestId,
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with zero allocation for the version string.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        params: Vec<serde_json::Value>,
        id: impl Into<RequestId>,
    ) -> Self {
        Self { id: id.into(), jsonrpc: JSONRPC_VERSION_COW, method: method.into(), params }
    }

    /// Returns true when the call asks for the chain id, which is answered locally.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    #[must_use]
    pub fn is_chain_id_call(&self) -> bool {
        self.method.trim().eq_ignore_ascii_case("eth_chainId")
    }
}

/// JSON-RPC 2.0 error object.
///
/// Standard error codes follow the JSON-RPC 2.0 convention:
///
/// - `-32700`: Parse error (invalid JSON)
/// - `-32600`: Invalid request (malformed JSON-RPC)
/// - `-32601`: Method not found
/// - `-32602`: Invalid params
/// - `-32603`: Internal error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure.
///
/// Carries a `result` or an `error`, never both. A `null` result is preserved as
/// `Some(Value::Null)` so it survives a round trip through the gateway.
///
/// # Example
///
/// ```
/// use gateway_core::types::{JsonRpcResponse, RequestId};
/// use serde_json::json;
///
/// let response = JsonRpcResponse::success(json!("0x1"), RequestId::Number(1));
/// assert!(response.is_success());
///
/// let response = JsonRpcResponse::internal_error(RequestId::Number(2));
/// assert_eq!(response.error.unwrap().code, -32603);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub id: Option<RequestId>,
    pub jsonrpc: Cow<'static, str>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// Wraps any present value, including `null`, in `Some`. Absent fields fall back to
/// `#[serde(default)]`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl JsonRpcResponse {
    /// Creates a successful JSON-RPC response.
    #[must_use]
    pub fn success(result: serde_json::Value, id: RequestId) -> Self {
        Self { id: Some(id), jsonrpc: JSONRPC_VERSION_COW, result: Some(result), error: None }
    }

    /// Creates an error JSON-RPC response.
    #[must_use]
    pub fn error(code: i32, message: impl Into<String>, id: RequestId) -> Self {
        Self {
            id: Some(id),
            jsonrpc: JSONRPC_VERSION_COW,
            result: None,
            error: Some(JsonRpcError { code, message: message.into(), data: None }),
        }
    }

    /// Synthesized answer for a forwarded call the upstream never answered.
    #[must_use]
    pub fn internal_error(id: RequestId) -> Self {
        Self::error(INTERNAL_ERROR_CODE, INTERNAL_ERROR_MESSAGE, id)
    }

    /// True when the response carries a result and no error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.result.is_some()
    }
}

/// Body shape of an inbound request, resolved once at parse time.
///
/// All downstream logic works on a flat list of calls; [`RpcBody::into_calls`] and
/// [`RpcReply::from_shape`] bracket that with the original shape.
#[derive(Debug, Clone)]
pub enum RpcBody {
    Single(JsonRpcRequest),
    Batch(Vec<JsonRpcRequest>),
}

/// Whether the client sent one object or an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyShape {
    Single,
    Batch,
}

impl BodyShape {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Batch => "batch",
        }
    }
}

impl RpcBody {
    /// Parses a raw body into a single call or a batch.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError`] when the payload is not JSON, is neither an object nor an
    /// array, is an empty array, or contains an element that is not a JSON-RPC 2.0 call.
    pub fn parse(body: &[u8]) -> Result<Self, BodyError> {
        let payload: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| BodyError::InvalidJson(e.to_string()))?;

        match payload {
            serde_json::Value::Array(items) => {
                if items.is_empty() {
                    return Err(BodyError::EmptyBatch);
                }
                let calls = items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| parse_call(item).map_err(|e| e.at_index(index)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Batch(calls))
            }
            item @ serde_json::Value::Object(_) => parse_call(item).map(Self::Single),
            _ => Err(BodyError::UnexpectedShape),
        }
    }

    #[must_use]
    pub fn shape(&self) -> BodyShape {
        match self {
            Self::Single(_) => BodyShape::Single,
            Self::Batch(_) => BodyShape::Batch,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Batch(calls) => calls.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattens the body into an ordered list of calls (a singleton for `Single`).
    #[must_use]
    pub fn into_calls(self) -> (BodyShape, Vec<JsonRpcRequest>) {
        match self {
            Self::Single(call) => (BodyShape::Single, vec![call]),
            Self::Batch(calls) => (BodyShape::Batch, calls),
        }
    }
}

fn parse_call(item: serde_json::Value) -> Result<JsonRpcRequest, BodyError> {
    let request: JsonRpcRequest =
        serde_json::from_value(item).map_err(|e| BodyError::InvalidRequest(e.to_string()))?;

    if request.jsonrpc != JSONRPC_VERSION {
        return Err(BodyError::InvalidVersion(request.jsonrpc.into_owned()));
    }
    if request.method.trim().is_empty() {
        return Err(BodyError::InvalidRequest("empty method".to_string()));
    }

    Ok(request)
}

/// Reasons a request body is rejected before any call is processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BodyError {
    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("Body must be a JSON-RPC object or an array of objects")]
    UnexpectedShape,

    #[error("Empty batch request")]
    EmptyBatch,

    #[error("Invalid JSON-RPC request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported JSON-RPC version: {0}")]
    InvalidVersion(String),

    #[error("Invalid batch element at index {index}: {reason}")]
    InvalidBatchElement { index: usize, reason: String },
}

impl BodyError {
    fn at_index(self, index: usize) -> Self {
        Self::InvalidBatchElement { index, reason: self.to_string() }
    }
}

/// Reply mirroring the inbound body shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcReply {
    Single(JsonRpcResponse),
    Batch(Vec<JsonRpcResponse>),
}

impl RpcReply {
    /// Restores the original shape around an ordered list of responses.
    ///
    /// A single-shaped body always yields exactly one response, so extra entries are
    /// never produced; an empty list falls back to an empty batch.
    #[must_use]
    pub fn from_shape(shape: BodyShape, mut responses: Vec<JsonRpcResponse>) -> Self {
        match shape {
            BodyShape::Single if responses.len() == 1 => Self::Single(responses.remove(0)),
            _ => Self::Batch(responses),
        }
    }

    #[must_use]
    pub fn responses(&self) -> &[JsonRpcResponse] {
        match self {
            Self::Single(response) => std::slice::from_ref(response),
            Self::Batch(responses) => responses,
        }
    }

    /// Serializes the reply into its JSON wire form.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Single(response) => {
                serde_json::to_value(response).unwrap_or(serde_json::Value::Null)
            }
            Self::Batch(responses) => {
                serde_json::to_value(responses).unwrap_or(serde_json::Value::Array(Vec::new()))
            }
        }
    }
}

/// Processing decision for one call.
///
/// If `should_forward` is false at creation, `response` is already set (local answer or
/// cache hit). If true, `response` starts empty and is filled by the combiner.
#[derive(Debug, Clone)]
pub struct ProcessedRequest {
    pub request: JsonRpcRequest,
    pub response: Option<JsonRpcResponse>,
    pub should_forward: bool,
    pub rate_limited: bool,
    pub from_cache: bool,
    pub should_cache: bool,
}

impl ProcessedRequest {
    /// A call answered without upstream access.
    #[must_use]
    pub fn local(request: JsonRpcRequest, response: JsonRpcResponse) -> Self {
        Self {
            request,
            response: Some(response),
            should_forward: false,
            rate_limited: false,
            from_cache: false,
            should_cache: false,
        }
    }

    /// A call answered from the response cache.
    #[must_use]
    pub fn cached(request: JsonRpcRequest, response: JsonRpcResponse, rate_limited: bool) -> Self {
        Self {
            request,
            response: Some(response),
            should_forward: false,
            rate_limited,
            from_cache: true,
            should_cache: false,
        }
    }

    /// A call that must be sent upstream.
    #[must_use]
    pub fn forward(request: JsonRpcRequest, rate_limited: bool, should_cache: bool) -> Self {
        Self {
            request,
            response: None,
            should_forward: true,
            rate_limited,
            from_cache: false,
            should_cache,
        }
    }
}

/// Category of a contract, computed once per (address, chain id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    Unknown,
    ProtocolContract,
}

impl ContractType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::ProtocolContract => "protocol_contract",
        }
    }

    /// Parses the stored representation; unrecognised text yields `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unknown" => Some(Self::Unknown),
            "protocol_contract" => Some(Self::ProtocolContract),
            _ => None,
        }
    }
}

/// Describes how the calls of one inbound request were resolved.
///
/// # Example
///
/// ```
/// use gateway_core::types::CacheStatus;
///
/// assert_eq!(CacheStatus::Full.to_string(), "FULL");
/// assert_eq!(CacheStatus::Miss.to_string(), "MISS");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Every call was answered locally or from cache.
    Full,
    /// Some calls were answered locally or from cache, the rest upstream.
    Partial,
    /// Every call went upstream.
    Miss,
}

impl CacheStatus {
    /// Derives the aggregate status from per-call decisions.
    #[must_use]
    pub fn from_processed(processed: &[ProcessedRequest]) -> Self {
        let served = processed.iter().filter(|p| !p.should_forward).count();
        if served == 0 {
            Self::Miss
        } else if served == processed.len() {
            Self::Full
        } else {
            Self::Partial
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "FULL"),
            Self::Partial => write!(f, "PARTIAL"),
            Self::Miss => write!(f, "MISS"),
        }
    }
}
