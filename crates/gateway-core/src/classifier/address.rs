//! Target contract extraction from JSON-RPC calls.

use crate::types::JsonRpcRequest;
use serde_json::Value;

/// Returns true for a `0x`-prefixed, 40 hex digit address (any case).
#[must_use]
pub fn is_valid_address(candidate: &str) -> bool {
    candidate.len() == 42 &&
        (candidate.starts_with("0x") || candidate.starts_with("0X")) &&
        candidate[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// Derives the contract a call addresses, lowercased.
///
/// Only methods with a well-defined single target are considered; a missing, non-string or
/// malformed address yields `None`.
///
/// # Example
///
/// ```
/// use gateway_core::{classifier::contract_address, types::JsonRpcRequest};
/// use serde_json::json;
///
/// let to = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01";
/// let call = JsonRpcRequest::new("eth_call", vec![json!({"to": to}), json!("latest")], 1);
///
/// assert_eq!(contract_address(&call), Some(to.to_lowercase()));
/// ```
#[must_use]
pub fn contract_address(request: &JsonRpcRequest) -> Option<String> {
    let first = request.params.first()?;

    let candidate = match request.method.as_str() {
        "eth_call" | "eth_estimateGas" | "eth_sendTransaction" => first.get("to")?.as_str()?,
        "eth_getLogs" | "eth_getFilterLogs" => match first.get("address")? {
            Value::String(address) => address.as_str(),
            _ => return None,
        },
        "eth_getCode" | "eth_getBalance" | "eth_getTransactionCount" | "eth_getStorageAt" => {
            first.as_str()?
        }
        _ => return None,
    };

    is_valid_address(candidate).then(|| candidate.to_ascii_lowercase())
}
