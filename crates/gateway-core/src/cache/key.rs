//! Deterministic cache keys for JSON-RPC calls.
//!
//! Keys are derived from `(chain id, method, params)` only. The request id never takes part,
//! and object keys inside params are sorted recursively so that field order in the client's
//! JSON does not split the cache.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Prefix that keeps response entries apart from classifier verdicts in a shared store.
pub const RESPONSE_KEY_PREFIX: &str = "rpc_";

/// Builds the response cache key for a call.
///
/// # Example
///
/// ```
/// use gateway_core::cache::cache_key;
/// use serde_json::json;
///
/// let a = cache_key(1, "eth_call", &[json!({"to": "0xab", "data": "0x01"}), json!("latest")]);
/// let b = cache_key(1, "eth_call", &[json!({"data": "0x01", "to": "0xab"}), json!("latest")]);
/// assert_eq!(a, b);
/// assert!(a.starts_with("rpc_"));
/// ```
#[must_use]
pub fn cache_key(chain_id: u64, method: &str, params: &[Value]) -> String {
    let mut canonical = String::with_capacity(128);
    for param in params {
        write_canonical(param, &mut canonical);
        canonical.push('\u{1f}');
    }

    let mut hasher = Sha256::new();
    hasher.update(chain_id.to_be_bytes());
    hasher.update([0u8]);
    hasher.update(method.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical.as_bytes());

    format!("{RESPONSE_KEY_PREFIX}{}", hex::encode(hasher.finalize()))
}

/// Serializes a value with object keys sorted at every depth.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
