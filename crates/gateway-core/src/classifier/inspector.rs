use crate::{
    types::{ContractType, JsonRpcRequest, JsonRpcResponse, RequestId},
    upstream::{HttpClient, UpstreamError},
};
use async_trait::async_trait;
use serde_json::json;
use std::{sync::Arc, time::Duration};

/// `publicLockVersion()` selector.
pub const PUBLIC_LOCK_VERSION_SELECTOR: &str = "0xd1bbd49c";

/// `unlockVersion()` selector.
pub const UNLOCK_VERSION_SELECTOR: &str = "0x4220bd46";

const VERSION_CALLS: [(i64, &str); 2] = [(1, PUBLIC_LOCK_VERSION_SELECTOR), (2, UNLOCK_VERSION_SELECTOR)];

/// On-chain read access used to classify a contract.
///
/// `Err` means the verdict is unknown (transport or decoding failure) and must not be
/// remembered; `Ok(ContractType::Unknown)` is a definitive answer.
#[async_trait]
pub trait ContractInspector: Send + Sync {
    async fn inspect(&self, rpc_url: &str, address: &str) -> Result<ContractType, UpstreamError>;
}

/// Classifies by probing the protocol's version getters with `eth_call`.
pub struct RpcContractInspector {
    client: Arc<HttpClient>,
    timeout: Duration,
}

impl RpcContractInspector {
    #[must_use]
    pub fn new(client: Arc<HttpClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn version_calls_body(address: &str) -> Result<bytes::Bytes, UpstreamError> {
        let calls: Vec<JsonRpcRequest> = VERSION_CALLS
            .iter()
            .map(|(id, selector)| {
                JsonRpcRequest::new(
                    "eth_call",
                    vec![json!({ "to": address, "data": selector }), json!("latest")],
                    *id,
                )
            })
            .collect();

        serde_json::to_vec(&calls)
            .map(bytes::Bytes::from)
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))
    }
}

/// A version call answered with a non-zero 32-byte word.
fn is_version_word(response: &JsonRpcResponse) -> bool {
    if response.error.is_some() {
        return false;
    }
    let Some(hex) =
        response.result.as_ref().and_then(|r| r.as_str()).and_then(|s| s.strip_prefix("0x"))
    else {
        return false;
    };

    hex.len() >= 64 &&
        hex.bytes().all(|b| b.is_ascii_hexdigit()) &&
        hex[..64].bytes().any(|b| b != b'0')
}

/// Interprets the version replies. Every call must be answered for a definitive verdict.
pub(crate) fn verdict(responses: &[JsonRpcResponse]) -> Result<ContractType, UpstreamError> {
    let mut protocol = false;
    for (id, _) in VERSION_CALLS {
        let response = responses
            .iter()
            .find(|r| r.id == Some(RequestId::Number(id)))
            .ok_or_else(|| {
                UpstreamError::InvalidResponse(format!("version call {id} unanswered"))
            })?;
        protocol |= is_version_word(response);
    }

    Ok(if protocol { ContractType::ProtocolContract } else { ContractType::Unknown })
}

#[async_trait]
impl ContractInspector for RpcContractInspector {
    async fn inspect(&self, rpc_url: &str, address: &str) -> Result<ContractType, UpstreamError> {
        let body = Self::version_calls_body(address)?;
        let raw = self.client.send_request(rpc_url, body, self.timeout).await?;

        let responses: Vec<JsonRpcResponse> = serde_json::from_slice(&raw)
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;

        verdict(&responses)
    }
}
