use crate::{
    metrics::MetricsCollector,
    network::NetworkEndpoint,
    types::{JsonRpcRequest, JsonRpcResponse},
    upstream::{HttpClient, UpstreamError},
};
use serde_json::Value;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// Sends the calls that need the node in one HTTP request.
///
/// Failures never propagate: a transport error, timeout or unparseable reply yields an empty
/// list and the combiner answers every forwarded id with an internal error. A non-2xx reply
/// whose body holds JSON-RPC responses (rate-limit or quota errors, for instance) is relayed
/// as-is so callers see the node's own error.
pub struct UpstreamForwarder {
    client: Arc<HttpClient>,
    timeout: Duration,
    metrics: Arc<MetricsCollector>,
}

impl UpstreamForwarder {
    #[must_use]
    pub fn new(client: Arc<HttpClient>, timeout: Duration, metrics: Arc<MetricsCollector>) -> Self {
        Self { client, timeout, metrics }
    }

    /// Forwards `requests` to the network's node. A single call goes out as a plain object, two
    /// or more as a batch array; an empty list sends nothing.
    pub async fn forward(
        &self,
        network: &NetworkEndpoint,
        requests: &[JsonRpcRequest],
    ) -> Vec<JsonRpcResponse> {
        if requests.is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        let result = self.send(&network.rpc_url, requests).await;
        let latency = started.elapsed().as_secs_f64();

        match result {
            Ok(responses) => {
                self.metrics.record_upstream(network.chain_id, "success", latency);
                debug!(
                    chain_id = network.chain_id,
                    forwarded = requests.len(),
                    answered = responses.len(),
                    "upstream call completed"
                );
                responses
            }
            Err(UpstreamError::HttpError(status, body)) => {
                self.metrics.record_upstream(network.chain_id, "http_error", latency);
                let responses = parse_upstream_reply(body.as_bytes()).unwrap_or_default();
                warn!(
                    chain_id = network.chain_id,
                    network = %network.name,
                    forwarded = requests.len(),
                    status,
                    relayed = responses.len(),
                    "upstream returned an error status"
                );
                responses
            }
            Err(e) => {
                self.metrics.record_upstream(network.chain_id, e.as_metric_str(), latency);
                warn!(
                    chain_id = network.chain_id,
                    network = %network.name,
                    forwarded = requests.len(),
                    error = %e,
                    "upstream call failed"
                );
                Vec::new()
            }
        }
    }

    async fn send(
        &self,
        url: &str,
        requests: &[JsonRpcRequest],
    ) -> Result<Vec<JsonRpcResponse>, UpstreamError> {
        let body = match requests {
            [single] => serde_json::to_vec(single),
            many => serde_json::to_vec(many),
        }
        .map_err(|e| UpstreamError::InvalidResponse(format!("request encode failed: {e}")))?;

        let raw = self.client.send_request(url, bytes::Bytes::from(body), self.timeout).await?;
        parse_upstream_reply(&raw)
    }
}

/// Accepts an array of responses or a single response object. Array items that are not
/// valid responses are skipped so one bad entry cannot discard its siblings.
fn parse_upstream_reply(raw: &[u8]) -> Result<Vec<JsonRpcResponse>, UpstreamError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;

    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<JsonRpcResponse>(item) {
                Ok(response) => Some(response),
                Err(e) => {
                    debug!(error = %e, "skipping malformed upstream batch item");
                    None
                }
            })
            .collect()),
        item @ Value::Object(_) => serde_json::from_value::<JsonRpcResponse>(item)
            .map(|response| vec![response])
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string())),
        _ => Err(UpstreamError::InvalidResponse("unexpected reply shape".to_string())),
    }
}
