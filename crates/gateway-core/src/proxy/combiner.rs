use crate::{
    cache::ResponseCache,
    types::{JsonRpcRequest, JsonRpcResponse, ProcessedRequest, RequestId},
};
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};
use tracing::debug;

/// Reassembles local, cached and upstream answers in the original call order.
pub struct ResponseCombiner {
    cache: Arc<ResponseCache>,
    background_writes: bool,
}

impl ResponseCombiner {
    #[must_use]
    pub fn new(cache: Arc<ResponseCache>, background_writes: bool) -> Self {
        Self { cache, background_writes }
    }

    /// Produces exactly one response per processed call, in order.
    ///
    /// Forwarded calls take the upstream response with the same id; when an id occurs more
    /// than once, upstream answers are consumed in the order they arrived. A forwarded call
    /// left without an answer gets a `-32603 Internal error`. Successful answers to cacheable
    /// calls are written back to the cache without delaying the reply.
    pub async fn combine(
        &self,
        chain_id: u64,
        processed: Vec<ProcessedRequest>,
        upstream: Vec<JsonRpcResponse>,
    ) -> Vec<JsonRpcResponse> {
        let mut by_id: HashMap<RequestId, VecDeque<JsonRpcResponse>> = HashMap::new();
        for response in upstream {
            if let Some(id) = response.id.clone() {
                by_id.entry(id).or_default().push_back(response);
            }
        }

        let mut writes: Vec<(JsonRpcRequest, JsonRpcResponse)> = Vec::new();
        let mut combined = Vec::with_capacity(processed.len());

        for item in processed {
            if let Some(response) = item.response {
                combined.push(response);
                continue;
            }

            match by_id.get_mut(&item.request.id).and_then(VecDeque::pop_front) {
                Some(response) => {
                    if item.should_cache && response.is_success() {
                        writes.push((item.request, response.clone()));
                    }
                    combined.push(response);
                }
                None => {
                    debug!(chain_id, request_id = %item.request.id, "no upstream answer");
                    combined.push(JsonRpcResponse::internal_error(item.request.id));
                }
            }
        }

        self.write_back(chain_id, writes).await;
        combined
    }

    async fn write_back(&self, chain_id: u64, writes: Vec<(JsonRpcRequest, JsonRpcResponse)>) {
        if writes.is_empty() {
            return;
        }

        let cache = Arc::clone(&self.cache);
        let task = async move {
            for (request, response) in &writes {
                cache.put(chain_id, request, response).await;
            }
        };

        if self.background_writes {
            tokio::spawn(task);
        } else {
            task.await;
        }
    }
}
