use crate::{
    proxy::processor::{RequestContext, RequestProcessor},
    types::{JsonRpcRequest, ProcessedRequest},
};
use futures::future::join_all;
use std::sync::Arc;

/// Aggregate decision for every call of one inbound request.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Same order as the input.
    pub processed: Vec<ProcessedRequest>,
    /// Calls needing the upstream, in input order. Identical calls are not merged.
    pub to_forward: Vec<JsonRpcRequest>,
    /// True when any call was marked rate limited.
    pub rate_limited: bool,
}

/// Runs the [`RequestProcessor`] over all calls concurrently.
pub struct BatchProcessor {
    processor: Arc<RequestProcessor>,
}

impl BatchProcessor {
    #[must_use]
    pub fn new(processor: Arc<RequestProcessor>) -> Self {
        Self { processor }
    }

    pub async fn process(&self, requests: Vec<JsonRpcRequest>, ctx: &RequestContext) -> BatchOutcome {
        let processed =
            join_all(requests.into_iter().map(|request| self.processor.process(request, ctx)))
                .await;

        let to_forward = processed
            .iter()
            .filter(|p| p.should_forward)
            .map(|p| p.request.clone())
            .collect();
        let rate_limited = processed.iter().any(|p| p.rate_limited);

        BatchOutcome { processed, to_forward, rate_limited }
    }
}
