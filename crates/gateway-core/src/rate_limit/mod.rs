//! Client rate limiting with protocol-contract exemptions.
//!
//! Two independent windows apply to every client identity (a short "standard" one and an
//! hourly one); tripping either marks the call as limited. Limiting is a marking signal only:
//! marked calls are still processed and forwarded.
//!
//! Calls addressed to a contract the [`ContractClassifier`] identifies as a protocol contract
//! are never counted.

pub mod sliding_window;

pub use sliding_window::SlidingWindowLimiter;

use crate::{
    classifier::{contract_address, ContractClassifier},
    metrics::MetricsCollector,
    types::{ContractType, JsonRpcRequest},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Result of one limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitOutcome {
    pub success: bool,
}

/// A single rate-limit window supplied by the host.
#[async_trait]
pub trait LimitPrimitive: Send + Sync {
    /// Counts one call for `identity` and reports whether it fits the window.
    async fn limit(&self, identity: &str) -> LimitOutcome;
}

/// Per-request facts the limiter needs.
#[derive(Debug, Clone)]
pub struct RateLimitContext<'a> {
    pub identity: &'a str,
    pub chain_id: u64,
    pub rpc_url: &'a str,
    /// Caller proved knowledge of the trusted secret.
    pub trusted: bool,
}

pub struct RateLimiter {
    standard: Arc<dyn LimitPrimitive>,
    hourly: Arc<dyn LimitPrimitive>,
    classifier: Arc<ContractClassifier>,
    enabled: bool,
    metrics: Arc<MetricsCollector>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(
        standard: Arc<dyn LimitPrimitive>,
        hourly: Arc<dyn LimitPrimitive>,
        classifier: Arc<ContractClassifier>,
        enabled: bool,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self { standard, hourly, classifier, enabled, metrics }
    }

    /// Decides whether `request` exceeds the caller's budget.
    ///
    /// Trusted callers and protocol-contract targets are never counted. A failed
    /// classification counts the call like any other.
    pub async fn should_rate_limit(
        &self,
        ctx: &RateLimitContext<'_>,
        request: &JsonRpcRequest,
    ) -> bool {
        if !self.enabled || ctx.trusted {
            return false;
        }

        if let Some(address) = contract_address(request) {
            let verdict = self.classifier.classify(&address, ctx.chain_id, ctx.rpc_url).await;
            if verdict == Some(ContractType::ProtocolContract) {
                self.metrics.record_exempted(ctx.chain_id);
                return false;
            }
        }

        let (standard, hourly) =
            tokio::join!(self.standard.limit(ctx.identity), self.hourly.limit(ctx.identity));

        !(standard.success && hourly.success)
    }
}
