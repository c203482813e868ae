use crate::{
    cache::ResponseCache,
    metrics::{MetricsCollector, Resolution},
    network::NetworkEndpoint,
    rate_limit::{RateLimitContext, RateLimiter},
    types::{JsonRpcRequest, JsonRpcResponse, ProcessedRequest},
};
use std::sync::Arc;
use tracing::warn;

/// Facts about the inbound HTTP request shared by all of its calls.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub network: Arc<NetworkEndpoint>,
    /// Rate-limit key for the caller (see client identity extraction in the server).
    pub identity: String,
    /// Caller presented the trusted secret.
    pub trusted: bool,
}

impl RequestContext {
    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.network.chain_id
    }

    fn rate_limit_context(&self) -> RateLimitContext<'_> {
        RateLimitContext {
            identity: &self.identity,
            chain_id: self.network.chain_id,
            rpc_url: &self.network.rpc_url,
            trusted: self.trusted,
        }
    }
}

/// Decides how a single call is answered: locally, from cache, or upstream.
pub struct RequestProcessor {
    cache: Arc<ResponseCache>,
    rate_limiter: Arc<RateLimiter>,
    metrics: Arc<MetricsCollector>,
}

impl RequestProcessor {
    #[must_use]
    pub fn new(
        cache: Arc<ResponseCache>,
        rate_limiter: Arc<RateLimiter>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self { cache, rate_limiter, metrics }
    }

    /// `eth_chainId` is answered from the path's chain id without touching the limiter, the
    /// cache or the network. Every other call is rate-checked and looked up in the cache
    /// concurrently; a limited call is only marked, never dropped.
    pub async fn process(&self, request: JsonRpcRequest, ctx: &RequestContext) -> ProcessedRequest {
        let chain_id = ctx.chain_id();

        if request.is_chain_id_call() {
            self.metrics.record_call(chain_id, Resolution::Local);
            let response =
                JsonRpcResponse::success(format!("0x{chain_id:x}").into(), request.id.clone());
            return ProcessedRequest::local(request, response);
        }

        let limit_ctx = ctx.rate_limit_context();
        let (rate_limited, cached) = tokio::join!(
            self.rate_limiter.should_rate_limit(&limit_ctx, &request),
            self.cache.get(chain_id, &request)
        );

        if rate_limited {
            self.metrics.record_rate_limited(chain_id);
            warn!(
                client = %ctx.identity,
                chain_id,
                request_id = %request.id,
                method = %request.method,
                "rate limit exceeded, forwarding anyway"
            );
        }

        match cached {
            Some(response) => {
                self.metrics.record_call(chain_id, Resolution::Cache);
                ProcessedRequest::cached(request, response, rate_limited)
            }
            None => {
                self.metrics.record_call(chain_id, Resolution::Upstream);
                let should_cache = self.cache.is_cacheable(chain_id, &request);
                ProcessedRequest::forward(request, rate_limited, should_cache)
            }
        }
    }
}
