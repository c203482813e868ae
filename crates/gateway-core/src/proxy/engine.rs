use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    cache::{CacheStore, NameResolverGate, ResponseCache},
    classifier::{ContractClassifier, RpcContractInspector},
    config::AppConfig,
    metrics::MetricsCollector,
    network::NetworkRegistry,
    rate_limit::{LimitPrimitive, RateLimiter},
    types::{CacheStatus, RpcBody, RpcReply},
    upstream::{HttpClient, HttpClientConfig, UpstreamError},
};

use super::{
    batch::BatchProcessor,
    combiner::ResponseCombiner,
    errors::GatewayError,
    forwarder::UpstreamForwarder,
    processor::{RequestContext, RequestProcessor},
};

/// Identity of the caller as established by the HTTP layer.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Rate-limit key.
    pub identity: String,
    /// Caller presented the trusted secret.
    pub trusted: bool,
}

/// Reply for one inbound HTTP request.
#[derive(Debug, Clone)]
pub struct GatewayReply {
    /// Same shape as the inbound body: an object for a single call, an array for a batch.
    pub reply: RpcReply,
    pub cache_status: CacheStatus,
    /// At least one call exceeded the caller's budget.
    pub rate_limited: bool,
}

/// Pre-built pipeline components, for callers that wire their own stores or clients.
pub struct EngineComponents {
    pub networks: NetworkRegistry,
    pub processor: Arc<RequestProcessor>,
    pub forwarder: UpstreamForwarder,
    pub combiner: ResponseCombiner,
    pub metrics: Arc<MetricsCollector>,
}

/// Entry point of the gateway pipeline.
///
/// Each inbound body results in at most one upstream HTTP call regardless of how many calls
/// it contains, and exactly one response per call, in input order.
pub struct GatewayEngine {
    networks: NetworkRegistry,
    batch: BatchProcessor,
    forwarder: UpstreamForwarder,
    combiner: ResponseCombiner,
    metrics: Arc<MetricsCollector>,
}

impl GatewayEngine {
    #[must_use]
    pub fn new(components: EngineComponents) -> Self {
        let EngineComponents { networks, processor, forwarder, combiner, metrics } = components;
        Self { networks, batch: BatchProcessor::new(processor), forwarder, combiner, metrics }
    }

    /// Builds the whole pipeline from configuration.
    ///
    /// Responses and contract verdicts share `store`. The rate-limit windows are passed in so
    /// the caller owns their cleanup tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream HTTP client cannot be built.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn CacheStore>,
        standard: Arc<dyn LimitPrimitive>,
        hourly: Arc<dyn LimitPrimitive>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, UpstreamError> {
        let client = Arc::new(HttpClient::with_config(HttpClientConfig {
            concurrent_limit: config.upstream.concurrent_limit,
            origin: config.upstream.origin.clone(),
            ..HttpClientConfig::default()
        })?);

        let mut cache = ResponseCache::new(
            Arc::clone(&store),
            config.cache.cacheable_methods.iter().cloned(),
            config.cache_ttl(),
            config.cache.enabled,
            Arc::clone(&metrics),
        );
        if config.cache.name_resolution_only {
            cache = cache.with_resolver_gate(NameResolverGate::new(
                &config.cache.name_resolvers,
                &config.cache.resolver_selectors,
            ));
        }
        let cache = Arc::new(cache);

        let inspector =
            Arc::new(RpcContractInspector::new(Arc::clone(&client), config.upstream_timeout()));
        let classifier = Arc::new(ContractClassifier::new(
            store,
            inspector,
            config.contract_type_ttl(),
            Arc::clone(&metrics),
        ));

        let rate_limiter = Arc::new(RateLimiter::new(
            standard,
            hourly,
            classifier,
            config.rate_limit.enabled,
            Arc::clone(&metrics),
        ));

        let networks = NetworkRegistry::new(&config.networks);
        info!(networks = networks.len(), "gateway pipeline initialized");

        Ok(Self::new(EngineComponents {
            networks,
            processor: Arc::new(RequestProcessor::new(
                Arc::clone(&cache),
                rate_limiter,
                Arc::clone(&metrics),
            )),
            forwarder: UpstreamForwarder::new(
                client,
                config.upstream_timeout(),
                Arc::clone(&metrics),
            ),
            combiner: ResponseCombiner::new(cache, config.cache.background_writes),
            metrics,
        }))
    }

    #[must_use]
    pub fn networks(&self) -> &NetworkRegistry {
        &self.networks
    }

    /// Handles one inbound HTTP request addressed to `/{chain_segment}`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::MethodNotSupported`] for any HTTP method other than `POST`
    /// - [`GatewayError::UnsupportedNetwork`] when `chain_segment` names no configured network
    /// - [`GatewayError::InvalidBody`] when the body is not a JSON-RPC request or batch
    pub async fn handle(
        &self,
        http_method: &str,
        chain_segment: &str,
        body: &[u8],
        caller: Caller,
    ) -> Result<GatewayReply, GatewayError> {
        if http_method != "POST" {
            return Err(GatewayError::MethodNotSupported(http_method.to_string()));
        }

        let network = self.networks.resolve(chain_segment)?;

        let parsed = RpcBody::parse(body).inspect_err(|e| {
            debug!(chain_id = network.chain_id, error = %e, "rejecting malformed body");
        })?;

        let (shape, calls) = parsed.into_calls();
        self.metrics.record_gateway_request(network.chain_id, shape.as_str());

        let chain_id = network.chain_id;
        let ctx = RequestContext { network, identity: caller.identity, trusted: caller.trusted };
        let outcome = self.batch.process(calls, &ctx).await;
        let cache_status = CacheStatus::from_processed(&outcome.processed);

        let upstream = if outcome.to_forward.is_empty() {
            Vec::new()
        } else {
            self.forwarder.forward(&ctx.network, &outcome.to_forward).await
        };

        let responses = self.combiner.combine(chain_id, outcome.processed, upstream).await;

        debug!(
            chain_id,
            shape = shape.as_str(),
            cache_status = %cache_status,
            forwarded = outcome.to_forward.len(),
            "request handled"
        );

        Ok(GatewayReply {
            reply: RpcReply::from_shape(shape, responses),
            cache_status,
            rate_limited: outcome.rate_limited,
        })
    }
}
