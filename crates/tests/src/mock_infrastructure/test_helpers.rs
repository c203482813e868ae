//! Gateway fixtures shared by the integration tests.

use axum::Router;
use gateway_core::{
    cache::MemoryStore,
    config::{AppConfig, NameResolverConfig, NetworkConfig, WindowConfig},
    metrics::MetricsCollector,
    proxy::{Caller, GatewayEngine, GatewayReply},
    rate_limit::SlidingWindowLimiter,
};
use serde_json::{json, Value};
use server::router::{create_app, AppState};
use std::sync::Arc;

pub const CHAIN_ID: u64 = 1;

pub const LOCK_ADDRESS: &str = "0x1111111111111111111111111111111111111111";
pub const PLAIN_ADDRESS: &str = "0x2222222222222222222222222222222222222222";
pub const RESOLVER_ADDRESS: &str = "0x3333333333333333333333333333333333333333";

/// `addr(bytes32)` selector, one of the default resolver selectors.
pub const ADDR_SELECTOR: &str = "0x3b3b57de";

/// Gateway wired to one mock node, with direct access to its store.
pub struct TestGateway {
    pub engine: Arc<GatewayEngine>,
    pub store: Arc<MemoryStore>,
    pub config: AppConfig,
}

/// Configuration for chain [`CHAIN_ID`] served by `rpc_url`. Both rate-limit windows allow
/// `limit` calls and cache writes are inline so tests can observe them immediately.
///
/// Every `eth_call` is cacheable here so cache behaviour can be driven with arbitrary
/// calldata; [`resolver_gated_config`] restores the name-resolution gate.
#[must_use]
pub fn test_config(rpc_url: &str, limit: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.networks = vec![NetworkConfig {
        chain_id: CHAIN_ID,
        name: "mainnet".to_string(),
        rpc_url: rpc_url.to_string(),
    }];
    config.cache.background_writes = false;
    config.cache.name_resolution_only = false;
    config.upstream.timeout_seconds = 5;
    config.rate_limit.standard = WindowConfig { limit, period_seconds: 60 };
    config.rate_limit.hourly = WindowConfig { limit, period_seconds: 3600 };
    config
}

/// [`test_config`] with `eth_call` caching limited to reads of [`RESOLVER_ADDRESS`].
#[must_use]
pub fn resolver_gated_config(rpc_url: &str, limit: u32) -> AppConfig {
    let mut config = test_config(rpc_url, limit);
    config.cache.name_resolution_only = true;
    config.cache.name_resolvers = vec![NameResolverConfig {
        chain_id: CHAIN_ID,
        contracts: vec![RESOLVER_ADDRESS.to_string()],
    }];
    config
}

/// Builds a gateway around `config`.
///
/// # Panics
///
/// Panics if the upstream client cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn gateway_with(config: AppConfig) -> TestGateway {
    let store = Arc::new(MemoryStore::new(1000));
    let standard = Arc::new(SlidingWindowLimiter::new(
        config.rate_limit.standard.limit,
        config.rate_limit.standard.period(),
    ));
    let hourly = Arc::new(SlidingWindowLimiter::new(
        config.rate_limit.hourly.limit,
        config.rate_limit.hourly.period(),
    ));

    let engine = GatewayEngine::from_config(
        &config,
        store.clone(),
        standard,
        hourly,
        Arc::new(MetricsCollector::disabled()),
    )
    .expect("gateway engine");

    TestGateway { engine: Arc::new(engine), store, config }
}

#[must_use]
pub fn gateway(rpc_url: &str, limit: u32) -> TestGateway {
    gateway_with(test_config(rpc_url, limit))
}

impl TestGateway {
    /// Posts `body` to `/{CHAIN_ID}` as `client`.
    ///
    /// # Panics
    ///
    /// Panics if the gateway rejects the request.
    #[allow(clippy::expect_used)]
    pub async fn post_as(&self, client: &str, body: &Value) -> GatewayReply {
        self.engine
            .handle(
                "POST",
                &CHAIN_ID.to_string(),
                body.to_string().as_bytes(),
                Caller { identity: client.to_string(), trusted: false },
            )
            .await
            .expect("gateway reply")
    }

    pub async fn post(&self, body: &Value) -> GatewayReply {
        self.post_as("203.0.113.9", body).await
    }

    /// Axum application over the same engine.
    #[must_use]
    pub fn app(&self) -> Router {
        let state = AppState::new(
            self.engine.clone(),
            Arc::new(MetricsCollector::disabled()),
            &self.config,
        );
        create_app(state, &self.config)
    }
}

/// A JSON-RPC call object.
#[must_use]
pub fn call(id: u64, method: &str, params: &Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

/// An `eth_call` of `addr(bytes32)` on `to`.
#[must_use]
pub fn addr_lookup(id: u64, to: &str) -> Value {
    let data = format!("{ADDR_SELECTOR}{}", "ee".repeat(32));
    call(id, "eth_call", &json!([{"to": to, "data": data}, "latest"]))
}

/// An `eth_call` to `to` with fixed calldata.
#[must_use]
pub fn eth_call(id: u64, to: &str) -> Value {
    call(id, "eth_call", &json!([{"to": to, "data": "0xfeedface"}, "latest"]))
}
