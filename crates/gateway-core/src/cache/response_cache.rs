use crate::{
    cache::{cache_key, CacheStore, CacheStoreError, NameResolverGate},
    metrics::{CacheOp, MetricsCollector},
    types::{JsonRpcRequest, JsonRpcResponse},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Persisted form of a cached response. The id is re-attached on every hit.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    result: serde_json::Value,
    stored_at: i64,
}

/// Read-through cache of successful JSON-RPC results for allow-listed methods.
///
/// Store failures never reach the caller: reads degrade to a miss and writes are dropped
/// with a warning. Entries that cannot be decoded are deleted on first sight.
///
/// With a [`NameResolverGate`] attached, `eth_call` is cacheable only for name-resolution
/// reads; without one every allow-listed `eth_call` is.
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    cacheable_methods: HashSet<String>,
    resolver_gate: Option<NameResolverGate>,
    ttl: Duration,
    enabled: bool,
    metrics: Arc<MetricsCollector>,
}

impl ResponseCache {
    #[must_use]
    pub fn new(
        store: Arc<dyn CacheStore>,
        cacheable_methods: impl IntoIterator<Item = String>,
        ttl: Duration,
        enabled: bool,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store,
            cacheable_methods: cacheable_methods.into_iter().collect(),
            resolver_gate: None,
            ttl,
            enabled,
            metrics,
        }
    }

    #[must_use]
    pub fn with_resolver_gate(mut self, gate: NameResolverGate) -> Self {
        self.resolver_gate = Some(gate);
        self
    }

    /// True when the answer to `request` on `chain_id` may be served from and written to the
    /// cache.
    #[must_use]
    pub fn is_cacheable(&self, chain_id: u64, request: &JsonRpcRequest) -> bool {
        if !self.enabled || !self.cacheable_methods.contains(&request.method) {
            return false;
        }
        match &self.resolver_gate {
            Some(gate) if request.method == "eth_call" => gate.allows(chain_id, request),
            _ => true,
        }
    }

    /// Looks up a call, returning a response carrying the caller's own id on a hit.
    pub async fn get(&self, chain_id: u64, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        if !self.is_cacheable(chain_id, request) {
            return None;
        }

        let key = cache_key(chain_id, &request.method, &request.params);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.metrics.record_cache(CacheOp::Miss);
                return None;
            }
            Err(CacheStoreError::Corrupted(reason)) => {
                self.purge(&key, &reason).await;
                return None;
            }
            Err(e) => {
                warn!(chain_id, method = %request.method, error = %e, "cache read failed");
                self.metrics.record_cache(CacheOp::Miss);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if !entry.result.is_null() => {
                self.metrics.record_cache(CacheOp::Hit);
                debug!(chain_id, method = %request.method, "cache hit");
                Some(JsonRpcResponse::success(entry.result, request.id.clone()))
            }
            Ok(_) => {
                self.purge(&key, "null result").await;
                None
            }
            Err(e) => {
                self.purge(&key, &e.to_string()).await;
                None
            }
        }
    }

    /// Stores a successful, non-null result for a cacheable call.
    ///
    /// Returns whether an entry was written. Errors, missing results and `null` results are
    /// skipped; store failures are logged and reported as not written.
    pub async fn put(
        &self,
        chain_id: u64,
        request: &JsonRpcRequest,
        response: &JsonRpcResponse,
    ) -> bool {
        if !self.is_cacheable(chain_id, request) || response.error.is_some() {
            return false;
        }
        let Some(result) = response.result.as_ref().filter(|r| !r.is_null()) else {
            return false;
        };

        let entry = CacheEntry { result: result.clone(), stored_at: chrono::Utc::now().timestamp() };
        let encoded = match serde_json::to_string(&entry) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(chain_id, method = %request.method, error = %e, "cache entry encode failed");
                return false;
            }
        };

        let key = cache_key(chain_id, &request.method, &request.params);
        match self.store.put(&key, encoded, self.ttl).await {
            Ok(()) => {
                self.metrics.record_cache(CacheOp::Write);
                true
            }
            Err(e) => {
                self.metrics.record_cache(CacheOp::WriteError);
                warn!(chain_id, method = %request.method, error = %e, "cache write failed");
                false
            }
        }
    }

    async fn purge(&self, key: &str, reason: &str) {
        self.metrics.record_cache(CacheOp::Corrupt);
        warn!(key, reason, "purging corrupted cache entry");
        if let Err(e) = self.store.delete(key).await {
            warn!(key, error = %e, "failed to delete corrupted cache entry");
        }
    }
}
