//! Contract classification for rate-limit exemptions.
//!
//! A deployed contract's category never changes, so each `(chain id, address)` pair is
//! inspected on-chain at most once per verdict lifetime. Verdicts live in the same
//! [`CacheStore`] as responses, under `contract_type_<chainId>_<address>`.
//!
//! Concurrent misses on the same key share one inspection, so a batch of calls to an
//! unclassified contract queries the node once.
//!
//! Inspection failures are never cached and never surface: the caller simply gets `None`
//! and treats the call as not exempt.

pub mod address;
pub mod inspector;

pub use address::{contract_address, is_valid_address};
pub use inspector::{ContractInspector, RpcContractInspector};

use crate::{
    cache::{CacheStore, CacheStoreError},
    metrics::MetricsCollector,
    types::ContractType,
};
use dashmap::{mapref::entry::Entry, DashMap};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

type Inspection = Shared<BoxFuture<'static, Option<ContractType>>>;

/// Store key for a verdict.
#[must_use]
pub fn contract_type_key(chain_id: u64, address: &str) -> String {
    format!("contract_type_{chain_id}_{}", address.to_ascii_lowercase())
}

pub struct ContractClassifier {
    store: Arc<dyn CacheStore>,
    inspector: Arc<dyn ContractInspector>,
    ttl: Duration,
    metrics: Arc<MetricsCollector>,
    /// Inspections in progress, keyed like the stored verdicts.
    inflight: DashMap<String, Inspection>,
}

impl ContractClassifier {
    #[must_use]
    pub fn new(
        store: Arc<dyn CacheStore>,
        inspector: Arc<dyn ContractInspector>,
        ttl: Duration,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self { store, inspector, ttl, metrics, inflight: DashMap::new() }
    }

    /// Classifies `address` on `chain_id`, consulting the node at `rpc_url` on a miss.
    ///
    /// Returns `None` when no verdict could be reached (invalid address or failed inspection).
    pub async fn classify(
        &self,
        address: &str,
        chain_id: u64,
        rpc_url: &str,
    ) -> Option<ContractType> {
        if !is_valid_address(address) {
            return None;
        }

        let key = contract_type_key(chain_id, address);
        if let Some(cached) = self.lookup(&key).await {
            self.metrics.record_classification("cached");
            return Some(cached);
        }

        let inspection = match self.inflight.entry(key.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let inspection = self.inspection(key.clone(), address, chain_id, rpc_url);
                entry.insert(inspection.clone());
                inspection
            }
        };

        let verdict = inspection.await;
        self.inflight.remove_if(&key, |_, pending| pending.peek().is_some());
        verdict
    }

    /// Inspects the contract and stores a definitive verdict. The returned future is shared by every
    /// caller that misses on `key` while it runs.
    fn inspection(
        &self,
        key: String,
        address: &str,
        chain_id: u64,
        rpc_url: &str,
    ) -> Inspection {
        let store = Arc::clone(&self.store);
        let inspector = Arc::clone(&self.inspector);
        let metrics = Arc::clone(&self.metrics);
        let ttl = self.ttl;
        let address = address.to_string();
        let rpc_url = rpc_url.to_string();

        async move {
            // A previous inspection may have stored its verdict after our lookup missed.
            if let Ok(Some(stored)) = store.get(&key).await {
                if let Some(verdict) = ContractType::parse(&stored) {
                    return Some(verdict);
                }
            }

            match inspector.inspect(&rpc_url, &address).await {
                Ok(verdict) => {
                    metrics.record_classification(verdict.as_str());
                    debug!(
                        chain_id,
                        address = %address,
                        verdict = verdict.as_str(),
                        "contract classified"
                    );
                    if let Err(e) = store.put(&key, verdict.as_str().to_string(), ttl).await {
                        warn!(
                            chain_id,
                            address = %address,
                            error = %e,
                            "failed to store contract type"
                        );
                    }
                    Some(verdict)
                }
                Err(e) => {
                    metrics.record_classification("failed");
                    warn!(chain_id, address = %address, error = %e, "contract inspection failed");
                    None
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn lookup(&self, key: &str) -> Option<ContractType> {
        match self.store.get(key).await {
            Ok(Some(raw)) => {
                let parsed = ContractType::parse(&raw);
                if parsed.is_none() {
                    self.purge(key).await;
                }
                parsed
            }
            Ok(None) => None,
            Err(CacheStoreError::Corrupted(_)) => {
                self.purge(key).await;
                None
            }
            Err(e) => {
                warn!(key, error = %e, "contract type lookup failed");
                None
            }
        }
    }

    async fn purge(&self, key: &str) {
        warn!(key, "purging corrupted contract type entry");
        if let Err(e) = self.store.delete(key).await {
            warn!(key, error = %e, "failed to delete corrupted contract type entry");
        }
    }
}
