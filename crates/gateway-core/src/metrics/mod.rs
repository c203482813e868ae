//! Prometheus metrics for the gateway pipeline.
//!
//! Recording goes through the global `metrics` facade, so every call is a lock-free atomic
//! update. When metrics are disabled no recorder is installed and the macros are no-ops.
//!
//! Labels are limited to bounded sets (chain ids from configuration, fixed outcome names);
//! client-supplied method names are never used as labels.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// How a single call was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Local,
    Cache,
    Upstream,
}

impl Resolution {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cache => "cache",
            Self::Upstream => "upstream",
        }
    }
}

/// Cache operations worth counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Hit,
    Miss,
    Corrupt,
    Write,
    WriteError,
}

impl CacheOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Corrupt => "corrupt",
            Self::Write => "write",
            Self::WriteError => "write_error",
        }
    }
}

fn try_init_prometheus_recorder(
) -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().install_recorder()
}

fn init_prometheus_recorder() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| match try_init_prometheus_recorder() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "failed to install primary prometheus recorder, using detached fallback"
                );
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

pub struct MetricsCollector {
    prometheus_handle: Option<PrometheusHandle>,
}

impl MetricsCollector {
    /// Creates a collector backed by the process-wide Prometheus recorder.
    #[must_use]
    pub fn new() -> Self {
        Self { prometheus_handle: Some(init_prometheus_recorder()) }
    }

    /// Creates a collector that records nothing observable.
    #[must_use]
    pub fn disabled() -> Self {
        Self { prometheus_handle: None }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.prometheus_handle.is_some()
    }

    /// Record one inbound gateway request by body shape.
    pub fn record_gateway_request(&self, chain_id: u64, shape: &'static str) {
        counter!("gateway_requests_total", "chain_id" => chain_id.to_string(), "shape" => shape)
            .increment(1);
    }

    /// Record how one call was answered.
    pub fn record_call(&self, chain_id: u64, resolution: Resolution) {
        counter!(
            "gateway_calls_total",
            "chain_id" => chain_id.to_string(),
            "resolution" => resolution.as_str()
        )
        .increment(1);
    }

    pub fn record_rate_limited(&self, chain_id: u64) {
        counter!("gateway_rate_limited_total", "chain_id" => chain_id.to_string()).increment(1);
    }

    /// Record a call exempted from rate limiting because it targets a protocol contract.
    pub fn record_exempted(&self, chain_id: u64) {
        counter!("gateway_rate_limit_exempt_total", "chain_id" => chain_id.to_string())
            .increment(1);
    }

    /// Record one upstream round trip and its outcome (`success` or an error kind).
    pub fn record_upstream(&self, chain_id: u64, outcome: &'static str, latency_seconds: f64) {
        let chain = chain_id.to_string();
        counter!("gateway_upstream_requests_total", "chain_id" => chain.clone(), "outcome" => outcome)
            .increment(1);
        histogram!("gateway_upstream_duration_seconds", "chain_id" => chain).record(latency_seconds);
    }

    pub fn record_cache(&self, op: CacheOp) {
        counter!("gateway_cache_operations_total", "op" => op.as_str()).increment(1);
    }

    /// Record a classifier lookup (`cached`, `protocol_contract`, `unknown`, `failed`).
    pub fn record_classification(&self, outcome: &'static str) {
        counter!("gateway_classifier_lookups_total", "outcome" => outcome).increment(1);
    }

    /// Renders the Prometheus text exposition, or `None` when metrics are disabled.
    #[must_use]
    pub fn get_prometheus_metrics(&self) -> Option<String> {
        self.prometheus_handle.as_ref().map(PrometheusHandle::render)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::disabled()
    }
}
