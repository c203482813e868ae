//! # Gateway Core
//!
//! Core library for a protocol-aware JSON-RPC gateway sitting in front of blockchain nodes.
//!
//! Clients address a network by numeric chain id; the gateway answers what it can locally or
//! from cache and sends everything else to that network's node in exactly one upstream call.
//!
//! - **[`network`]**: Chain id to node endpoint registry.
//! - **[`classifier`]**: On-chain contract classification with a long-lived verdict cache.
//! - **[`cache`]**: Key/value [`cache::CacheStore`] abstraction plus the JSON-RPC response cache.
//! - **[`rate_limit`]**: Dual-window limiter keyed by client identity with protocol-contract
//!   exemptions.
//! - **[`proxy`]**: Request processor, batch processor, upstream forwarder, response combiner
//!   and the [`proxy::GatewayEngine`] that ties them together.
//! - **[`upstream`]**: HTTP client with concurrency control.
//! - **[`metrics`]**: Prometheus metrics collection.
//!
//! ## Request Flow
//!
//! ```text
//!  body ──► RpcBody::parse ──► BatchProcessor ──┬─► RequestProcessor (per call, concurrent)
//!                                               │     ├─ eth_chainId: answered locally
//!                                               │     ├─ RateLimiter (mark only)
//!                                               │     └─ ResponseCache lookup
//!                                               ▼
//!                                   UpstreamForwarder (one call, or none)
//!                                               ▼
//!                                   ResponseCombiner ──► ordered reply + cache writes
//! ```

pub mod cache;
pub mod classifier;
pub mod config;
pub mod metrics;
pub mod network;
pub mod proxy;
pub mod rate_limit;
pub mod types;
pub mod upstream;
