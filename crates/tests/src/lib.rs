//! Integration tests for the JSON-RPC gateway.
//!
//! - `gateway_tests`: pipeline behaviour (local answers, caching, ordering, single upstream
//!   call, synthesized internal errors, corrupted entry purging)
//! - `rate_limit_tests`: mark-and-forward limiting, protocol-contract exemption, trusted callers
//! - `http_surface_tests`: the axum application (status codes, error bodies, headers)
//! - `mock_infrastructure`: mockito-backed node and gateway fixtures
//!
//! ```bash
//! cargo test --package tests
//! ```

pub mod mock_infrastructure;

#[cfg(test)]
mod gateway_tests;

#[cfg(test)]
mod http_surface_tests;
