//! HTTP surface of the gateway.
//!
//! [`router::create_app`] builds the axum application around a
//! [`gateway_core::proxy::GatewayEngine`]; the `server` binary adds configuration loading,
//! logging and graceful shutdown.

pub mod middleware;
pub mod router;
