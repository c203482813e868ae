//! HTTP middleware for the gateway server.
//!
//! These adapters only deal with HTTP concerns (headers, extensions); all request semantics
//! live in `gateway_core`.

pub mod client_ip;
pub mod correlation_id;

pub use client_ip::{client_identity_middleware, resolve_identity, ClientIdentity};
pub use correlation_id::{create_request_id_layers, UuidRequestIdGenerator, X_REQUEST_ID};
