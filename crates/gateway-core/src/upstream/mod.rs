//! Outbound HTTP to blockchain nodes.

pub mod errors;
pub mod http_client;

pub use errors::UpstreamError;
pub use http_client::{HttpClient, HttpClientConfig};
