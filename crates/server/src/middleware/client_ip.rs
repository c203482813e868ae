//! Client identity used as the rate-limit key.

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

const CF_CONNECTING_IP: &str = "cf-connecting-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";
const CF_RAY: &str = "cf-ray";

/// Identity of the caller, stored in request extensions by [`client_identity_middleware`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIdentity(pub Arc<str>);

impl ClientIdentity {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Resolves the caller identity. Never fails.
///
/// Order: `CF-Connecting-IP`, the first `X-Forwarded-For` entry, `unknown-ip-<CF-Ray>`, then
/// the TCP peer address. With none of these the caller is `unknown`.
#[must_use]
pub fn resolve_identity(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    if let Some(ip) = header_str(headers, CF_CONNECTING_IP) {
        return ip.to_string();
    }

    if let Some(first) = header_str(headers, X_FORWARDED_FOR)
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
    {
        return first.to_string();
    }

    if let Some(ray) = header_str(headers, CF_RAY) {
        return format!("unknown-ip-{ray}");
    }

    peer.map_or_else(|| "unknown".to_string(), |ip| ip.to_string())
}

/// Attaches a [`ClientIdentity`] to every request.
pub async fn client_identity_middleware(mut request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let identity = resolve_identity(request.headers(), peer);

    request.extensions_mut().insert(ClientIdentity(Arc::from(identity)));
    next.run(request).await
}
