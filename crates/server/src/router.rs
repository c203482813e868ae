use axum::{
    body::to_bytes,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{any, get},
    Extension, Json, Router,
};
use gateway_core::{
    config::AppConfig,
    metrics::MetricsCollector,
    proxy::{Caller, GatewayEngine, GatewayError},
    types::CacheStatus,
};
use std::{collections::HashMap, sync::Arc};
use subtle::ConstantTimeEq;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    compression::CompressionLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer,
};
use tracing::debug;

use crate::middleware::{client_identity_middleware, create_request_id_layers, ClientIdentity};

const X_CACHE_STATUS: &str = "x-cache-status";

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<GatewayEngine>,
    pub metrics: Arc<MetricsCollector>,
    /// Callers presenting this as `?secret=` skip rate limiting.
    pub trusted_secret: Option<Arc<str>>,
    pub max_body_bytes: usize,
}

impl AppState {
    #[must_use]
    pub fn new(
        engine: Arc<GatewayEngine>,
        metrics: Arc<MetricsCollector>,
        config: &AppConfig,
    ) -> Self {
        Self {
            engine,
            metrics,
            trusted_secret: config.rate_limit.trusted_secret.as_deref().map(Arc::from),
            max_body_bytes: config.server.max_body_bytes,
        }
    }

    /// True when the request's `secret` query parameter equals the configured secret.
    fn is_trusted(&self, request: &Request) -> bool {
        let Some(expected) = self.trusted_secret.as_deref() else {
            return false;
        };

        Query::<HashMap<String, String>>::try_from_uri(request.uri())
            .ok()
            .and_then(|Query(params)| params.get("secret").cloned())
            .is_some_and(|provided| bool::from(provided.as_bytes().ct_eq(expected.as_bytes())))
    }
}

/// Builds the application: operational endpoints, the `/{chain_id}` gateway route and the
/// server-wide layers.
pub fn create_app(state: AppState, config: &AppConfig) -> Router {
    let (set_request_id, propagate_request_id) = create_request_id_layers();

    Router::new()
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .route("/{chain_id}", any(handle_rpc))
        .fallback(handle_unrouted)
        .with_state(state)
        .layer(axum_middleware::from_fn(client_identity_middleware))
        .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests))
        .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(CompressionLayer::new())
        .layer(propagate_request_id)
        .layer(set_request_id)
}

/// Gateway entry point for `/{chain_id}` with any HTTP method.
pub async fn handle_rpc(
    State(state): State<AppState>,
    Path(chain_id): Path<String>,
    Extension(identity): Extension<ClientIdentity>,
    request: Request,
) -> Response {
    dispatch(&state, &chain_id, &identity, request).await
}

/// Paths that are not a single segment still get a gateway-style answer.
async fn handle_unrouted(
    State(state): State<AppState>,
    Extension(identity): Extension<ClientIdentity>,
    request: Request,
) -> Response {
    let segment = request.uri().path().trim_start_matches('/').to_string();
    dispatch(&state, &segment, &identity, request).await
}

async fn dispatch(
    state: &AppState,
    chain_segment: &str,
    identity: &ClientIdentity,
    request: Request,
) -> Response {
    let method = request.method().as_str().to_string();
    let caller =
        Caller { identity: identity.as_str().to_string(), trusted: state.is_trusted(&request) };

    let body = match to_bytes(request.into_body(), state.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => {
            debug!(error = %e, "failed to read request body");
            return message_response(StatusCode::BAD_REQUEST, "Failed to read request body");
        }
    };

    match state.engine.handle(&method, chain_segment, &body, caller).await {
        Ok(reply) => with_cache_status(
            (StatusCode::OK, Json(reply.reply.to_value())).into_response(),
            reply.cache_status,
        ),
        Err(e) => error_response(&e),
    }
}

fn error_response(error: &GatewayError) -> Response {
    let status = StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::BAD_REQUEST);
    with_cache_status((status, Json(error.to_body())).into_response(), CacheStatus::Miss)
}

fn message_response(status: StatusCode, message: &str) -> Response {
    with_cache_status(
        (status, Json(serde_json::json!({ "message": message }))).into_response(),
        CacheStatus::Miss,
    )
}

fn with_cache_status(mut response: Response, status: CacheStatus) -> Response {
    if let Ok(value) = HeaderValue::from_str(&status.to_string()) {
        response.headers_mut().insert(X_CACHE_STATUS, value);
    }
    response
}

pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let networks = state.engine.networks();
    let chains: Vec<_> = networks.endpoints().iter().map(|n| n.chain_id).collect();

    Json(serde_json::json!({
        "status": "healthy",
        "networks": networks.len(),
        "chain_ids": chains,
    }))
}

pub async fn handle_metrics(State(state): State<AppState>) -> Response {
    match state.metrics.get_prometheus_metrics() {
        Some(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
