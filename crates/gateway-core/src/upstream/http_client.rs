use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, ORIGIN},
    Client, ClientBuilder,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;

use crate::upstream::UpstreamError;

/// Configuration for HTTP client concurrency and request shape.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Maximum number of concurrent HTTP requests allowed
    pub concurrent_limit: usize,
    /// Permit acquisition timeout in milliseconds under normal load
    pub permit_timeout_ms: u64,
    /// Permit acquisition timeout in milliseconds when permits are scarce
    pub permit_timeout_scarce_ms: u64,
    /// Number of available permits below which they are considered scarce
    pub scarce_permit_threshold: usize,
    /// `Origin` header sent with every request, if set
    pub origin: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            concurrent_limit: 1000,
            permit_timeout_ms: 500,
            permit_timeout_scarce_ms: 200,
            scarce_permit_threshold: 100,
            origin: None,
        }
    }
}

/// HTTP client with semaphore-based concurrency control.
///
/// Each call is a single POST attempt; failures are returned to the caller as-is.
pub struct HttpClient {
    client: Client,
    concurrent_limit: Arc<Semaphore>,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Creates a new HTTP client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Sanitizes network errors so node URLs and credentials never leak to clients or logs.
    fn sanitize_network_error(error: &reqwest::Error) -> String {
        if error.is_connect() {
            "connection refused or unreachable".to_string()
        } else if error.is_timeout() {
            "connection timed out".to_string()
        } else if error.is_request() {
            "request failed".to_string()
        } else if error.is_body() {
            "response body error".to_string()
        } else if error.is_decode() {
            "response decode error".to_string()
        } else if error.is_redirect() {
            "too many redirects".to_string()
        } else {
            "network error".to_string()
        }
    }

    /// Creates a new HTTP client with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the `Origin` value is not a valid header or the underlying
    /// reqwest client fails to build.
    pub fn with_config(config: HttpClientConfig) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(origin) = &config.origin {
            let value = HeaderValue::from_str(origin).map_err(|e| {
                UpstreamError::ConnectionFailed(format!("invalid origin header: {e}"))
            })?;
            headers.insert(ORIGIN, value);
        }

        let client = ClientBuilder::new()
            .default_headers(headers)
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(100)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(45))
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("rpc-gateway/", env!("CARGO_PKG_VERSION")))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                UpstreamError::ConnectionFailed(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self {
            client,
            concurrent_limit: Arc::new(Semaphore::new(config.concurrent_limit)),
            config,
        })
    }

    /// Sends one HTTP POST with semaphore-based concurrency control. Never retries.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::Timeout`] if permit acquisition or the request times out
    /// - [`UpstreamError::ConcurrencyLimit`] if the semaphore is closed
    /// - [`UpstreamError::HttpError`] for non-success HTTP status codes, carrying the full body
    /// - [`UpstreamError::ConnectionFailed`] for network-related failures
    pub async fn send_request(
        &self,
        url: &str,
        body: bytes::Bytes,
        timeout: Duration,
    ) -> Result<bytes::Bytes, UpstreamError> {
        let permit_timeout =
            if self.concurrent_limit.available_permits() < self.config.scarce_permit_threshold {
                Duration::from_millis(self.config.permit_timeout_scarce_ms)
            } else {
                Duration::from_millis(self.config.permit_timeout_ms)
            };

        // Held until the body is read; dropping it on any return path frees the slot.
        let _permit = tokio::time::timeout(
            permit_timeout,
            Arc::clone(&self.concurrent_limit).acquire_owned(),
        )
        .await
        .map_err(|_| {
            tracing::warn!(
                available_permits = self.concurrent_limit.available_permits(),
                "http client semaphore acquisition timeout"
            );
            UpstreamError::Timeout
        })?
        .map_err(|_| UpstreamError::ConcurrencyLimit("semaphore closed".to_string()))?;

        tracing::trace!(
            available_permits = self.concurrent_limit.available_permits(),
            "http request started"
        );

        let response =
            self.client.post(url).body(body).timeout(timeout).send().await.map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout
                } else {
                    UpstreamError::ConnectionFailed(Self::sanitize_network_error(&e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // Nodes often put a JSON-RPC error in a 4xx/5xx body; the caller decides what to
            // do with it.
            let body = response.text().await.unwrap_or_default();
            tracing::trace!(status = status.as_u16(), "http request failed");
            return Err(UpstreamError::HttpError(status.as_u16(), body));
        }

        let result = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::ConnectionFailed(Self::sanitize_network_error(&e))
            }
        });
        tracing::trace!(
            available_permits = self.concurrent_limit.available_permits(),
            "http request completed"
        );
        result
    }

    #[cfg(test)]
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.concurrent_limit.available_permits()
    }
}
