//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `GATEWAY_CONFIG` env var
//! 3. **Environment variables**: `GATEWAY__*` env vars override specific fields
//!
//! # Configuration Sections
//!
//! - [`ServerConfig`]: HTTP server settings (bind address, concurrency, body limit)
//! - [`NetworkConfig`]: Supported networks and their node endpoints
//! - [`UpstreamConfig`]: Outbound HTTP behaviour towards nodes
//! - [`CacheConfig`]: Response cache sizing, TTL, method allow-list and the name-resolver gate
//! - [`RateLimitConfig`]: Standard and hourly windows, trusted secret
//! - [`ClassifierConfig`]: Contract classification verdict lifetime
//! - [`MetricsConfig`]: Prometheus metrics endpoint
//! - [`LoggingConfig`]: Log level and format
//!
//! # Example
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! bind_port = 8787
//!
//! [[networks]]
//! chain_id = 1
//! name = "mainnet"
//! rpc_url = "https://eth-mainnet.example.com"
//!
//! [rate_limit.standard]
//! limit = 10
//! period_seconds = 10
//! ```

use crate::classifier::is_valid_address;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path, time::Duration};

/// Methods never allowed in the cacheable list: they mutate state or depend on the chain head.
pub const NON_CACHEABLE_METHODS: &[&str] = &[
    "eth_sendRawTransaction",
    "eth_sendTransaction",
    "eth_sign",
    "eth_signTransaction",
    "eth_blockNumber",
    "eth_gasPrice",
    "eth_maxPriorityFeePerGas",
    "eth_feeHistory",
    "eth_getFilterChanges",
    "eth_newFilter",
    "eth_newBlockFilter",
    "eth_uninstallFilter",
    "eth_syncing",
];

/// HTTP server configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// IP address to bind the server to. Defaults to `127.0.0.1`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port number to listen on. Must be greater than 0. Defaults to `8787`.
    pub bind_port: u16,

    /// Maximum number of concurrent inbound requests. Defaults to `1000`.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Request timeout in seconds. Must exceed twice the upstream timeout. Defaults to `30`.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Largest accepted request body. Defaults to 1 MiB.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_max_concurrent_requests() -> usize {
    1000
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// A network the gateway serves, addressed by its numeric chain id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// EVM chain id (e.g., `1` for mainnet, `8453` for Base).
    pub chain_id: u64,

    /// Human-readable name used in logs and the health endpoint.
    pub name: String,

    /// Node endpoint all forwarded calls for this network go to. Must be `http` or `https`.
    pub rpc_url: String,
}

/// Outbound HTTP behaviour towards nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Per-request timeout in seconds. Defaults to `10`.
    #[serde(default = "default_upstream_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Maximum in-flight upstream requests across all networks. Defaults to `1000`.
    #[serde(default = "default_concurrent_limit")]
    pub concurrent_limit: usize,

    /// Value for the `Origin` header on forwarded requests, if any.
    #[serde(default)]
    pub origin: Option<String>,
}

fn default_upstream_timeout_seconds() -> u64 {
    10
}

fn default_concurrent_limit() -> usize {
    1000
}

/// JSON-RPC response cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether response caching is enabled. Defaults to `true`.
    pub enabled: bool,

    /// Lifetime of a cached response in seconds. Must be greater than 0. Defaults to `300`.
    pub ttl_seconds: u64,

    /// Upper bound on entries held by the in-memory store. Defaults to `100_000`.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,

    /// Methods whose responses may be cached.
    #[serde(default = "default_cacheable_methods")]
    pub cacheable_methods: Vec<String>,

    /// Write cache entries on a detached task instead of inline. Defaults to `true`.
    #[serde(default = "default_background_writes")]
    pub background_writes: bool,

    /// Only cache `eth_call` when it reads a known name resolver. An arbitrary `eth_call`
    /// answer depends on contract state and goes stale. Defaults to `true`.
    #[serde(default = "default_name_resolution_only")]
    pub name_resolution_only: bool,

    /// Name-resolution contracts per chain. Chains without an entry never cache `eth_call`
    /// while [`Self::name_resolution_only`] is set.
    #[serde(default = "default_name_resolvers")]
    pub name_resolvers: Vec<NameResolverConfig>,

    /// 4-byte selectors (`0x` + 8 hex digits) of the resolver read methods whose answers may
    /// be cached.
    #[serde(default = "default_resolver_selectors")]
    pub resolver_selectors: Vec<String>,
}

/// Name-resolution contracts deployed on one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameResolverConfig {
    pub chain_id: u64,

    /// Contract addresses, `0x` + 40 hex digits.
    pub contracts: Vec<String>,
}

fn default_max_entries() -> u64 {
    100_000
}

fn default_cacheable_methods() -> Vec<String> {
    [
        "eth_call",
        "eth_getCode",
        "eth_getTransactionByHash",
        "eth_getTransactionReceipt",
        "eth_getBlockByHash",
        "net_version",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn default_background_writes() -> bool {
    true
}

fn default_name_resolution_only() -> bool {
    true
}

fn default_name_resolvers() -> Vec<NameResolverConfig> {
    let chain = |chain_id, contracts: &[&str]| NameResolverConfig {
        chain_id,
        contracts: contracts.iter().map(ToString::to_string).collect(),
    };
    vec![
        // ENS registry, public resolver and universal resolver.
        chain(
            1,
            &[
                "0x00000000000c2e074ec69a0dfb2997ba6c7d2e1e",
                "0x231b0ee14048e9dccd1d247744d114a4eb5e8e63",
                "0xce01f8eee7e479c928f8919abd53e553a36cef67",
            ],
        ),
        // Basenames registry and L2 resolver.
        chain(
            8453,
            &[
                "0xb94704422c2a1e396835a571837aa5ae53285a95",
                "0xc6d566a56a1aff6508b41f6c90ff131615583bcd",
            ],
        ),
    ]
}

fn default_resolver_selectors() -> Vec<String> {
    [
        "0x0178b8bf", // resolver(bytes32)
        "0x3b3b57de", // addr(bytes32)
        "0xf1cb7e06", // addr(bytes32,uint256)
        "0x691f3431", // name(bytes32)
        "0x59d1d43c", // text(bytes32,string)
        "0xbc1c58d1", // contenthash(bytes32)
        "0x9061b923", // resolve(bytes,bytes)
        "0xec11c823", // reverse(bytes)
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn is_valid_selector(candidate: &str) -> bool {
    candidate.len() == 10
        && candidate.starts_with("0x")
        && candidate[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// One fixed-budget sliding window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Calls allowed per period.
    pub limit: u32,

    /// Window length in seconds.
    pub period_seconds: u64,
}

impl WindowConfig {
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_seconds)
    }
}

/// Rate limiting configuration.
///
/// Limits only mark calls; marked calls are still forwarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether rate limiting is evaluated at all. Defaults to `true`.
    pub enabled: bool,

    /// Short window. Defaults to 10 calls per 10 seconds.
    #[serde(default = "default_standard_window")]
    pub standard: WindowConfig,

    /// Long window. Defaults to 1000 calls per hour.
    #[serde(default = "default_hourly_window")]
    pub hourly: WindowConfig,

    /// Maximum distinct client identities tracked per window. Defaults to `100_000`.
    #[serde(default = "default_max_tracked_clients")]
    pub max_tracked_clients: usize,

    /// Callers presenting this value as `?secret=` bypass the limiter.
    #[serde(default)]
    pub trusted_secret: Option<String>,
}

fn default_standard_window() -> WindowConfig {
    WindowConfig { limit: 10, period_seconds: 10 }
}

fn default_hourly_window() -> WindowConfig {
    WindowConfig { limit: 1000, period_seconds: 3600 }
}

fn default_max_tracked_clients() -> usize {
    100_000
}

/// Contract classification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Lifetime of a stored verdict in seconds. Defaults to 30 days.
    #[serde(default = "default_contract_type_ttl_seconds")]
    pub contract_type_ttl_seconds: u64,
}

fn default_contract_type_ttl_seconds() -> u64 {
    30 * 24 * 60 * 60
}

/// Prometheus metrics configuration.
///
/// When enabled, metrics are exposed at `/metrics` on the server port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled. Defaults to `true`.
    pub enabled: bool,
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    pub format: String,
}

/// Root application configuration containing all subsystem settings.
///
/// Loaded with the `GATEWAY` prefix for environment overrides using `__` as a separator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub networks: Vec<NetworkConfig>,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: 8787,
            max_concurrent_requests: default_max_concurrent_requests(),
            request_timeout_seconds: default_request_timeout_seconds(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_upstream_timeout_seconds(),
            concurrent_limit: default_concurrent_limit(),
            origin: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 300,
            max_entries: default_max_entries(),
            cacheable_methods: default_cacheable_methods(),
            background_writes: default_background_writes(),
            name_resolution_only: default_name_resolution_only(),
            name_resolvers: default_name_resolvers(),
            resolver_selectors: default_resolver_selectors(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            standard: default_standard_window(),
            hourly: default_hourly_window(),
            max_tracked_clients: default_max_tracked_clients(),
            trusted_secret: None,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { contract_type_ttl_seconds: default_contract_type_ttl_seconds() }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            networks: vec![NetworkConfig {
                chain_id: 1,
                name: "mainnet".to_string(),
                rpc_url: "https://eth-mainnet.example.com".to_string(),
            }],
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            classifier: ClassifierConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Environment variables with the `GATEWAY__` prefix can override any scalar value
    /// (e.g., `GATEWAY__SERVER__BIND_PORT=8080`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_builder = Config::builder()
            .set_default("server.bind_address", "127.0.0.1")?
            .set_default("server.bind_port", 8787)?
            .set_default("cache.enabled", true)?
            .set_default("cache.ttl_seconds", 300)?
            .set_default("rate_limit.enabled", true)?
            .set_default("metrics.enabled", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("GATEWAY").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/config.toml`, or from the path in `GATEWAY_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("GATEWAY_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Returns the parsed socket address for the HTTP server.
    ///
    /// # Errors
    ///
    /// Returns an error string if the address cannot be parsed into a valid [`SocketAddr`].
    ///
    /// [`SocketAddr`]: std::net::SocketAddr
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, String> {
        format!("{}:{}", self.server.bind_address, self.server.bind_port)
            .parse()
            .map_err(|_| {
                format!(
                    "Invalid socket address: {}:{}",
                    self.server.bind_address, self.server.bind_port
                )
            })
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }

    #[must_use]
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_seconds)
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    #[must_use]
    pub fn contract_type_ttl(&self) -> Duration {
        Duration::from_secs(self.classifier.contract_type_ttl_seconds)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.networks.is_empty() {
            return Err("No networks configured".to_string());
        }

        let mut seen = HashSet::new();
        for network in &self.networks {
            if !seen.insert(network.chain_id) {
                return Err(format!("Duplicate chain id: {}", network.chain_id));
            }
            if !(network.rpc_url.starts_with("http://") || network.rpc_url.starts_with("https://"))
            {
                return Err(format!(
                    "Invalid RPC URL for network {} ({}): {}",
                    network.name, network.chain_id, network.rpc_url
                ));
            }
        }

        if self.server.bind_port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        if self.server.max_concurrent_requests == 0 {
            return Err("Max concurrent requests must be greater than 0".to_string());
        }

        if self.upstream.timeout_seconds == 0 {
            return Err("Upstream timeout must be greater than 0".to_string());
        }

        if self.server.request_timeout_seconds == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }

        // A call may wait for a classification round trip and then for its own forward.
        if self.server.request_timeout_seconds <= self.upstream.timeout_seconds.saturating_mul(2) {
            return Err(format!(
                "Request timeout ({}s) must exceed twice the upstream timeout ({}s)",
                self.server.request_timeout_seconds, self.upstream.timeout_seconds
            ));
        }

        if self.upstream.concurrent_limit == 0 {
            return Err("Upstream concurrency limit must be greater than 0".to_string());
        }

        if self.cache.ttl_seconds == 0 {
            return Err("Cache TTL must be greater than 0".to_string());
        }

        if let Some(method) = self
            .cache
            .cacheable_methods
            .iter()
            .find(|m| NON_CACHEABLE_METHODS.contains(&m.as_str()))
        {
            return Err(format!("Method {method} cannot be cached"));
        }

        for resolvers in &self.cache.name_resolvers {
            if let Some(bad) = resolvers.contracts.iter().find(|a| !is_valid_address(a)) {
                return Err(format!(
                    "Invalid name resolver address for chain {}: {bad}",
                    resolvers.chain_id
                ));
            }
        }

        if let Some(bad) = self.cache.resolver_selectors.iter().find(|s| !is_valid_selector(s)) {
            return Err(format!("Invalid resolver selector: {bad}"));
        }

        let windows = [("standard", self.rate_limit.standard), ("hourly", self.rate_limit.hourly)];
        for (name, window) in windows {
            if window.limit == 0 || window.period_seconds == 0 {
                return Err(format!("Rate limit window '{name}' needs a non-zero limit and period"));
            }
        }

        if self.rate_limit.max_tracked_clients == 0 {
            return Err("Max tracked clients must be greater than 0".to_string());
        }

        if self.classifier.contract_type_ttl_seconds == 0 {
            return Err("Contract type TTL must be greater than 0".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(format!("Unknown log format: {}", self.logging.format));
        }

        Ok(())
    }
}
