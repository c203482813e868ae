use anyhow::Result;
use axum::serve;
use gateway_core::{
    cache::MemoryStore,
    config::AppConfig,
    metrics::MetricsCollector,
    proxy::GatewayEngine,
    rate_limit::SlidingWindowLimiter,
};
use rustls::crypto::{ring::default_provider, CryptoProvider};
use server::router::{create_app, AppState};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CRATE_FILTERS: &str = "gateway_core={level},server={level}";

fn crate_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("warn,{}", CRATE_FILTERS.replace("{level}", level)))
}

/// Initializes logging. `RUST_LOG=debug` and `RUST_LOG=trace` are shortcuts that raise only
/// this workspace's crates; any other `RUST_LOG` value is used as a full filter directive.
fn init_logging(config: &AppConfig) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(level) if level == "debug" || level == "trace" => crate_filter(&level),
        Ok(_) => EnvFilter::try_from_env("RUST_LOG")
            .unwrap_or_else(|_| crate_filter(&config.logging.level)),
        Err(_) => crate_filter(&config.logging.level),
    };

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

fn build_engine(config: &AppConfig, metrics: Arc<MetricsCollector>) -> Result<GatewayEngine> {
    let store = Arc::new(MemoryStore::new(config.cache.max_entries));

    let standard = Arc::new(SlidingWindowLimiter::with_max_keys(
        config.rate_limit.standard.limit,
        config.rate_limit.standard.period(),
        config.rate_limit.max_tracked_clients,
    ));
    let hourly = Arc::new(SlidingWindowLimiter::with_max_keys(
        config.rate_limit.hourly.limit,
        config.rate_limit.hourly.period(),
        config.rate_limit.max_tracked_clients,
    ));
    standard.start_cleanup_task();
    hourly.start_cleanup_task();

    GatewayEngine::from_config(config, store, standard, hourly, metrics)
        .map_err(|e| anyhow::anyhow!("Gateway initialization failed: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    CryptoProvider::install_default(default_provider())
        .map_err(|e| anyhow::anyhow!("Failed to install crypto provider: {e:?}"))?;

    let config =
        AppConfig::load().map_err(|e| anyhow::anyhow!("Configuration loading failed: {e}"))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config);
    info!("Starting JSON-RPC gateway");
    debug!(
        networks = config.networks.len(),
        cache_enabled = config.cache.enabled,
        rate_limit_enabled = config.rate_limit.enabled,
        bind_port = config.server.bind_port,
        "Configuration loaded"
    );

    let metrics = Arc::new(if config.metrics.enabled {
        MetricsCollector::new()
    } else {
        MetricsCollector::disabled()
    });

    let engine = Arc::new(build_engine(&config, Arc::clone(&metrics))?);
    for network in engine.networks().endpoints() {
        info!(chain_id = network.chain_id, network = %network.name, "network registered");
    }

    let app = create_app(AppState::new(engine, metrics, &config), &config);
    let addr = config.socket_addr().map_err(|e| anyhow::anyhow!(e))?;
    info!(address = %addr, "Gateway listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error occurred");
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining in-flight requests");
}
