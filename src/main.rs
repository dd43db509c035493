use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use multisig_core::chain::StubChainAdapter;
use multisig_core::config::Config;
use multisig_core::manager::SessionManager;
use multisig_core::middleware;
use multisig_core::routes;
use multisig_core::store::InMemorySessionStore;
use multisig_core::transport;
use multisig_core::tunnel::NoopTunnel;
use multisig_core::{tasks, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multisig_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!("Starting multisig coordination core on {}", config.addr());

    let store: Arc<dyn multisig_core::store::SessionStore> = Arc::new(InMemorySessionStore::new());
    let chain: Arc<dyn multisig_core::chain::ChainAdapter> = Arc::new(StubChainAdapter::new());
    let tunnel: Arc<dyn multisig_core::tunnel::Tunnel> = Arc::new(NoopTunnel);

    let manager = SessionManager::new(
        store.clone(),
        chain.clone(),
        config.session_pin_length,
        config.session_default_timeout_ms,
        config.expiry_grace_period_secs * 1000,
    );

    let public_base_url = if config.tunnel_enabled {
        multisig_core::tunnel::start_or_fallback(tunnel.as_ref(), config.port, &config.public_base_url).await
    } else {
        config.public_base_url.clone()
    };
    tracing::info!(public_base_url, "public base URL resolved");

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        chain,
        tunnel,
        manager,
    };

    tasks::spawn_all(state.clone());

    let cors = CorsLayer::new()
        .allow_origin(config.cors_origins.iter().filter_map(|o| o.parse().ok()).collect::<Vec<_>>())
        .allow_methods(Any)
        .allow_headers(Any);

    let metrics_handle = setup_metrics();

    let app = Router::new()
        .merge(routes::health::router())
        .merge(transport::router())
        .route("/metrics", axum::routing::get(move || async move { metrics_handle.render() }))
        .layer(middleware::security::SecurityHeadersLayer)
        .layer(middleware::rate_limit::IpRateLimitLayer::new(
            config.ws_rate_limit_per_sec,
            config.ws_rate_limit_burst,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.addr()).await.expect("failed to bind");

    tracing::info!("Listening on {}", config.addr());
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");
}

fn setup_metrics() -> metrics_exporter_prometheus::PrometheusHandle {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl+C received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
