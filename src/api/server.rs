//! API Server
//!
//! Builds the axum application around the service container and serves it
//! until Ctrl+C or SIGTERM.

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    monitoring::{track_metrics, MetricsRegistry},
    routes::create_router,
};
use crate::{config::CasinoConfig, services::CasinoServices};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

/// HTTP front end for the casino services
pub struct ApiServer {
    services: CasinoServices,
    metrics: Arc<MetricsRegistry>,
}

impl ApiServer {
    pub fn new(services: CasinoServices) -> Self {
        Self {
            services,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Start the API server
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.get_socket_addr()?;
        let app = self.create_app();

        info!("Starting casino API server");
        info!("   Listen: http://{}", addr);
        self.log_server_info();

        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server stopped gracefully");
        Ok(())
    }

    /// Create the application with its middleware stack
    pub fn create_app(&self) -> axum::Router {
        build_app(self.services.clone(), Arc::clone(&self.metrics))
    }

    fn config(&self) -> &CasinoConfig {
        self.services.config()
    }

    fn get_socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        let api = &self.config().api;
        Ok(SocketAddr::from((api.host.parse::<std::net::IpAddr>()?, api.port)))
    }

    fn log_server_info(&self) {
        let config = self.config();
        info!("Server configuration:");
        info!("   Database: {}", config.database.url);
        info!("   CORS: {:?}", config.api.allowed_origins);
        info!("   Request timeout: {}s", config.api.request_timeout_secs);
        info!("   Tokens per USD: {}", config.wallet.tokens_per_usd);
        match config.slots.seed {
            Some(seed) => info!("   Reels: seeded ({})", seed),
            None => info!("   Reels: thread rng"),
        }
    }
}

/// Install the global tracing subscriber; `RUST_LOG` wins over `default_filter`
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .try_init();
}

/// Router plus middleware, shared by the server and the integration tests
pub fn build_app(services: CasinoServices, metrics: Arc<MetricsRegistry>) -> axum::Router {
    let allowed_origins = services.config().api.allowed_origins.clone();
    let timeout = services.config().request_timeout();

    let state = Arc::new(AppState {
        services,
        metrics: Arc::clone(&metrics),
    });

    create_router(state)
        .layer(axum::middleware::from_fn_with_state(metrics, track_metrics))
        // Request ID middleware (outside the metrics layer so errors carry it)
        .layer(axum::middleware::from_fn(request_id_middleware))
        // CORS layer (before timeout to handle preflight)
        .layer(create_cors_layer(allowed_origins))
        .layer(TimeoutLayer::new(timeout))
        // Tracing layer (last for complete request tracing)
        .layer(TraceLayer::new_for_http())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
