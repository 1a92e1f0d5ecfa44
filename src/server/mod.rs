use crate::config::AppConfig;
use crate::downloader::{CredentialSource, MediaExtractor, OptionsBuilder};
use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod error;
pub mod routes;

pub use error::ApiError;

/// Shared application context. Nothing in here is mutated after startup.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub extractor: Arc<dyn MediaExtractor>,
    pub options: Arc<OptionsBuilder>,
}

impl AppContext {
    /// Context whose credentials come from the process environment
    pub fn new(config: AppConfig, extractor: Arc<dyn MediaExtractor>) -> Self {
        let options = OptionsBuilder::new(config.defaults.clone(), CredentialSource::Environment);
        Self {
            config: Arc::new(config),
            extractor,
            options: Arc::new(options),
        }
    }

    pub fn with_options(mut self, options: OptionsBuilder) -> Self {
        self.options = Arc::new(options);
        self
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let media = &ctx.config.media;
    let serve_media = ServeDir::new(&media.root);
    let media_prefix = media.url_prefix.trim_end_matches('/').to_string();

    let app = routes::media_routes();

    // Downloaded files, served from the media root
    let app = if media_prefix.is_empty() {
        app.fallback_service(serve_media)
    } else {
        app.nest_service(&media_prefix, serve_media)
    };

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Start the HTTP server
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let server = &ctx.config.server;
    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .context("Invalid server address")?;

    tokio::fs::create_dir_all(ctx.config.media.videos_dir())
        .await
        .with_context(|| format!("Failed to create {:?}", ctx.config.media.videos_dir()))?;

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
