use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use opentelemetry::trace::Tracer;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

use super::cors::cors_headers;
use super::handlers::{collect, health_check, method_not_allowed, not_found, preflight, AppState};
use crate::otel::{TelemetryPipeline, DEFAULT_EMIT_TIMEOUT};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deadline for emitting one request's spans
    pub emit_timeout: Duration,
    /// How long in-flight requests get to finish after a shutdown signal
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            emit_timeout: DEFAULT_EMIT_TIMEOUT,
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

/// Build the application router
pub fn build_router<T>(state: Arc<AppState<T>>) -> Router
where
    T: Tracer + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/collect",
            post(collect::<T>)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(cors_headers))
        .with_state(state)
}

/// Bind and serve until a shutdown signal arrives and in-flight requests drain.
///
/// The telemetry pipeline is left running; the caller shuts it down once this returns.
pub async fn run_server(
    config: ServerConfig,
    pipeline: Arc<TelemetryPipeline>,
) -> Result<(), BoxError> {
    let listener = bind(&config).await?;
    tracing::info!("Telemetry collector listening on {}", listener.local_addr()?);

    serve(listener, config, pipeline, shutdown_signal()).await
}

/// Bind `host:port`; the host may be an IPv4/IPv6 literal or a name to resolve
async fn bind(config: &ServerConfig) -> std::io::Result<TcpListener> {
    TcpListener::bind((config.host.as_str(), config.port)).await
}

/// Serve on an already-bound listener until `signal` resolves, then give
/// in-flight requests at most `shutdown_grace` to complete.
pub async fn serve<F>(
    listener: TcpListener,
    config: ServerConfig,
    pipeline: Arc<TelemetryPipeline>,
    signal: F,
) -> Result<(), BoxError>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let state = Arc::new(AppState::new(
        pipeline.tracer().clone(),
        config.emit_timeout,
    ));
    let app = build_router(state);

    let (draining_tx, draining_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            let _ = draining_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        _ = draining_rx => {
            tracing::info!(
                grace_secs = config.shutdown_grace.as_secs(),
                "Draining in-flight requests"
            );
            match tokio::time::timeout(config.shutdown_grace, &mut server).await {
                Ok(result) => result?,
                Err(_) => tracing::warn!("Shutdown grace period elapsed, dropping open connections"),
            }
        }
    }

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM signal handler");
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

    tracing::info!("Shutdown signal received, stopping listener...");
}
