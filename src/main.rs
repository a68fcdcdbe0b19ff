//! Telemetry Collector Server
//!
//! Run with: cargo run
//!
//! See the `config` module for the environment variables; `RUST_LOG` sets the
//! log level (default: info).

use std::sync::Arc;

use telemetry_collector::api::{run_server, BoxError};
use telemetry_collector::{CollectorConfig, TelemetryPipeline};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telemetry_collector=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("telemetry-collector v{} starting", env!("CARGO_PKG_VERSION"));

    let config = CollectorConfig::from_env()?;

    tracing::info!("Collector configuration:");
    tracing::info!("  Listen: {}:{}", config.server.host, config.server.port);
    tracing::info!(
        "  Exporter: {} ({})",
        config.exporter.endpoint,
        config.exporter.protocol.as_str()
    );
    tracing::info!(
        "  Service: {} {}",
        config.exporter.service_name,
        config.exporter.service_version
    );
    tracing::info!("  Emit timeout: {:?}", config.server.emit_timeout);
    tracing::info!("  Shutdown grace: {:?}", config.server.shutdown_grace);

    // The service does not start without a working tracer
    let pipeline = Arc::new(TelemetryPipeline::init(&config.exporter)?);

    let served = run_server(config.server, Arc::clone(&pipeline)).await;
    if let Err(e) = &served {
        tracing::error!(error = %e, "HTTP server failed");
    }

    let outcome = pipeline.shutdown().await;
    tracing::info!(?outcome, "Shutdown complete");
    served
}
