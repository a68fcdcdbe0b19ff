//! Tracer provider lifecycle
//!
//! [`TelemetryPipeline`] owns the process-wide provider and the tracer that
//! request handlers start spans with. It is built once before the listener
//! starts and shut down once after the listener has drained.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{SpanExporter, WithExportConfig, WithHttpConfig, WithTonicConfig};
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};
use tonic::transport::ClientTlsConfig;

use crate::config::{ExporterConfig, Protocol};
use crate::otel::headers::HeaderSet;

/// Tracer handed out by the SDK provider
pub type EventTracer = <SdkTracerProvider as opentelemetry::trace::TracerProvider>::Tracer;

/// Instrumentation scope of every span this service emits
pub const TRACER_NAME: &str = "telemetry-collector";

/// Upper bound on flushing and closing the exporter
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-export request timeout on the transport
const EXPORT_TIMEOUT: Duration = Duration::from_secs(10);

const TRACES_PATH: &str = "/v1/traces";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to create span exporter: {0}")]
    Exporter(String),
}

/// How a call to [`TelemetryPipeline::shutdown`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    Completed,
    AlreadyShutDown,
    Failed,
    TimedOut,
}

pub struct TelemetryPipeline {
    provider: SdkTracerProvider,
    tracer: EventTracer,
    shutdown_timeout: Duration,
    shut_down: AtomicBool,
}

impl TelemetryPipeline {
    /// Build the exporter and provider, and register the provider globally
    /// for any third-party instrumentation in the process.
    pub fn init(config: &ExporterConfig) -> Result<Self, TelemetryError> {
        let exporter = build_exporter(config)?;

        let provider = SdkTracerProvider::builder()
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(build_resource(config))
            .with_batch_exporter(exporter)
            .build();

        opentelemetry::global::set_tracer_provider(provider.clone());

        tracing::info!(
            endpoint = %config.endpoint,
            protocol = config.protocol.as_str(),
            service_name = %config.service_name,
            headers = config.headers.len(),
            "Tracer provider initialized"
        );

        Ok(Self::from_provider(provider))
    }

    /// Wrap an already-built provider
    pub fn from_provider(provider: SdkTracerProvider) -> Self {
        let tracer = provider.tracer(TRACER_NAME);
        Self {
            provider,
            tracer,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn tracer(&self) -> &EventTracer {
        &self.tracer
    }

    /// Flush buffered spans and close the exporter.
    ///
    /// Never fails from the caller's point of view: errors and timeouts are
    /// logged. Only the first call does any work.
    pub async fn shutdown(&self) -> ShutdownOutcome {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            tracing::debug!("Tracer provider already shut down");
            return ShutdownOutcome::AlreadyShutDown;
        }

        // SDK shutdown blocks. A detached thread keeps a stalled exporter from
        // holding up runtime teardown past the timeout.
        let provider = self.provider.clone();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let spawned = std::thread::Builder::new()
            .name("otel-shutdown".to_string())
            .spawn(move || {
                let _ = tx.send(provider.shutdown());
            });

        if let Err(e) = spawned {
            tracing::error!(error = %e, "Failed to spawn tracer provider shutdown thread");
            return ShutdownOutcome::Failed;
        }

        match tokio::time::timeout(self.shutdown_timeout, rx).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!("Tracer provider shut down");
                ShutdownOutcome::Completed
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, "Error shutting down tracer provider");
                ShutdownOutcome::Failed
            }
            Ok(Err(_)) => {
                tracing::error!("Tracer provider shutdown thread exited without reporting");
                ShutdownOutcome::Failed
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "Tracer provider shutdown timed out, buffered spans may be lost"
                );
                ShutdownOutcome::TimedOut
            }
        }
    }
}

fn build_resource(config: &ExporterConfig) -> Resource {
    Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attribute(KeyValue::new(
            "service.version",
            config.service_version.clone(),
        ))
        .build()
}

fn build_exporter(config: &ExporterConfig) -> Result<SpanExporter, TelemetryError> {
    match config.protocol {
        Protocol::Grpc => {
            let mut builder = SpanExporter::builder()
                .with_tonic()
                .with_endpoint(config.endpoint.clone())
                .with_timeout(EXPORT_TIMEOUT);

            if config.endpoint.starts_with("https://") {
                builder = builder.with_tls_config(ClientTlsConfig::new().with_native_roots());
            }
            if !config.headers.is_empty() {
                builder = builder.with_metadata(metadata_from_headers(&config.headers));
            }

            builder
                .build()
                .map_err(|e| TelemetryError::Exporter(e.to_string()))
        }
        Protocol::HttpProtobuf => {
            let mut builder = SpanExporter::builder()
                .with_http()
                .with_endpoint(traces_endpoint(&config.endpoint))
                .with_protocol(opentelemetry_otlp::Protocol::HttpBinary)
                .with_timeout(EXPORT_TIMEOUT);

            if !config.headers.is_empty() {
                builder = builder.with_headers(config.headers.clone());
            }

            builder
                .build()
                .map_err(|e| TelemetryError::Exporter(e.to_string()))
        }
    }
}

/// gRPC carries headers as metadata; names that are not valid metadata keys are dropped
fn metadata_from_headers(headers: &HeaderSet) -> MetadataMap {
    let mut metadata = MetadataMap::with_capacity(headers.len());
    for (key, value) in headers {
        match (
            key.to_ascii_lowercase().parse::<MetadataKey<_>>(),
            value.parse::<MetadataValue<_>>(),
        ) {
            (Ok(k), Ok(v)) => {
                metadata.insert(k, v);
            }
            _ => tracing::warn!(header = %key, "Skipping exporter header that is not valid gRPC metadata"),
        }
    }
    metadata
}

/// The HTTP exporter posts to the signal path, which the configured base endpoint may omit
fn traces_endpoint(endpoint: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    if base.ends_with(TRACES_PATH) {
        base.to_string()
    } else {
        format!("{}{}", base, TRACES_PATH)
    }
}
