//! Telemetry Collector: client event ingestion for OpenTelemetry
//!
//! Browsers post batches of events to `/collect`; every event is turned into a
//! span and exported to an OTLP backend by a batching tracer provider.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use telemetry_collector::api::run_server;
//! use telemetry_collector::{CollectorConfig, TelemetryPipeline};
//!
//! # async fn run() -> Result<(), telemetry_collector::api::BoxError> {
//! let config = CollectorConfig::from_env()?;
//! let pipeline = Arc::new(TelemetryPipeline::init(&config.exporter)?);
//!
//! let served = run_server(config.server, Arc::clone(&pipeline)).await;
//! pipeline.shutdown().await;
//! served
//! # }
//! ```

pub mod api;
pub mod config;
pub mod otel;

// Re-export commonly used types
pub use config::{CollectorConfig, ConfigError, ExporterConfig, Protocol};
pub use otel::{
    decode, emit, DecodeError, EmitReport, EventBatch, EventRecord, ShutdownOutcome,
    TelemetryError, TelemetryPipeline,
};
