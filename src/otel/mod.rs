//! Event-to-span translation and delivery
//!
//! ```text
//! request body --decode--> EventBatch --emit--> spans --BatchSpanProcessor--> OTLP backend
//! ```
//!
//! Each event becomes one span named `process_<eventType>` carrying the
//! event's properties as string attributes. Export is batched by the SDK in
//! the background; handlers never wait on the network.
//!
//! Export is configured through the usual OTLP variables:
//! ```bash
//! OTEL_EXPORTER_OTLP_ENDPOINT=https://ingress.us-west-2.aws.dash0.com:4317
//! OTEL_EXPORTER_OTLP_HEADERS="Authorization=Bearer auth_xxx,Dash0-Dataset=default"
//! ```

mod emit;
pub mod headers;
mod model;
mod provider;

pub use emit::{emit, EmitReport, DEFAULT_EMIT_TIMEOUT};
pub use headers::{parse_header_string, resolve_headers, HeaderSet};
pub use model::{decode, DecodeError, EventBatch, EventRecord};
pub use provider::{EventTracer, ShutdownOutcome, TelemetryError, TelemetryPipeline};
