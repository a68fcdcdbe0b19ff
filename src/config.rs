//! Environment configuration
//!
//! Environment variables:
//! - `HOST`: Bind host, an IP literal or a resolvable name (default: 0.0.0.0)
//! - `PORT`: Port number (default: 8080)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector endpoint (default: Dash0 us-west-2 gRPC ingress)
//! - `OTEL_EXPORTER_OTLP_PROTOCOL`: `grpc` or `http/protobuf` (default: grpc)
//! - `OTEL_EXPORTER_OTLP_HEADERS`: Exporter headers as `key1=value1,key2=value2`
//! - `DASH0_API_KEY`: API key; when set it replaces `OTEL_EXPORTER_OTLP_HEADERS`
//! - `DASH0_DATASET`: Dataset sent alongside the API key (default: default)
//! - `OTEL_SERVICE_NAME`: Resource `service.name` (default: client-telemetry)
//! - `OTEL_SERVICE_VERSION`: Resource `service.version` (default: 1.0.0)
//! - `COLLECTOR_EMIT_TIMEOUT_MS`: Per-request emission deadline (default: 5000)
//! - `COLLECTOR_SHUTDOWN_GRACE_SECS`: Listener drain period on shutdown (default: 10)
//!
//! Empty values are treated as unset.

use std::str::FromStr;
use std::time::Duration;

use crate::api::ServerConfig;
use crate::otel::headers::{resolve_headers, HeaderSet};

pub const DEFAULT_ENDPOINT: &str = "https://ingress.us-west-2.aws.dash0.com:4317";
pub const DEFAULT_SERVICE_NAME: &str = "client-telemetry";
pub const DEFAULT_SERVICE_VERSION: &str = "1.0.0";

/// OTLP transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Grpc,
    HttpProtobuf,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Grpc => "grpc",
            Protocol::HttpProtobuf => "http/protobuf",
        }
    }
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grpc" => Ok(Protocol::Grpc),
            "http/protobuf" => Ok(Protocol::HttpProtobuf),
            other => Err(ConfigError::Invalid {
                key: "OTEL_EXPORTER_OTLP_PROTOCOL",
                value: other.to_string(),
            }),
        }
    }
}

/// Everything the tracer pipeline needs to reach the backend
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub endpoint: String,
    pub protocol: Protocol,
    pub headers: HeaderSet,
    pub service_name: String,
    pub service_version: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            protocol: Protocol::default(),
            headers: HeaderSet::new(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_version: DEFAULT_SERVICE_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectorConfig {
    pub server: ServerConfig,
    pub exporter: ExporterConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

impl CollectorConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = ServerConfig::default();

        let server = ServerConfig {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_var(&var, "PORT")?.unwrap_or(defaults.port),
            emit_timeout: parse_var(&var, "COLLECTOR_EMIT_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.emit_timeout),
            shutdown_grace: parse_var(&var, "COLLECTOR_SHUTDOWN_GRACE_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_grace),
        };

        let api_key = var("DASH0_API_KEY");
        let raw_headers = var("OTEL_EXPORTER_OTLP_HEADERS");
        let dataset = var("DASH0_DATASET");

        let exporter = ExporterConfig {
            endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            protocol: parse_var(&var, "OTEL_EXPORTER_OTLP_PROTOCOL")?.unwrap_or_default(),
            headers: resolve_headers(api_key.as_deref(), raw_headers.as_deref(), dataset.as_deref()),
            service_name: var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            service_version: var("OTEL_SERVICE_VERSION")
                .unwrap_or_else(|| DEFAULT_SERVICE_VERSION.to_string()),
        };

        Ok(Self { server, exporter })
    }
}

fn parse_var<T, F>(var: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
