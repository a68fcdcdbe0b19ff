use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use opentelemetry::trace::Tracer;
use opentelemetry::Context;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::otel::{decode, emit, EmitReport, EventTracer};

/// Application state shared across handlers
///
/// Holds a clone of the pipeline's tracer. The pipeline itself stays with the
/// caller, which shuts it down once the listener has drained.
pub struct AppState<T = EventTracer> {
    pub tracer: T,
    pub emit_timeout: Duration,
}

impl<T> AppState<T> {
    pub fn new(tracer: T, emit_timeout: Duration) -> Self {
        Self {
            tracer,
            emit_timeout,
        }
    }
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Collect
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CollectResponse {
    pub status: &'static str,
    pub message: String,
}

impl From<EmitReport> for CollectResponse {
    fn from(report: EmitReport) -> Self {
        if report.is_complete() {
            Self {
                status: "success",
                message: format!("Processed {} events", report.requested),
            }
        } else {
            Self {
                status: "partial",
                message: format!("Processed {} events", report.completed),
            }
        }
    }
}

/// POST /collect
///
/// The body is read raw so that `text/plain` beacons decode the same as JSON posts.
pub async fn collect<T>(
    State(state): State<Arc<AppState<T>>>,
    body: Bytes,
) -> Result<Json<CollectResponse>, ApiError>
where
    T: Tracer + Clone + Send + Sync + 'static,
{
    let batch = decode(&body).map_err(|e| {
        tracing::debug!(error = %e, bytes = body.len(), "Rejected telemetry payload");
        ApiError::BadRequest(format!("Invalid request body: {}", e))
    })?;

    tracing::info!(events = batch.len(), "Processing telemetry events");

    let report = emit(
        &state.tracer,
        batch,
        &Context::current(),
        state.emit_timeout,
    )
    .await;

    Ok(Json(CollectResponse::from(report)))
}

/// OPTIONS /collect; CORS headers are added by middleware
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    MethodNotAllowed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
            ),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_response_complete() {
        let response = CollectResponse::from(EmitReport {
            requested: 3,
            completed: 3,
            timed_out: false,
        });

        assert_eq!(response.status, "success");
        assert_eq!(response.message, "Processed 3 events");
    }

    #[test]
    fn test_collect_response_partial() {
        let response = CollectResponse::from(EmitReport {
            requested: 10,
            completed: 4,
            timed_out: true,
        });

        assert_eq!(response.status, "partial");
        assert_eq!(response.message, "Processed 4 events");
    }

    #[test]
    fn test_api_error_status() {
        assert_eq!(
            ApiError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::MethodNotAllowed.into_response().status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
