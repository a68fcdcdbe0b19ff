//! CORS headers for browser clients
//!
//! Applied to every response. The origin and requested headers are echoed
//! back so that credentialed `fetch`/`sendBeacon` calls from any page work.

use axum::{
    extract::Request,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
            ACCESS_CONTROL_REQUEST_HEADERS, ORIGIN,
        },
        HeaderValue, Method,
    },
    middleware::Next,
    response::Response,
};

pub const ALLOW_METHODS: &str = "POST, GET, OPTIONS";
pub const DEFAULT_ALLOW_HEADERS: &str =
    "Accept, Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, Authorization, Dash0-Dataset";
/// Preflight cache lifetime in seconds
pub const MAX_AGE: &str = "7200";

pub async fn cors_headers(request: Request, next: Next) -> Response {
    let origin = non_empty(request.headers().get(ORIGIN))
        .unwrap_or_else(|| HeaderValue::from_static("*"));
    let allow_headers = non_empty(request.headers().get(ACCESS_CONTROL_REQUEST_HEADERS))
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ALLOW_HEADERS));
    let preflight = request.method() == Method::OPTIONS;

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, allow_headers);
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    if preflight {
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE));
    }

    response
}

fn non_empty(value: Option<&HeaderValue>) -> Option<HeaderValue> {
    value.filter(|v| !v.is_empty()).cloned()
}
