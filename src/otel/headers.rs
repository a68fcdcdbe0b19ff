//! Exporter header resolution
//!
//! Headers come from one of two places, in this order:
//!
//! 1. An API key, which produces an `Authorization` header plus a dataset header.
//! 2. A raw `OTEL_EXPORTER_OTLP_HEADERS`-style string: `key1=value1,key2=value2`.
//!
//! With neither present the exporter runs unauthenticated.

use std::collections::HashMap;

/// Header name to header value, handed to the exporter transport once
pub type HeaderSet = HashMap<String, String>;

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const DATASET_HEADER: &str = "Dash0-Dataset";
pub const DEFAULT_DATASET: &str = "default";

const BEARER_PREFIX: &str = "Bearer ";

/// Resolve the exporter headers from the configured credentials.
///
/// Empty strings count as absent.
pub fn resolve_headers(
    api_key: Option<&str>,
    raw_headers: Option<&str>,
    dataset: Option<&str>,
) -> HeaderSet {
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        let dataset = dataset.filter(|d| !d.is_empty()).unwrap_or(DEFAULT_DATASET);

        let mut headers = HeaderSet::with_capacity(2);
        headers.insert(AUTHORIZATION_HEADER.to_string(), bearer(key));
        headers.insert(DATASET_HEADER.to_string(), dataset.to_string());
        return headers;
    }

    if let Some(raw) = raw_headers.filter(|r| !r.is_empty()) {
        return parse_header_string(raw);
    }

    tracing::warn!("No API key or exporter headers configured, spans will be exported without authentication");
    HeaderSet::new()
}

/// Parse `key1=value1,key2=value2`.
///
/// Pairs are split on `,`, keys from values on the first `=`. Pairs with an
/// empty key are skipped and a later duplicate key wins. Nothing is trimmed.
pub fn parse_header_string(raw: &str) -> HeaderSet {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key.is_empty() {
                None
            } else {
                Some((key.to_string(), value.to_string()))
            }
        })
        .collect()
}

fn bearer(key: &str) -> String {
    if key.starts_with(BEARER_PREFIX) {
        key.to_string()
    } else {
        format!("{}{}", BEARER_PREFIX, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_string() {
        let headers = parse_header_string("Authorization=Bearer token,Dash0-Dataset=default");

        let mut expected = HeaderSet::new();
        expected.insert("Authorization".to_string(), "Bearer token".to_string());
        expected.insert("Dash0-Dataset".to_string(), "default".to_string());
        assert_eq!(headers, expected);
    }

    #[test]
    fn test_parse_splits_on_first_equals() {
        let headers = parse_header_string("x-token=abc==,x-query=a=b");

        assert_eq!(headers.get("x-token").map(String::as_str), Some("abc=="));
        assert_eq!(headers.get("x-query").map(String::as_str), Some("a=b"));
    }

    #[test]
    fn test_parse_skips_empty_keys() {
        let headers = parse_header_string("=orphan,,a=1,");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("a").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_parse_does_not_trim() {
        let headers = parse_header_string(" a = 1 ,b=2");

        assert_eq!(headers.get(" a ").map(String::as_str), Some(" 1 "));
        assert_eq!(headers.get("b").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_parse_pair_without_equals_has_empty_value() {
        let headers = parse_header_string("flag");
        assert_eq!(headers.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn test_api_key_takes_precedence() {
        let headers = resolve_headers(Some("secret"), Some("other=value"), Some("prod"));

        assert_eq!(headers.len(), 2);
        assert_eq!(
            headers.get(AUTHORIZATION_HEADER).map(String::as_str),
            Some("Bearer secret")
        );
        assert_eq!(headers.get(DATASET_HEADER).map(String::as_str), Some("prod"));
        assert!(!headers.contains_key("other"));
    }

    #[test]
    fn test_api_key_dataset_defaults() {
        let headers = resolve_headers(Some("Bearer secret"), None, None);

        assert_eq!(
            headers.get(AUTHORIZATION_HEADER).map(String::as_str),
            Some("Bearer secret")
        );
        assert_eq!(
            headers.get(DATASET_HEADER).map(String::as_str),
            Some(DEFAULT_DATASET)
        );
    }

    #[test]
    fn test_raw_headers_used_without_api_key() {
        let headers = resolve_headers(Some(""), Some("a=1,b=2"), Some("ignored"));

        assert_eq!(headers.len(), 2);
        assert!(!headers.contains_key(DATASET_HEADER));
    }

    #[test]
    fn test_no_credentials() {
        assert!(resolve_headers(None, None, Some("prod")).is_empty());
        assert!(resolve_headers(None, Some(""), None).is_empty());
    }
}
