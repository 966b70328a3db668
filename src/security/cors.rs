//! Static CORS allow-list.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

fn parse_all<T, F>(items: &[String], kind: &str, parse: F) -> Vec<T>
where
    F: Fn(&str) -> Option<T>,
{
    items
        .iter()
        .filter_map(|item| {
            let parsed = parse(item.trim());
            if parsed.is_none() {
                tracing::warn!(value = %item, kind, "Ignoring invalid CORS entry");
            }
            parsed
        })
        .collect()
}

/// Build the CORS layer from configuration. Invalid entries are skipped.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = parse_all(&config.allowed_origins, "origin", |s| {
        HeaderValue::from_str(s).ok()
    });
    let methods = parse_all(&config.allowed_methods, "method", |s| {
        Method::from_bytes(s.to_ascii_uppercase().as_bytes()).ok()
    });
    let headers = parse_all(&config.allowed_headers, "header", |s| {
        HeaderName::from_bytes(s.as_bytes()).ok()
    });
    let exposed = parse_all(&config.exposed_headers, "header", |s| {
        HeaderName::from_bytes(s.as_bytes()).ok()
    });

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers(headers)
        .expose_headers(exposed)
        .allow_credentials(config.allow_credentials)
        .max_age(Duration::from_secs(config.max_age_secs))
}
