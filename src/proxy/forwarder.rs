//! Transparent HTTP forwarding to a fixed upstream base URL.
//!
//! # Responsibilities
//! - Rebuild the request against the upstream base URL, keeping method and path
//! - Forward a fixed subset of request headers
//! - Relay status, content headers and the streamed body unchanged
//!
//! # Design Decisions
//! - One shared hyper client; no retries
//! - Only the response head is bounded by the deadline; the body streams
//! - Connection errors and timeouts are a single "upstream unavailable" kind

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Method, Request, Response, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use tokio::time::Instant;

use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;
use crate::resilience::capped_deadline;

const FORWARDED_REQUEST_HEADERS: [HeaderName; 5] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::ACCEPT,
    header::AUTHORIZATION,
    header::USER_AGENT,
];

const RELAYED_RESPONSE_HEADERS: [HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::LOCATION,
    header::CACHE_CONTROL,
];

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream uri: {0}")]
    InvalidUri(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

/// Reverse-proxy forwarder bound to one upstream base URL.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    base: String,
    ceiling: Duration,
}

impl Forwarder {
    pub fn new(base: &str, ceiling: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            ceiling,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Forward `body` to `base + path`.
    ///
    /// A responding upstream always yields `Ok`, whatever its status code.
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        headers: &HeaderMap,
        body: Body,
        inbound_deadline: Option<Instant>,
    ) -> Result<Response<Body>, ForwardError> {
        let uri: Uri = format!("{}{}", self.base, path)
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| ForwardError::InvalidUri(e.to_string()))?;

        let mut builder = Request::builder().method(method.clone()).uri(uri.clone());
        for name in FORWARDED_REQUEST_HEADERS.iter().chain([&X_REQUEST_ID]) {
            if let Some(value) = headers.get(name) {
                builder = builder.header(name, value);
            }
        }
        let request = builder
            .body(body)
            .map_err(|e| ForwardError::InvalidUri(e.to_string()))?;

        let deadline = capped_deadline(inbound_deadline, self.ceiling);
        let started = Instant::now();

        let upstream = match tokio::time::timeout_at(deadline, self.client.request(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(upstream = %uri, error = %e, "Upstream request failed");
                metrics::record_forward(&self.base, 502, started.elapsed());
                return Err(ForwardError::UpstreamUnavailable(e.to_string()));
            }
            Err(_) => {
                tracing::warn!(upstream = %uri, timeout = ?self.ceiling, "Upstream request timed out");
                metrics::record_forward(&self.base, 504, started.elapsed());
                return Err(ForwardError::UpstreamUnavailable("deadline exceeded".to_string()));
            }
        };

        let (parts, body) = upstream.into_parts();
        metrics::record_forward(&self.base, parts.status.as_u16(), started.elapsed());
        tracing::debug!(upstream = %uri, status = %parts.status, "Upstream responded");

        let mut response = Response::builder().status(parts.status);
        for name in RELAYED_RESPONSE_HEADERS.iter() {
            for value in parts.headers.get_all(name) {
                response = response.header(name, value);
            }
        }
        response
            .body(Body::new(body))
            .map_err(|e| ForwardError::InvalidUri(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use axum::{http::StatusCode, response::IntoResponse, routing::post, Json, Router};
    use http_body_util::BodyExt;
    use tokio::net::TcpListener;

    /// Echoes the received header names and answers with a mix of headers.
    async fn echo(headers: HeaderMap) -> impl IntoResponse {
        let mut names: Vec<String> = headers.keys().map(|k| k.as_str().to_string()).collect();
        names.sort();
        (
            StatusCode::CREATED,
            [
                ("location", "/users/1"),
                ("cache-control", "no-store"),
                ("set-cookie", "session=abc"),
                ("x-internal", "node-7"),
            ],
            Json(names),
        )
    }

    async fn start_upstream() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/auth/register", post(echo));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    async fn start_silent_upstream() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        addr
    }

    fn inbound_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer t".parse().unwrap());
        headers.insert(header::USER_AGENT, "tests/1.0".parse().unwrap());
        headers.insert(X_REQUEST_ID, "req-1".parse().unwrap());
        headers.insert(header::COOKIE, "session=abc".parse().unwrap());
        headers.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());
        headers.insert("x-secret", "hunter2".parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn forwards_allowed_request_headers_only() {
        let addr = start_upstream().await;
        let forwarder = Forwarder::new(&format!("http://{addr}/"), Duration::from_secs(5));

        let response = forwarder
            .forward(
                Method::POST,
                "/auth/register",
                &inbound_headers(),
                Body::from("{}"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let seen: Vec<String> = serde_json::from_slice(&body).unwrap();
        for expected in ["authorization", "content-type", "user-agent", "x-request-id"] {
            assert!(seen.iter().any(|h| h == expected), "missing {expected}: {seen:?}");
        }
        for dropped in ["cookie", "x-forwarded-for", "x-secret"] {
            assert!(!seen.iter().any(|h| h == dropped), "leaked {dropped}: {seen:?}");
        }
    }

    #[tokio::test]
    async fn relays_content_headers_only() {
        let addr = start_upstream().await;
        let forwarder = Forwarder::new(&format!("http://{addr}"), Duration::from_secs(5));

        let response = forwarder
            .forward(Method::POST, "/auth/register", &HeaderMap::new(), Body::empty(), None)
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::LOCATION], "/users/1");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert!(headers.contains_key(header::CONTENT_LENGTH));
        assert!(!headers.contains_key(header::SET_COOKIE));
        assert!(!headers.contains_key("x-internal"));
        assert!(!headers.contains_key(header::DATE));
    }

    #[tokio::test]
    async fn silent_upstream_times_out_at_the_ceiling() {
        let addr = start_silent_upstream().await;
        let forwarder = Forwarder::new(&format!("http://{addr}"), Duration::from_millis(200));

        let started = Instant::now();
        let err = forwarder
            .forward(Method::POST, "/auth/register", &HeaderMap::new(), Body::empty(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ForwardError::UpstreamUnavailable(_)));
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn earlier_inbound_deadline_cuts_the_wait_short() {
        let addr = start_silent_upstream().await;
        let forwarder = Forwarder::new(&format!("http://{addr}"), Duration::from_secs(30));

        let started = Instant::now();
        let err = forwarder
            .forward(
                Method::POST,
                "/auth/register",
                &HeaderMap::new(),
                Body::empty(),
                Some(started + Duration::from_millis(150)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ForwardError::UpstreamUnavailable(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn refused_connection_is_upstream_unavailable() {
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let forwarder = Forwarder::new(&format!("http://{addr}"), Duration::from_secs(5));

        let err = forwarder
            .forward(Method::GET, "/", &HeaderMap::new(), Body::empty(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ForwardError::UpstreamUnavailable(_)));
    }
}
