//! Inbound request envelope and request-scoped metadata.
//!
//! # Responsibilities
//! - Assign each request a UUID `x-request-id` and echo it on the response
//! - Stamp each request with its deadline
//! - Bundle headers, client IP, deadline and identity for handlers
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The deadline mirrors the whole-request timeout layer
//! - The body travels next to the envelope, not inside it, so the envelope stays `Sync`

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, Method, Uri},
    middleware::Next,
    response::Response,
};
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::http::error::ApiError;
use crate::security::{client_ip, identity, Identity};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Deadline of the inbound request, stored in request extensions.
#[derive(Debug, Clone, Copy)]
pub struct RequestDeadline(pub Instant);

/// Layer assigning a UUID v4 request id when the client sent none.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer copying the request id onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Middleware recording when the inbound request must be answered by.
pub async fn stamp_deadline(
    State(budget): State<Duration>,
    mut request: Request,
    next: Next,
) -> Response {
    request
        .extensions_mut()
        .insert(RequestDeadline(Instant::now() + budget));
    next.run(request).await
}

/// Everything a handler needs from one inbound HTTP request.
#[derive(Debug)]
pub struct Envelope {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub client_ip: Option<String>,
    pub deadline: Option<Instant>,
    pub request_id: Option<String>,
    identity: Option<Identity>,
}

impl Envelope {
    /// Split a request into its envelope and body.
    pub fn from_request(request: Request) -> (Self, Body) {
        let (parts, body) = request.into_parts();

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let deadline = parts
            .extensions
            .get::<RequestDeadline>()
            .map(|RequestDeadline(at)| *at);
        let request_id = parts
            .headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let envelope = Self {
            client_ip: client_ip(&parts.headers, peer),
            identity: identity(&parts.extensions).cloned(),
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            deadline,
            request_id,
        };
        (envelope, body)
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}

/// Read and decode a body as JSON. Any failure is "invalid JSON".
pub async fn read_json<T: DeserializeOwned>(body: Body, limit: usize) -> Result<T, ApiError> {
    let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| {
        tracing::debug!(error = %e, "Failed to read request body");
        ApiError::invalid_json()
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(error = %e, "Failed to decode request body");
        ApiError::invalid_json()
    })
}
