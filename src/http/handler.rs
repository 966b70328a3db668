//! Request-handling contract shared by every gateway route.
//!
//! A route is one [`RequestHandler`] implementation; [`dispatch`] runs its
//! steps in order and turns any step's error into the matching HTTP status.
//! RPC-backed and forwarder-backed routes differ only in the types they plug
//! in, chosen when the router is built.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Request, State},
    response::{IntoResponse, Response},
};

use crate::http::error::ApiError;
use crate::http::request::Envelope;
use crate::observability::metrics;

#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    type Input: Send;
    type Output: Send;

    /// Route label for logs and metrics.
    const ROUTE: &'static str;

    /// Turn the request into typed input. No network calls.
    async fn decode(&self, envelope: &Envelope, body: Body) -> Result<Self::Input, ApiError>;

    /// Structural checks that must pass before any backend call.
    fn validate(&self, _input: &Self::Input) -> Result<(), ApiError> {
        Ok(())
    }

    /// Perform the backend call.
    async fn execute(&self, input: Self::Input, envelope: &Envelope)
        -> Result<Self::Output, ApiError>;

    /// Serialize a successful result.
    fn respond(&self, output: Self::Output) -> Response;
}

/// Axum entry point for any [`RequestHandler`].
pub async fn dispatch<H: RequestHandler>(State(handler): State<Arc<H>>, request: Request) -> Response {
    let started = Instant::now();
    let (envelope, body) = Envelope::from_request(request);

    let response = match run(handler.as_ref(), &envelope, body).await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(
                route = H::ROUTE,
                request_id = envelope.request_id.as_deref().unwrap_or("-"),
                error = %err,
                "Request rejected"
            );
            err.into_response()
        }
    };

    metrics::record_request(H::ROUTE, response.status().as_u16(), started.elapsed());
    response
}

async fn run<H: RequestHandler>(
    handler: &H,
    envelope: &Envelope,
    body: Body,
) -> Result<Response, ApiError> {
    let input = handler.decode(envelope, body).await?;
    handler.validate(&input)?;
    let output = handler.execute(input, envelope).await?;
    Ok(handler.respond(output))
}
