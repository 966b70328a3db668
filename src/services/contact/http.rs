//! REST surface of the contact service.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::http::request::{read_json, Envelope};
use crate::http::ApiError;
use crate::services::contact::service::ContactService;
use crate::services::contact::types::ContactSubmission;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubmitInput {
    name: String,
    email: String,
    message: String,
    turnstile_token: String,
    #[serde(alias = "cf-turnstile-response")]
    cf_turnstile_response: String,
}

#[derive(Clone)]
struct ContactState {
    service: Arc<ContactService>,
    body_limit: usize,
}

pub fn router(service: Arc<ContactService>, body_limit: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/contact", post(submit))
        .route("/contact/dev/sendmail", post(send_test_mail))
        .with_state(ContactState {
            service,
            body_limit,
        })
}

async fn healthz() -> &'static str {
    "OK"
}

async fn submit(
    State(state): State<ContactState>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let (envelope, body) = Envelope::from_request(request);
    let input: SubmitInput = read_json(body, state.body_limit).await?;

    let turnstile_token = if input.turnstile_token.trim().is_empty() {
        input.cf_turnstile_response
    } else {
        input.turnstile_token
    };

    let record = state
        .service
        .submit(ContactSubmission {
            name: input.name,
            email: input.email,
            message: input.message,
            turnstile_token,
            remote_ip: envelope.client_ip.unwrap_or_default(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

async fn send_test_mail(State(state): State<ContactState>) -> Result<impl IntoResponse, ApiError> {
    state.service.send_test_mail().await?;
    Ok(Json(json!({ "status": "sent" })))
}
