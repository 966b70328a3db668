//! Contact submission route (RPC-backed).

use async_trait::async_trait;
use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::client::ContactClient;
use crate::http::error::ApiError;
use crate::http::handler::RequestHandler;
use crate::http::request::{read_json, Envelope};
use crate::services::contact::types::{validate_fields, ContactSubmission};

#[derive(Debug, Deserialize)]
pub struct ContactInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub turnstile_token: String,
    #[serde(default)]
    pub cf_turnstile_token: String,
}

impl ContactInput {
    /// `turnstile_token`, falling back to `cf_turnstile_token`.
    fn token(&self) -> String {
        let primary = self.turnstile_token.trim();
        if primary.is_empty() {
            self.cf_turnstile_token.trim().to_string()
        } else {
            primary.to_string()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitResult {
    pub status: String,
}

pub struct ContactHandler {
    client: ContactClient,
    body_limit: usize,
}

impl ContactHandler {
    pub fn new(client: ContactClient, body_limit: usize) -> Self {
        Self { client, body_limit }
    }
}

#[async_trait]
impl RequestHandler for ContactHandler {
    type Input = ContactInput;
    type Output = SubmitResult;

    const ROUTE: &'static str = "contact_submit";

    async fn decode(&self, _envelope: &Envelope, body: Body) -> Result<ContactInput, ApiError> {
        read_json(body, self.body_limit).await
    }

    fn validate(&self, input: &ContactInput) -> Result<(), ApiError> {
        validate_fields(&input.name, &input.email, &input.message).map_err(ApiError::Validation)
    }

    async fn execute(
        &self,
        input: ContactInput,
        envelope: &Envelope,
    ) -> Result<SubmitResult, ApiError> {
        let submission = ContactSubmission {
            turnstile_token: input.token(),
            name: input.name,
            email: input.email,
            message: input.message,
            remote_ip: envelope.client_ip.clone().unwrap_or_default(),
        };
        let status = self.client.submit(submission, envelope.deadline).await?;
        Ok(SubmitResult { status })
    }

    fn respond(&self, result: SubmitResult) -> Response {
        (StatusCode::CREATED, Json(result)).into_response()
    }
}
