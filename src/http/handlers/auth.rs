//! Auth routes: login over RPC, register over the reverse proxy, and the
//! protected identity echo.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::client::AuthClient;
use crate::http::error::ApiError;
use crate::http::handler::RequestHandler;
use crate::http::request::{read_json, Envelope};
use crate::proxy::Forwarder;
use crate::security::Identity;
use crate::services::auth::types::Session;

pub const REGISTER_PATH: &str = "/auth/register";

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub struct LoginHandler {
    client: AuthClient,
    body_limit: usize,
}

impl LoginHandler {
    pub fn new(client: AuthClient, body_limit: usize) -> Self {
        Self { client, body_limit }
    }
}

#[async_trait]
impl RequestHandler for LoginHandler {
    type Input = LoginInput;
    type Output = Session;

    const ROUTE: &'static str = "auth_login";

    async fn decode(&self, _envelope: &Envelope, body: Body) -> Result<LoginInput, ApiError> {
        read_json(body, self.body_limit).await
    }

    async fn execute(&self, input: LoginInput, envelope: &Envelope) -> Result<Session, ApiError> {
        let session = self
            .client
            .login(input.email.trim().to_string(), input.password, envelope.deadline)
            .await?;
        tracing::info!(user_id = %session.user.id, "Login succeeded");
        Ok(session)
    }

    fn respond(&self, session: Session) -> Response {
        (StatusCode::OK, Json(session)).into_response()
    }
}

/// Relays the raw body to the auth service's REST register endpoint.
pub struct RegisterHandler {
    forwarder: Forwarder,
}

impl RegisterHandler {
    pub fn new(forwarder: Forwarder) -> Self {
        Self { forwarder }
    }
}

#[async_trait]
impl RequestHandler for RegisterHandler {
    type Input = Body;
    type Output = Response;

    const ROUTE: &'static str = "auth_register";

    async fn decode(&self, _envelope: &Envelope, body: Body) -> Result<Body, ApiError> {
        Ok(body)
    }

    async fn execute(&self, body: Body, envelope: &Envelope) -> Result<Response, ApiError> {
        let response = self
            .forwarder
            .forward(
                Method::POST,
                REGISTER_PATH,
                &envelope.headers,
                body,
                envelope.deadline,
            )
            .await?;
        Ok(response)
    }

    fn respond(&self, response: Response) -> Response {
        response
    }
}

#[derive(Debug, Serialize)]
pub struct Me {
    pub user_id: String,
}

/// Returns the identity attached by the bearer middleware.
pub struct MeHandler;

#[async_trait]
impl RequestHandler for MeHandler {
    type Input = Identity;
    type Output = Me;

    const ROUTE: &'static str = "auth_me";

    async fn decode(&self, envelope: &Envelope, _body: Body) -> Result<Identity, ApiError> {
        envelope
            .identity()
            .cloned()
            .ok_or_else(|| ApiError::Auth("missing bearer token".to_string()))
    }

    async fn execute(&self, identity: Identity, _envelope: &Envelope) -> Result<Me, ApiError> {
        Ok(Me {
            user_id: identity.user_id,
        })
    }

    fn respond(&self, me: Me) -> Response {
        Json(me).into_response()
    }
}
