//! REST surface of the auth service.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::http::{request::read_json, ApiError};
use crate::services::auth::service::AuthService;
use crate::services::auth::types::{LoginInput, RegisterInput};

#[derive(Clone)]
struct AuthState {
    service: Arc<AuthService>,
    body_limit: usize,
}

pub fn router(service: Arc<AuthService>, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .with_state(AuthState {
            service,
            body_limit,
        })
}

async fn root() -> &'static str {
    "auth service"
}

async fn register(
    State(state): State<AuthState>,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let input: RegisterInput = read_json(body, state.body_limit).await?;
    let profile = state.service.register(input).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn login(State(state): State<AuthState>, body: Body) -> Result<impl IntoResponse, ApiError> {
    let input: LoginInput = read_json(body, state.body_limit).await?;
    let session = state.service.login(&input.email, &input.password).await?;
    Ok(Json(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::TokenKeys;
    use crate::services::auth::store::MemoryUserStore;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> Router {
        let service = Arc::new(AuthService::new(
            Arc::new(MemoryUserStore::new()),
            TokenKeys::new("s", Duration::from_secs(60)),
        ));
        router(service, 1024)
    }

    fn post_json(path: &str, body: &str) -> Request<Body> {
        Request::post(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn register_conflict_and_login() {
        let app = app();
        let body = r#"{"email":"ada@example.com","password":"secret1","fullname":"Ada"}"#;

        let response = app.clone().oneshot(post_json("/auth/register", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app.clone().oneshot(post_json("/auth/register", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .clone()
            .oneshot(post_json(
                "/auth/login",
                r#"{"email":"ada@example.com","password":"secret1"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["user"]["email"], "ada@example.com");
        assert!(json["token"].as_str().is_some());
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let response = app().oneshot(post_json("/auth/register", "{nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
