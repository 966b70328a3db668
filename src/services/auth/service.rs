//! Account registration and credential verification.
//!
//! # Responsibilities
//! - Normalize and validate registration input
//! - Hash passwords and persist new users
//! - Verify credentials and issue signed session tokens
//!
//! # Design Decisions
//! - Unknown email and wrong password produce the same error
//! - Email addresses are trimmed and lowercased before storage and lookup
//! - Argon2 work runs on the blocking pool, off the async worker threads

use std::sync::Arc;

use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::http::ApiError;
use crate::security::TokenKeys;
use crate::services::auth::password::{hash_password, verify_password};
use crate::services::auth::store::UserStore;
use crate::services::auth::types::{RegisterInput, Session, User, UserProfile, DEFAULT_ROLE};
use crate::services::store::StoreError;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Invalid(String),

    #[error("email already registered")]
    EmailTaken,

    #[error("internal: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AuthError::EmailTaken,
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for tonic::Status {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => tonic::Status::unauthenticated("invalid credentials"),
            AuthError::Invalid(msg) => tonic::Status::invalid_argument(msg),
            AuthError::EmailTaken => tonic::Status::already_exists("email already registered"),
            AuthError::Internal(msg) => {
                tracing::error!(error = %msg, "Auth operation failed");
                tonic::Status::internal("internal error")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Auth("invalid credentials".to_string()),
            AuthError::Invalid(msg) => ApiError::Validation(msg),
            AuthError::EmailTaken => ApiError::Conflict("email already registered".to_string()),
            AuthError::Internal(msg) => {
                tracing::error!(error = %msg, "Auth operation failed");
                ApiError::Internal("internal error".to_string())
            }
        }
    }
}

pub struct AuthService {
    store: Arc<dyn UserStore>,
    tokens: TokenKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, tokens: TokenKeys) -> Self {
        Self { store, tokens }
    }

    pub fn tokens(&self) -> &TokenKeys {
        &self.tokens
    }

    /// Create an account and return its public profile.
    pub async fn register(&self, input: RegisterInput) -> Result<UserProfile, AuthError> {
        let email = normalize_email(&input.email);
        let fullname = input.fullname.trim().to_string();

        if !email.contains('@') || email.len() < 3 {
            return Err(AuthError::Invalid("invalid email".to_string()));
        }
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Invalid(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if fullname.is_empty() {
            return Err(AuthError::Invalid("fullname is required".to_string()));
        }

        let password = input.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let user = User {
            id: ObjectId::new().to_hex(),
            email,
            fullname,
            role: DEFAULT_ROLE.to_string(),
            password_hash,
            created_at: Utc::now(),
        };
        self.store.insert(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user.profile())
    }

    /// Verify credentials and issue a session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let candidate = password.to_string();
        let stored = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&candidate, &stored))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !matches {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(&user.id)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(Session {
            token,
            user: user.profile(),
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
