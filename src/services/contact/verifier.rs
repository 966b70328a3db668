//! Bot verification of contact submissions.
//!
//! # Design Decisions
//! - Verification is a trait so development and tests can swap in [`NoopVerifier`]
//! - An empty token fails without a network call
//! - Transport failures and explicit rejections are distinct errors, both fatal
//!   to the submission

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::TurnstileConfig;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("missing verification token")]
    MissingToken,

    #[error("verification rejected: {0:?}")]
    Rejected(Vec<String>),

    #[error("verification request failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait BotVerifier: Send + Sync {
    async fn verify(&self, token: &str, remote_ip: &str) -> Result<(), VerifyError>;
}

/// Accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopVerifier;

#[async_trait]
impl BotVerifier for NoopVerifier {
    async fn verify(&self, _token: &str, _remote_ip: &str) -> Result<(), VerifyError> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

/// Cloudflare Turnstile siteverify client.
#[derive(Debug, Clone)]
pub struct TurnstileVerifier {
    client: reqwest::Client,
    secret: String,
    verify_url: String,
}

impl TurnstileVerifier {
    pub fn new(secret: &str, verify_url: &str, timeout: Duration) -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VerifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            secret: secret.to_string(),
            verify_url: verify_url.to_string(),
        })
    }
}

#[async_trait]
impl BotVerifier for TurnstileVerifier {
    async fn verify(&self, token: &str, remote_ip: &str) -> Result<(), VerifyError> {
        if token.is_empty() {
            return Err(VerifyError::MissingToken);
        }

        let mut form = vec![("secret", self.secret.as_str()), ("response", token)];
        if !remote_ip.is_empty() {
            form.push(("remoteip", remote_ip));
        }

        let response = self
            .client
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        let verdict: SiteVerifyResponse = response
            .json()
            .await
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        if verdict.success {
            Ok(())
        } else {
            Err(VerifyError::Rejected(verdict.error_codes))
        }
    }
}

/// Build the verifier the configuration asks for.
pub fn from_config(config: &TurnstileConfig) -> Result<Arc<dyn BotVerifier>, VerifyError> {
    if config.disabled {
        tracing::warn!("Turnstile verification disabled");
        return Ok(Arc::new(NoopVerifier));
    }
    Ok(Arc::new(TurnstileVerifier::new(
        &config.secret,
        &config.verify_url,
        Duration::from_secs(config.timeout_secs),
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Form, Json, Router};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    /// Siteverify stand-in: accepts only the token "good" with secret "s3cret",
    /// and echoes whether remoteip was sent via the error codes.
    async fn start_siteverify() -> String {
        async fn verify(Form(form): Form<HashMap<String, String>>) -> Json<serde_json::Value> {
            let ok = form.get("secret").map(String::as_str) == Some("s3cret")
                && form.get("response").map(String::as_str) == Some("good");
            let ip = if form.contains_key("remoteip") { "ip-sent" } else { "no-ip" };
            Json(serde_json::json!({ "success": ok, "error-codes": [ip] }))
        }
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().route("/siteverify", post(verify)))
                .await
                .unwrap();
        });
        format!("http://{addr}/siteverify")
    }

    #[tokio::test]
    async fn accepts_and_rejects_per_siteverify() {
        let url = start_siteverify().await;
        let verifier = TurnstileVerifier::new("s3cret", &url, Duration::from_secs(2)).unwrap();

        verifier.verify("good", "1.2.3.4").await.unwrap();

        match verifier.verify("bad", "").await {
            Err(VerifyError::Rejected(codes)) => assert_eq!(codes, vec!["no-ip".to_string()]),
            other => panic!("expected rejection, got {other:?}"),
        }
        match verifier.verify("bad", "1.2.3.4").await {
            Err(VerifyError::Rejected(codes)) => assert_eq!(codes, vec!["ip-sent".to_string()]),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_token_fails_without_network() {
        let verifier =
            TurnstileVerifier::new("s", "http://127.0.0.1:1/none", Duration::from_secs(1)).unwrap();
        assert!(matches!(verifier.verify("", "").await, Err(VerifyError::MissingToken)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let verifier =
            TurnstileVerifier::new("s", "http://127.0.0.1:1/none", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            verifier.verify("tok", "").await,
            Err(VerifyError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn disabled_config_accepts_everything() {
        let config = TurnstileConfig {
            disabled: true,
            ..TurnstileConfig::default()
        };
        let verifier = from_config(&config).unwrap();
        verifier.verify("", "").await.unwrap();
    }
}
