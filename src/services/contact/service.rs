//! Contact submission pipeline.
//!
//! # Data Flow
//! ```text
//! submission
//!     → trim + length checks
//!     → bot verification (token, remote IP)
//!     → persist record
//!     → notify by mail (best effort, never fails the submission)
//! ```

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::http::ApiError;
use crate::services::contact::mailer::{EmailSender, MailError};
use crate::services::contact::store::ContactStore;
use crate::services::contact::types::{validate_fields, ContactRecord, ContactSubmission};
use crate::services::contact::verifier::{BotVerifier, VerifyError};
use crate::services::store::StoreError;

pub const TEST_MAIL_SUBJECT: &str = "[Contact][DEV] test";
pub const TEST_MAIL_BODY: &str = "This is a test email.";

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("{0}")]
    Invalid(String),

    #[error("verification failed: {0}")]
    Verification(#[from] VerifyError),

    #[error("storage failed: {0}")]
    Storage(#[from] StoreError),

    #[error("emailer disabled")]
    MailDisabled,

    #[error("mail failed: {0}")]
    Mail(#[from] MailError),
}

impl ContactError {
    pub fn status(&self) -> StatusCode {
        match self {
            ContactError::Invalid(_)
            | ContactError::Verification(_)
            | ContactError::MailDisabled => StatusCode::BAD_REQUEST,
            ContactError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ContactError::Mail(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<ContactError> for tonic::Status {
    fn from(err: ContactError) -> Self {
        match err {
            ContactError::Invalid(msg) => tonic::Status::invalid_argument(msg),
            ContactError::Verification(e) => {
                tracing::info!(error = %e, "Contact verification failed");
                tonic::Status::permission_denied("turnstile verification failed")
            }
            other => {
                tracing::error!(error = %other, "Contact submission failed");
                tonic::Status::internal("internal error")
            }
        }
    }
}

impl From<ContactError> for ApiError {
    fn from(err: ContactError) -> Self {
        match err {
            ContactError::Invalid(msg) => ApiError::Validation(msg),
            ContactError::Verification(e) => {
                tracing::info!(error = %e, "Contact verification failed");
                ApiError::Verification("turnstile verification failed".to_string())
            }
            ContactError::MailDisabled => ApiError::Validation("emailer disabled".to_string()),
            ContactError::Mail(e) => {
                tracing::warn!(error = %e, "Test mail failed");
                ApiError::UpstreamUnavailable("send failed".to_string())
            }
            ContactError::Storage(e) => {
                tracing::error!(error = %e, "Contact storage failed");
                ApiError::Internal("internal error".to_string())
            }
        }
    }
}

pub struct ContactService {
    store: Arc<dyn ContactStore>,
    verifier: Arc<dyn BotVerifier>,
    mailer: Option<Arc<dyn EmailSender>>,
}

impl ContactService {
    pub fn new(
        store: Arc<dyn ContactStore>,
        verifier: Arc<dyn BotVerifier>,
        mailer: Option<Arc<dyn EmailSender>>,
    ) -> Self {
        if mailer.is_none() {
            tracing::warn!("SMTP not configured; contact notifications disabled");
        }
        Self {
            store,
            verifier,
            mailer,
        }
    }

    /// Validate, verify, persist and notify. Returns the stored record.
    pub async fn submit(&self, submission: ContactSubmission) -> Result<ContactRecord, ContactError> {
        let submission = submission.trimmed();
        validate_fields(&submission.name, &submission.email, &submission.message)
            .map_err(ContactError::Invalid)?;

        self.verifier
            .verify(&submission.turnstile_token, &submission.remote_ip)
            .await?;

        let record = ContactRecord {
            id: ObjectId::new().to_hex(),
            name: submission.name,
            email: submission.email,
            message: submission.message,
            created_at: Utc::now(),
        };
        self.store.insert_one(&record).await?;
        tracing::info!(contact_id = %record.id, "Contact message stored");

        self.notify(&record).await;
        Ok(record)
    }

    async fn notify(&self, record: &ContactRecord) {
        let Some(mailer) = &self.mailer else {
            return;
        };
        let subject = format!("[Contact] {}", record.name);
        let body = notification_body(record);
        if let Err(e) = mailer.send(&subject, &body).await {
            tracing::warn!(contact_id = %record.id, error = %e, "Contact notification failed");
        }
    }

    /// Send a fixed test message through the configured mailer.
    pub async fn send_test_mail(&self) -> Result<(), ContactError> {
        let mailer = self.mailer.as_ref().ok_or(ContactError::MailDisabled)?;
        mailer.send(TEST_MAIL_SUBJECT, TEST_MAIL_BODY).await?;
        Ok(())
    }
}

/// Plain-text notification for a stored message.
pub fn notification_body(record: &ContactRecord) -> String {
    format!(
        "New contact message:\r\nName: {}\r\nEmail: {}\r\nMessage:\r\n{}\r\nTime: {}\r\n",
        record.name,
        record.email,
        record.message,
        format_time(record.created_at)
    )
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
