//! Typed client for the contact service.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::client::connection::BackendConnection;
use crate::client::error::CallError;
use crate::proto::contact::{contact_service_client::ContactServiceClient, ContactRequest};
use crate::resilience::capped_deadline;
use crate::services::contact::types::ContactSubmission;

#[derive(Debug, Clone)]
pub struct ContactClient {
    connection: Arc<BackendConnection>,
    submit_ceiling: Duration,
}

impl ContactClient {
    pub fn new(connection: Arc<BackendConnection>, submit_ceiling: Duration) -> Self {
        Self {
            connection,
            submit_ceiling,
        }
    }

    /// Submit a contact message; returns the backend's status string.
    pub async fn submit(
        &self,
        submission: ContactSubmission,
        inbound_deadline: Option<Instant>,
    ) -> Result<String, CallError> {
        let deadline = capped_deadline(inbound_deadline, self.submit_ceiling);
        let request = ContactRequest {
            name: submission.name,
            email: submission.email,
            message: submission.message,
            turnstile_token: submission.turnstile_token,
            remote_ip: submission.remote_ip,
        };

        let response = self
            .connection
            .call("contact_submit", deadline, |channel, budget| async move {
                let mut request = tonic::Request::new(request);
                request.set_timeout(budget);
                ContactServiceClient::new(channel).submit(request).await
            })
            .await?;

        Ok(response.status)
    }
}
