//! Typed client for the auth service.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::client::connection::BackendConnection;
use crate::client::error::CallError;
use crate::proto::auth::{user_service_client::UserServiceClient, LoginRequest};
use crate::resilience::capped_deadline;
use crate::services::auth::types::{Session, UserProfile};

#[derive(Debug, Clone)]
pub struct AuthClient {
    connection: Arc<BackendConnection>,
    login_ceiling: Duration,
}

impl AuthClient {
    pub fn new(connection: Arc<BackendConnection>, login_ceiling: Duration) -> Self {
        Self {
            connection,
            login_ceiling,
        }
    }

    /// Exchange credentials for a session token.
    pub async fn login(
        &self,
        email: String,
        password: String,
        inbound_deadline: Option<Instant>,
    ) -> Result<Session, CallError> {
        let deadline = capped_deadline(inbound_deadline, self.login_ceiling);
        let response = self
            .connection
            .call("login", deadline, |channel, budget| async move {
                let mut request = tonic::Request::new(LoginRequest { email, password });
                request.set_timeout(budget);
                UserServiceClient::new(channel).login(request).await
            })
            .await?;

        let user = response
            .user
            .ok_or_else(|| CallError::Internal("login response without user".to_string()))?;

        Ok(Session {
            token: response.token,
            user: UserProfile {
                id: user.id,
                email: user.email,
                fullname: user.fullname,
                role: user.role,
            },
        })
    }
}
