//! gRPC surface of the contact service.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::proto::contact::{
    contact_service_server::{ContactService as ContactRpcService, ContactServiceServer},
    ContactRequest, ContactResponse,
};
use crate::services::contact::service::ContactService;
use crate::services::contact::types::ContactSubmission;

pub const STATUS_OK: &str = "ok";

pub struct ContactRpc {
    service: Arc<ContactService>,
}

impl ContactRpc {
    pub fn new(service: Arc<ContactService>) -> Self {
        Self { service }
    }

    pub fn into_server(self) -> ContactServiceServer<Self> {
        ContactServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl ContactRpcService for ContactRpc {
    async fn submit(
        &self,
        request: Request<ContactRequest>,
    ) -> Result<Response<ContactResponse>, Status> {
        let ContactRequest {
            name,
            email,
            message,
            turnstile_token,
            remote_ip,
        } = request.into_inner();

        self.service
            .submit(ContactSubmission {
                name,
                email,
                message,
                turnstile_token,
                remote_ip,
            })
            .await?;

        Ok(Response::new(ContactResponse {
            status: STATUS_OK.to_string(),
        }))
    }
}
