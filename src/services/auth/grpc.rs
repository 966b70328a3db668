//! gRPC surface of the auth service.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::proto::auth::{
    user_service_server::{UserService, UserServiceServer},
    LoginRequest, LoginResponse, UserResponse,
};
use crate::services::auth::service::AuthService;

pub struct UserRpc {
    service: Arc<AuthService>,
}

impl UserRpc {
    pub fn new(service: Arc<AuthService>) -> Self {
        Self { service }
    }

    pub fn into_server(self) -> UserServiceServer<Self> {
        UserServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl UserService for UserRpc {
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let LoginRequest { email, password } = request.into_inner();
        let session = self.service.login(&email, &password).await?;

        Ok(Response::new(LoginResponse {
            token: session.token,
            user: Some(UserResponse {
                id: session.user.id,
                email: session.user.email,
                fullname: session.user.fullname,
                role: session.user.role,
            }),
        }))
    }
}
