//! Gateway route handlers.

pub mod auth;
pub mod contact;

pub use auth::{LoginHandler, MeHandler, RegisterHandler};
pub use contact::ContactHandler;

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "ok"
}
