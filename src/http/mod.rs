//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, deadline, envelope + client IP)
//!     → handler.rs (decode → validate → execute → respond)
//!     → handlers/ (RPC client or forwarder per route)
//!     → error.rs (every failure mapped to a safe status + message)
//! ```

pub mod error;
pub mod handler;
pub mod handlers;
pub mod request;
pub mod server;

pub use error::ApiError;
pub use handler::{dispatch, RequestHandler};
pub use request::{Envelope, X_REQUEST_ID};
pub use server::{serve, with_common_layers, GatewayBackends, GatewayServer};
