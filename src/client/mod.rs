//! Backend RPC clients.
//!
//! # Data Flow
//! ```text
//! Handler
//!     → auth.rs / contact.rs (typed operation, per-operation deadline ceiling)
//!     → connection.rs (shared channel, backoff connector, deadline enforcement)
//!     → error.rs (tonic::Status → CallError)
//! ```

pub mod auth;
pub mod connection;
pub mod contact;
pub mod error;

pub use auth::AuthClient;
pub use connection::{BackendConnection, ConnectionState};
pub use contact::ContactClient;
pub use error::{CallError, ConnectError};
