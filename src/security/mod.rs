//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (static allow-list, gateway only)
//!     → bearer.rs (protected routes: verify token, attach identity)
//!     → headers.rs (resolve client IP for downstream calls)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a missing or bad token is always 401
//! - Handlers read identity from request extensions, never from the token
//! - Proxy headers are trusted in a fixed precedence order

pub mod bearer;
pub mod cors;
pub mod headers;
pub mod token;

pub use bearer::{identity, require_bearer, Identity};
pub use headers::client_ip;
pub use token::{Claims, TokenError, TokenKeys};
