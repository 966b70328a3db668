//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Downstream call:
//!     → timeouts.rs (cap the call's deadline by the inbound deadline)
//!     → On connect failure: backoff.rs (delay before the next dial)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No request-level retries; only the connection is re-dialed
//! - Backoff state lives with the connection, not the request

pub mod backoff;
pub mod timeouts;

pub use backoff::BackoffPolicy;
pub use timeouts::{capped_deadline, remaining};
