//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config (already validated) → stores / clients → bind listeners → spawn servers
//!
//! Supervision (supervisor.rs):
//!     Signal or task exit → broadcast shutdown → drain (grace) → closers
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → resolve the shutdown future
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod supervisor;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{
    start_auth_service, start_contact_service, start_gateway, RunningService, StartupError,
};
pub use supervisor::{LifecycleError, Supervisor};
