//! API gateway and backend services for a small web product.
//!
//! Three binaries share this library:
//! - `gateway`: public HTTP entry point, calling the services over gRPC
//!   and relaying registration to the auth service over HTTP
//! - `auth-service`: users, password check, token issuance
//! - `contact-service`: verified contact-form intake with mail notification

// Core subsystems
pub mod client;
pub mod config;
pub mod http;
pub mod proto;
pub mod proxy;
pub mod services;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
