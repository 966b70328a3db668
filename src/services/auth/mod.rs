//! Auth service: user registration, credential check, token issuance.
//!
//! # Data Flow
//! ```text
//! gRPC Login / REST /auth/*
//!     → service.rs (normalize, validate, hash or verify)
//!     → store.rs (MongoDB `users` or in-memory)
//!     → token issued with the shared HS256 secret
//! ```

pub mod grpc;
pub mod http;
pub mod password;
pub mod service;
pub mod store;
pub mod types;

pub use grpc::UserRpc;
pub use service::{AuthError, AuthService};
pub use store::{MemoryUserStore, MongoUserStore, UserStore};
pub use types::{Session, UserProfile};
