//! Backend services behind the gateway.
//!
//! Each service exposes the same core over gRPC (for the gateway) and REST
//! (for direct callers), and persists to MongoDB or memory.

pub mod auth;
pub mod contact;
pub mod server;
pub mod store;

pub use server::serve_grpc;
pub use store::{connect_mongo, StoreError};
