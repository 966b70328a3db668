//! Reverse-proxy forwarding for routes the gateway does not interpret.

pub mod forwarder;

pub use forwarder::{ForwardError, Forwarder};
