//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → environment overlay (loader.rs, original variable names)
//!     → validation.rs (semantic checks, all errors at once)
//!     → immutable config handed to startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; backends are fixed for the process lifetime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, EnvSource, ProcessEnv};
pub use schema::{
    AuthServiceConfig, BackendsConfig, ConnectPolicyConfig, ContactServiceConfig, CorsConfig,
    GatewayConfig, JwtConfig, ListenerConfig, ObservabilityConfig, RpcBackendConfig, SmtpConfig,
    StoreConfig, StoreKind, TurnstileConfig,
};
