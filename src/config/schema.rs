//! Configuration schema definitions.
//!
//! One root struct per binary. All types derive Serde traits for
//! deserialization from TOML files; every field has a default so a missing
//! file (or a partial one) is valid input to the environment overlay.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::backoff::BackoffPolicy;

/// Root configuration for the API gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener.
    pub listener: ListenerConfig,

    /// Downstream services.
    pub backends: BackendsConfig,

    /// Inbound and per-operation timeouts.
    pub timeouts: GatewayTimeouts,

    /// Token verification for protected routes.
    pub jwt: JwtConfig,

    /// CORS allow-list.
    pub cors: CorsConfig,

    /// Request size limits.
    pub security: SecurityConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Root configuration for the auth service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthServiceConfig {
    pub listener: ListenerConfig,
    pub grpc: ListenerConfig,
    pub store: StoreConfig,
    pub jwt: JwtConfig,
    pub shutdown_grace_secs: u64,
    pub observability: ObservabilityConfig,
}

impl Default for AuthServiceConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::with_port(8081),
            grpc: ListenerConfig::with_port(50051),
            store: StoreConfig::with_database("demo_db"),
            jwt: JwtConfig::default(),
            shutdown_grace_secs: 10,
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Root configuration for the contact service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContactServiceConfig {
    pub listener: ListenerConfig,
    pub grpc: ListenerConfig,
    pub store: StoreConfig,
    pub turnstile: TurnstileConfig,
    pub smtp: SmtpConfig,
    pub shutdown_grace_secs: u64,
    pub observability: ObservabilityConfig,
}

impl Default for ContactServiceConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::with_port(8082),
            grpc: ListenerConfig::with_port(50052),
            store: StoreConfig::with_database("contact_db"),
            turnstile: TurnstileConfig::default(),
            smtp: SmtpConfig::default(),
            shutdown_grace_secs: 10,
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port.
    pub port: u16,
}

impl ListenerConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port,
        }
    }

    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::with_port(9090)
    }
}

/// Addresses of every service the gateway talks to.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendsConfig {
    /// Auth service gRPC endpoint.
    pub auth_grpc: RpcBackendConfig,

    /// Auth service REST base URL (register is reverse-proxied).
    pub auth_http_base: String,

    /// Contact service gRPC endpoint.
    pub contact_grpc: RpcBackendConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            auth_grpc: RpcBackendConfig::new("localhost:50051"),
            auth_http_base: "http://localhost:8081".to_string(),
            contact_grpc: RpcBackendConfig::new("localhost:50052"),
        }
    }
}

/// A gRPC backend and the policy used to (re)connect to it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcBackendConfig {
    /// `host:port` or a full `http://host:port` URI.
    pub address: String,

    pub connect: ConnectPolicyConfig,
}

impl RpcBackendConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect: ConnectPolicyConfig::default(),
        }
    }
}

impl Default for RpcBackendConfig {
    fn default() -> Self {
        Self::new("localhost:50051")
    }
}

/// Reconnect backoff and readiness policy for one backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectPolicyConfig {
    /// Delay before the first retry in milliseconds.
    pub base_delay_ms: u64,

    /// Growth factor applied per failed attempt.
    pub multiplier: f64,

    /// Randomization factor in `[0, 1]`.
    pub jitter: f64,

    /// Ceiling for the retry delay in milliseconds.
    pub max_delay_ms: u64,

    /// Lower bound for a single connection attempt in milliseconds.
    pub min_connect_timeout_ms: u64,

    /// Block startup until the first connection succeeds.
    pub wait_for_ready: bool,

    /// Upper bound on the startup wait when `wait_for_ready` is set.
    pub ready_timeout_secs: u64,
}

impl ConnectPolicyConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.multiplier,
            jitter: self.jitter,
            max_delay: Duration::from_millis(self.max_delay_ms),
            min_connect_timeout: Duration::from_millis(self.min_connect_timeout_ms),
        }
    }
}

impl Default for ConnectPolicyConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 200,
            multiplier: 1.6,
            jitter: 0.2,
            max_delay_ms: 3000,
            min_connect_timeout_ms: 2000,
            wait_for_ready: false,
            ready_timeout_secs: 10,
        }
    }
}

/// Timeout configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayTimeouts {
    /// Whole-request budget for inbound HTTP requests in seconds.
    pub request_secs: u64,

    /// Ceiling for the login RPC in seconds.
    pub login_secs: u64,

    /// Ceiling for the contact submission RPC in seconds.
    pub contact_submit_secs: u64,

    /// Ceiling for the reverse-proxied register call in seconds.
    pub register_secs: u64,

    /// Grace period for in-flight requests on shutdown in seconds.
    pub shutdown_grace_secs: u64,
}

impl GatewayTimeouts {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for GatewayTimeouts {
    fn default() -> Self {
        Self {
            request_secs: 30,
            login_secs: 5,
            contact_submit_secs: 8,
            register_secs: 7,
            shutdown_grace_secs: 10,
        }
    }
}

/// Shared signing secret for bearer tokens.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JwtConfig {
    /// HMAC secret; must match between the gateway and the auth service.
    pub secret: String,

    /// Lifetime of issued tokens in seconds.
    pub token_ttl_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl_secs: 24 * 3600,
        }
    }
}

/// Static CORS allow-list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
                "https://holoc.id.vn".to_string(),
            ],
            allowed_methods: vec!["GET".into(), "POST".into(), "OPTIONS".into()],
            allowed_headers: vec![
                "Accept".into(),
                "Authorization".into(),
                "Content-Type".into(),
                "X-CSRF-Token".into(),
            ],
            exposed_headers: vec!["Link".into()],
            allow_credentials: true,
            max_age_secs: 300,
        }
    }
}

/// Request hardening.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9100".to_string(),
        }
    }
}

/// Which document store backs a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Mongo,
    /// In-process store; data is lost on restart.
    Memory,
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub mongodb_uri: Option<String>,
    pub database: String,
}

impl StoreConfig {
    pub fn with_database(database: impl Into<String>) -> Self {
        Self {
            kind: StoreKind::Mongo,
            mongodb_uri: None,
            database: database.into(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::with_database("demo_db")
    }
}

/// Bot verification (Cloudflare Turnstile).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TurnstileConfig {
    pub secret: String,

    /// Skip verification entirely (development).
    pub disabled: bool,

    pub verify_url: String,

    pub timeout_secs: u64,
}

impl Default for TurnstileConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            disabled: false,
            verify_url: "https://challenges.cloudflare.com/turnstile/v0/siteverify".to_string(),
            timeout_secs: 4,
        }
    }
}

/// Outgoing mail relay. Mail is disabled unless host, from and to are set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,

    /// 465 = implicit TLS, 587 = STARTTLS, anything else = opportunistic.
    pub port: u16,

    pub username: String,
    pub password: String,
    pub from: String,
    pub to: Vec<String>,
    pub timeout_secs: u64,
}

impl SmtpConfig {
    pub fn is_enabled(&self) -> bool {
        !self.host.is_empty() && self.port != 0 && !self.from.is_empty() && !self.to.is_empty()
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: String::new(),
            to: Vec::new(),
            timeout_secs: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_defaults_match_deployment() {
        let config = GatewayConfig::default();
        assert_eq!(config.listener.bind_address(), "0.0.0.0:9090");
        assert_eq!(config.backends.auth_grpc.address, "localhost:50051");
        assert_eq!(config.backends.contact_grpc.address, "localhost:50052");
        assert_eq!(config.timeouts.login_secs, 5);
        assert_eq!(config.timeouts.contact_submit_secs, 8);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [listener]
            port = 7000

            [backends.auth_grpc]
            address = "auth:6000"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.port, 7000);
        assert_eq!(config.listener.host, "0.0.0.0");
        assert_eq!(config.backends.auth_grpc.address, "auth:6000");
        assert_eq!(config.backends.auth_grpc.connect.base_delay_ms, 200);
    }

    #[test]
    fn smtp_disabled_without_recipients() {
        let mut smtp = SmtpConfig {
            host: "smtp.example.com".into(),
            from: "noreply@example.com".into(),
            ..SmtpConfig::default()
        };
        assert!(!smtp.is_enabled());
        smtp.to.push("me@example.com".into());
        assert!(smtp.is_enabled());
    }
}
