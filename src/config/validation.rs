//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. Validation is a pure
//! function over the loaded config and reports every problem, not just the
//! first.

use thiserror::Error;
use url::Url;

use crate::config::schema::{
    AuthServiceConfig, ConnectPolicyConfig, ContactServiceConfig, CorsConfig, GatewayConfig,
    ListenerConfig, RpcBackendConfig, StoreConfig, StoreKind,
};

/// A single semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<ValidationError>>;
}

fn finish(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_listener(errors: &mut Vec<ValidationError>, field: &str, listener: &ListenerConfig) {
    if listener.host.trim().is_empty() {
        errors.push(ValidationError::new(format!("{field}.host"), "must not be empty"));
    }
}

fn check_connect_policy(errors: &mut Vec<ValidationError>, field: &str, policy: &ConnectPolicyConfig) {
    if policy.multiplier < 1.0 {
        errors.push(ValidationError::new(
            format!("{field}.multiplier"),
            "must be >= 1.0",
        ));
    }
    if !(0.0..=1.0).contains(&policy.jitter) {
        errors.push(ValidationError::new(
            format!("{field}.jitter"),
            "must be within [0, 1]",
        ));
    }
    if policy.max_delay_ms < policy.base_delay_ms {
        errors.push(ValidationError::new(
            format!("{field}.max_delay_ms"),
            "must be >= base_delay_ms",
        ));
    }
    if policy.wait_for_ready && policy.ready_timeout_secs == 0 {
        errors.push(ValidationError::new(
            format!("{field}.ready_timeout_secs"),
            "must be > 0 when wait_for_ready is set",
        ));
    }
}

fn check_rpc_backend(errors: &mut Vec<ValidationError>, field: &str, backend: &RpcBackendConfig) {
    if backend.address.trim().is_empty() {
        errors.push(ValidationError::new(format!("{field}.address"), "is required"));
    }
    check_connect_policy(errors, &format!("{field}.connect"), &backend.connect);
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::new(field, "must be > 0"));
    }
}

fn check_store(errors: &mut Vec<ValidationError>, store: &StoreConfig) {
    if store.kind == StoreKind::Mongo
        && store.mongodb_uri.as_deref().map_or(true, |uri| uri.trim().is_empty())
    {
        errors.push(ValidationError::new(
            "store.mongodb_uri",
            "is required when the mongo store is selected (MONGODB_URI)",
        ));
    }
    if store.database.trim().is_empty() {
        errors.push(ValidationError::new("store.database", "must not be empty"));
    }
}

/// CORS entries are explicit allow-lists; the `*` wildcard is not accepted.
fn check_cors(errors: &mut Vec<ValidationError>, cors: &CorsConfig) {
    let lists = [
        ("cors.allowed_origins", &cors.allowed_origins),
        ("cors.allowed_methods", &cors.allowed_methods),
        ("cors.allowed_headers", &cors.allowed_headers),
        ("cors.exposed_headers", &cors.exposed_headers),
    ];
    for (field, entries) in lists {
        if entries.iter().any(|entry| entry.trim() == "*") {
            errors.push(ValidationError::new(
                field,
                "wildcard \"*\" is not supported; list values explicitly",
            ));
        }
    }
}

impl Validate for GatewayConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        check_listener(&mut errors, "listener", &self.listener);
        check_rpc_backend(&mut errors, "backends.auth_grpc", &self.backends.auth_grpc);
        check_rpc_backend(&mut errors, "backends.contact_grpc", &self.backends.contact_grpc);

        match Url::parse(&self.backends.auth_http_base) {
            Ok(url) if url.scheme() == "http" => {}
            Ok(_) => errors.push(ValidationError::new(
                "backends.auth_http_base",
                "scheme must be http",
            )),
            Err(e) => errors.push(ValidationError::new(
                "backends.auth_http_base",
                format!("invalid URL: {e}"),
            )),
        }

        check_positive(&mut errors, "timeouts.request_secs", self.timeouts.request_secs);
        check_positive(&mut errors, "timeouts.login_secs", self.timeouts.login_secs);
        check_positive(
            &mut errors,
            "timeouts.contact_submit_secs",
            self.timeouts.contact_submit_secs,
        );
        check_positive(&mut errors, "timeouts.register_secs", self.timeouts.register_secs);

        if self.jwt.secret.is_empty() {
            errors.push(ValidationError::new("jwt.secret", "is required (JWT_SECRET_KEY)"));
        }
        if self.security.max_body_size == 0 {
            errors.push(ValidationError::new("security.max_body_size", "must be > 0"));
        }
        check_cors(&mut errors, &self.cors);

        finish(errors)
    }
}

impl Validate for AuthServiceConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        check_listener(&mut errors, "listener", &self.listener);
        check_listener(&mut errors, "grpc", &self.grpc);
        check_store(&mut errors, &self.store);

        if self.jwt.secret.is_empty() {
            errors.push(ValidationError::new("jwt.secret", "is required (JWT_SECRET_KEY)"));
        }
        check_positive(&mut errors, "jwt.token_ttl_secs", self.jwt.token_ttl_secs);

        finish(errors)
    }
}

impl Validate for ContactServiceConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        check_listener(&mut errors, "listener", &self.listener);
        check_listener(&mut errors, "grpc", &self.grpc);
        check_store(&mut errors, &self.store);

        if !self.turnstile.disabled {
            if self.turnstile.secret.is_empty() {
                errors.push(ValidationError::new(
                    "turnstile.secret",
                    "is required unless verification is disabled (TURNSTILE_SECRET)",
                ));
            }
            if Url::parse(&self.turnstile.verify_url).is_err() {
                errors.push(ValidationError::new("turnstile.verify_url", "invalid URL"));
            }
        }
        check_positive(&mut errors, "turnstile.timeout_secs", self.turnstile.timeout_secs);

        finish(errors)
    }
}
