//! Configuration loading: defaults, then an optional TOML file, then the
//! process environment.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::schema::{
    AuthServiceConfig, ContactServiceConfig, GatewayConfig, ObservabilityConfig, StoreConfig,
    StoreKind,
};
use crate::config::validation::{Validate, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for {key}")]
    InvalidEnv { key: String, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lookup of environment-style variables.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment. Empty values count as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty()).cloned()
    }
}

/// Configs that can be overlaid with environment variables.
pub trait EnvOverrides {
    fn apply_env_overrides(&mut self, env: &dyn EnvSource) -> Result<(), ConfigError>;
}

/// Load, overlay and validate a configuration.
///
/// `path` is optional: without it the defaults are the base layer.
pub fn load_config<T>(path: Option<&Path>, env: &dyn EnvSource) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default + EnvOverrides + Validate,
{
    let mut config: T = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            toml::from_str(&content)?
        }
        None => T::default(),
    };

    config.apply_env_overrides(env)?;
    config.validate().map_err(ConfigError::Validation)?;

    Ok(config)
}

fn env_string(env: &dyn EnvSource, key: &str) -> Option<String> {
    env.var(key).map(|v| v.trim().to_string())
}

fn env_parse<T: std::str::FromStr>(env: &dyn EnvSource, key: &str) -> Result<Option<T>, ConfigError> {
    match env.var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                key: key.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

fn env_bool(env: &dyn EnvSource, key: &str) -> Result<Option<bool>, ConfigError> {
    match env.var(key) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "t" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "f" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnv {
                key: key.to_string(),
                value,
            }),
        },
        None => Ok(None),
    }
}

fn env_list(env: &dyn EnvSource, key: &str) -> Option<Vec<String>> {
    env.var(key).map(|v| {
        v.split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
}

macro_rules! apply_override {
    ($target:expr, $env:expr, $key:literal, string) => {
        if let Some(val) = env_string($env, $key) {
            $target = val;
        }
    };
    ($target:expr, $env:expr, $key:literal, list) => {
        if let Some(val) = env_list($env, $key) {
            $target = val;
        }
    };
    ($target:expr, $env:expr, $key:literal, bool) => {
        if let Some(val) = env_bool($env, $key)? {
            $target = val;
        }
    };
    ($target:expr, $env:expr, $key:literal, parse) => {
        if let Some(val) = env_parse($env, $key)? {
            $target = val;
        }
    };
}

fn apply_observability(
    config: &mut ObservabilityConfig,
    env: &dyn EnvSource,
) -> Result<(), ConfigError> {
    apply_override!(config.log_level, env, "LOG_LEVEL", string);
    apply_override!(config.json_logs, env, "LOG_JSON", bool);
    apply_override!(config.metrics_enabled, env, "METRICS_ENABLED", bool);
    apply_override!(config.metrics_address, env, "METRICS_ADDR", string);
    Ok(())
}

fn apply_store(config: &mut StoreConfig, env: &dyn EnvSource) -> Result<(), ConfigError> {
    if let Some(uri) = env_string(env, "MONGODB_URI") {
        config.mongodb_uri = Some(uri);
    }
    apply_override!(config.database, env, "MONGODB_DATABASE", string);
    if let Some(kind) = env_string(env, "STORE_BACKEND") {
        config.kind = match kind.to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => StoreKind::Mongo,
            "memory" => StoreKind::Memory,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    key: "STORE_BACKEND".to_string(),
                    value: kind,
                })
            }
        };
    }
    Ok(())
}

impl EnvOverrides for GatewayConfig {
    fn apply_env_overrides(&mut self, env: &dyn EnvSource) -> Result<(), ConfigError> {
        apply_override!(self.listener.port, env, "GATEWAY_PORT", parse);
        apply_override!(self.backends.auth_grpc.address, env, "AUTH_GRPC_ADDR", string);
        apply_override!(self.backends.auth_http_base, env, "AUTH_HTTP_BASE", string);
        apply_override!(self.backends.contact_grpc.address, env, "CONTACT_GRPC_ADDR", string);
        apply_override!(
            self.backends.auth_grpc.connect.wait_for_ready,
            env,
            "AUTH_GRPC_WAIT_FOR_READY",
            bool
        );
        apply_override!(
            self.backends.contact_grpc.connect.wait_for_ready,
            env,
            "CONTACT_GRPC_WAIT_FOR_READY",
            bool
        );
        apply_override!(self.jwt.secret, env, "JWT_SECRET_KEY", string);
        apply_override!(self.timeouts.request_secs, env, "REQUEST_TIMEOUT_SECS", parse);
        apply_override!(self.timeouts.shutdown_grace_secs, env, "SHUTDOWN_GRACE_SECS", parse);
        apply_override!(self.cors.allowed_origins, env, "CORS_ALLOWED_ORIGINS", list);
        apply_observability(&mut self.observability, env)
    }
}

impl EnvOverrides for AuthServiceConfig {
    fn apply_env_overrides(&mut self, env: &dyn EnvSource) -> Result<(), ConfigError> {
        apply_override!(self.listener.port, env, "SERVER_PORT", parse);
        apply_override!(self.grpc.port, env, "GRPC_PORT", parse);
        apply_override!(self.jwt.secret, env, "JWT_SECRET_KEY", string);
        apply_override!(self.jwt.token_ttl_secs, env, "TOKEN_TTL_SECS", parse);
        apply_override!(self.shutdown_grace_secs, env, "SHUTDOWN_GRACE_SECS", parse);
        apply_store(&mut self.store, env)?;
        apply_observability(&mut self.observability, env)
    }
}

impl EnvOverrides for ContactServiceConfig {
    fn apply_env_overrides(&mut self, env: &dyn EnvSource) -> Result<(), ConfigError> {
        apply_override!(self.listener.port, env, "SERVER_PORT", parse);
        apply_override!(self.grpc.port, env, "GRPC_PORT", parse);
        apply_override!(self.turnstile.secret, env, "TURNSTILE_SECRET", string);
        apply_override!(self.turnstile.disabled, env, "TURNSTILE_DISABLE", bool);
        apply_override!(self.turnstile.verify_url, env, "TURNSTILE_VERIFY_URL", string);
        apply_override!(self.smtp.host, env, "SMTP_HOST", string);
        apply_override!(self.smtp.port, env, "SMTP_PORT", parse);
        apply_override!(self.smtp.username, env, "SMTP_USER", string);
        apply_override!(self.smtp.password, env, "SMTP_PASSWORD", string);
        apply_override!(self.smtp.from, env, "FROM_EMAIL", string);
        apply_override!(self.smtp.to, env, "NOTIFY_EMAIL", list);
        apply_override!(self.shutdown_grace_secs, env, "SHUTDOWN_GRACE_SECS", parse);
        apply_store(&mut self.store, env)?;
        apply_observability(&mut self.observability, env)
    }
}
