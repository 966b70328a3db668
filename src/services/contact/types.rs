//! Contact domain types and field rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_NAME_CHARS: usize = 2;
pub const MIN_EMAIL_CHARS: usize = 5;
pub const MIN_MESSAGE_CHARS: usize = 5;

/// A contact message as it arrives, before verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub message: String,
    pub turnstile_token: String,
    pub remote_ip: String,
}

impl ContactSubmission {
    /// Copy with every field trimmed.
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            message: self.message.trim().to_string(),
            turnstile_token: self.turnstile_token.trim().to_string(),
            remote_ip: self.remote_ip.trim().to_string(),
        }
    }
}

/// A persisted contact message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Minimum-length checks on trimmed fields, counted in characters.
pub fn validate_fields(name: &str, email: &str, message: &str) -> Result<(), String> {
    if name.trim().chars().count() < MIN_NAME_CHARS {
        return Err("name too short".to_string());
    }
    if email.trim().chars().count() < MIN_EMAIL_CHARS {
        return Err("email too short".to_string());
    }
    if message.trim().chars().count() < MIN_MESSAGE_CHARS {
        return Err("message too short".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_are_checked_after_trimming() {
        assert_eq!(validate_fields(" a ", "a@b.c", "hello"), Err("name too short".into()));
        assert_eq!(validate_fields("Al", "a@b ", "hello"), Err("email too short".into()));
        assert_eq!(validate_fields("Al", "a@b.c", "  hi   "), Err("message too short".into()));
        assert!(validate_fields("Al", "a@b.c", "hello").is_ok());
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        // Two characters, six bytes.
        assert!(validate_fields("李明", "a@b.c", "héllo").is_ok());
        assert_eq!(validate_fields("é", "a@b.c", "hello"), Err("name too short".into()));
    }
}
