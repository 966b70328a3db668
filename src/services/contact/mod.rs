//! Contact service: verified contact-form intake with persistence and mail.

pub mod grpc;
pub mod http;
pub mod mailer;
pub mod service;
pub mod store;
pub mod types;
pub mod verifier;

pub use grpc::ContactRpc;
pub use mailer::{EmailSender, MailError, SmtpMailer};
pub use service::{ContactError, ContactService};
pub use store::{ContactStore, MemoryContactStore, MongoContactStore};
pub use types::{ContactRecord, ContactSubmission};
pub use verifier::{BotVerifier, NoopVerifier, TurnstileVerifier, VerifyError};
