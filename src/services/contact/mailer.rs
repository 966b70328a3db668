//! Outgoing notification mail.
//!
//! # Design Decisions
//! - Port selects the TLS mode: 465 implicit TLS, 587 STARTTLS, others opportunistic
//! - Every message is multipart: the plain text plus an escaped HTML copy
//! - Recipients are parsed once at startup so a bad address fails fast

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address {0:?}")]
    Address(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("smtp error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl SmtpMailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, MailError> {
        let from = parse_mailbox(&config.from)?;
        let to = config
            .to
            .iter()
            .map(|addr| parse_mailbox(addr))
            .collect::<Result<Vec<_>, _>>()?;

        let host = config.host.as_str();
        let builder = match config.port {
            465 => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            587 => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            _ => {
                let tls = TlsParameters::new(host.to_string())
                    .map_err(|e| MailError::Transport(e.to_string()))?;
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                    .tls(Tls::Opportunistic(tls))
            }
        };

        let mut builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        tracing::info!(host = %config.host, port = config.port, recipients = to.len(), "SMTP mailer configured");
        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|_| MailError::Address(address.to_string()))
}

#[async_trait]
impl EmailSender for SmtpMailer {
    async fn send(&self, subject: &str, body: &str) -> Result<(), MailError> {
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        let message = builder
            .multipart(MultiPart::alternative_plain_html(
                body.to_string(),
                render_html(body),
            ))
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// HTML alternative of a plain-text body.
pub fn render_html(body: &str) -> String {
    format!(
        r#"<pre style="font-family:sans-serif;white-space:pre-wrap">{}</pre>"#,
        escape_html(body)
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
