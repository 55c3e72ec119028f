//! Registration token delivery with bounded retries and exponential
//! backoff.
//!
//! The dispatcher treats delivery as fire-and-forget with a boolean verdict:
//! no error ever crosses its boundary. Transport failures are classified by
//! the [`MailTransport`] implementation: authentication and recipient
//! rejections are fatal, everything else is retried until the attempt budget
//! runs out.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::onboarding::config::MailerConfig;

mod smtp;
pub use smtp::SmtpMailTransport;

/// Classified outcome of a single transport-level delivery attempt.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The transport cannot be constructed or fed a message as configured.
    /// Fatal, not retried.
    #[error("transport configuration error: {0}")]
    Config(String),

    /// The transport rejected our credentials. Fatal, not retried.
    #[error("transport authentication failed: {0}")]
    Auth(String),

    /// The destination address was rejected. Fatal, not retried.
    #[error("recipient rejected: {0}")]
    RecipientRejected(String),

    /// Anything else: connection failures, timeouts, transient SMTP replies,
    /// unclassified errors. Retried while attempts remain.
    #[error("transient delivery failure: {0}")]
    Transient(String),
}

impl TransportError {
    /// True for classifications that must not be retried.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TransportError::Transient(_))
    }
}

/// A rendered registration notification ready for transport hand-off.
#[derive(Debug, Clone)]
pub struct RegistrationMail {
    pub recipient: String,
    pub subject: String,
    pub body_html: String,
}

/// Transport-level delivery primitive consumed by the dispatcher.
///
/// Implementations connect, authenticate, and hand off one message per
/// call, mapping their native failures onto [`TransportError`] so the
/// dispatcher can decide between aborting and retrying.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &RegistrationMail) -> Result<(), TransportError>;
}

/// Delivers registration tokens by email with bounded retries.
///
/// Per delivery: validate the mailer configuration, render the message,
/// then attempt transport hand-off up to `max_attempts` times, sleeping
/// `backoff_unit * 2^attempt` between transient failures (attempt counted
/// from 1). Backoff sleeps are plain `tokio` timers, so concurrent
/// deliveries never block one another.
///
/// All failure paths resolve to `false`; the dispatcher never panics or
/// returns an error.
pub struct NotificationDispatcher {
    transport: Arc<dyn MailTransport>,
    mailer: MailerConfig,
    max_attempts: u32,
    backoff_unit: std::time::Duration,
}

impl NotificationDispatcher {
    /// Creates a dispatcher over `transport`.
    pub fn new(
        transport: Arc<dyn MailTransport>,
        mailer: MailerConfig,
        max_attempts: u32,
        backoff_unit: std::time::Duration,
    ) -> Self {
        Self {
            transport,
            mailer,
            max_attempts,
            backoff_unit,
        }
    }

    /// Delivers the registration token to `recipient`.
    ///
    /// Returns `true` on the first successful transport hand-off, `false`
    /// once the attempt budget is exhausted, a fatal classification is hit,
    /// or the mailer configuration is incomplete (checked before any
    /// attempt; a configuration error is not a retriable condition).
    pub async fn deliver(
        &self,
        recipient: &str,
        token_id: &str,
        appointment: DateTime<Utc>,
    ) -> bool {
        let token_prefix = crate::onboarding::lifecycle::token_prefix(token_id);

        let missing = self.mailer.missing_fields();
        if !missing.is_empty() {
            tracing::error!(
                missing = %missing.join(", "),
                "mail configuration incomplete, delivery aborted"
            );
            return false;
        }

        let mail = render_registration_mail(recipient, token_id, appointment);

        for attempt in 1..=self.max_attempts {
            match self.transport.send(&mail).await {
                Ok(()) => {
                    tracing::info!(
                        recipient,
                        token_prefix = %token_prefix,
                        attempt,
                        "registration mail delivered"
                    );
                    return true;
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!(recipient, error = %e, "delivery failed permanently");
                    return false;
                }
                Err(e) => {
                    tracing::warn!(
                        recipient,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "transient delivery failure"
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff_unit * 2u32.pow(attempt)).await;
                    }
                }
            }
        }

        tracing::error!(
            recipient,
            token_prefix = %token_prefix,
            attempts = self.max_attempts,
            "delivery attempts exhausted"
        );
        false
    }
}

/// Renders the registration notification embedding the token and the
/// human-readable appointment instant.
fn render_registration_mail(
    recipient: &str,
    token_id: &str,
    appointment: DateTime<Utc>,
) -> RegistrationMail {
    let formatted = appointment.format("%Y-%m-%d %H:%M UTC");
    let body_html = format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <body style=\"font-family: Arial, sans-serif; padding: 20px;\">\n\
           <p>&lt;TOKEN&gt;<br>{token_id}</p>\n\
           <p>Appointment: {formatted}</p>\n\
         </body>\n\
         </html>"
    );

    RegistrationMail {
        recipient: recipient.to_string(),
        subject: format!("Registration Token - Appointment on {formatted}"),
        body_html,
    }
}

/// Scripted in-memory transport for dispatcher and orchestration tests.
///
/// Pops one pre-programmed outcome per send; once the script is exhausted
/// every further send succeeds. Tracks how many attempts were made.
#[derive(Default)]
pub struct MockMailTransport {
    script: Mutex<VecDeque<Result<(), TransportError>>>,
    attempts: AtomicU32,
}

impl MockMailTransport {
    /// A transport that succeeds on every attempt.
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// A transport that plays back `outcomes` in order, then succeeds.
    pub fn with_script(outcomes: Vec<Result<(), TransportError>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            attempts: AtomicU32::new(0),
        }
    }

    /// Number of send attempts observed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailTransport for MockMailTransport {
    async fn send(&self, _mail: &RegistrationMail) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.script.lock().await.pop_front().unwrap_or(Ok(()))
    }
}
