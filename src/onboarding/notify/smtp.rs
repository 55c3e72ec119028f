use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailTransport, RegistrationMail, TransportError};
use crate::onboarding::config::MailerConfig;

/// Per-attempt transport timeout; exceeding it counts as a transient
/// failure and is subject to the dispatcher's retry budget.
const SEND_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// SMTP transport over STARTTLS, backed by `lettre`.
///
/// Connects, authenticates, and hands off one message per
/// [`send`](MailTransport::send) call, classifying SMTP failures into the
/// dispatcher's fatal/transient taxonomy: authentication replies
/// (530/534/535) and permanent rejections abort the delivery, everything
/// else is left for the retry loop.
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailTransport {
    /// Builds a transport from the mailer configuration.
    ///
    /// Fails with [`TransportError::Config`] when the relay cannot be set up
    /// or the sender identity does not parse as a mailbox.
    pub fn new(mailer: &MailerConfig) -> Result<Self, TransportError> {
        let credentials =
            Credentials::new(mailer.sender_email.clone(), mailer.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&mailer.host)
            .map_err(|e| TransportError::Config(format!("failed to create SMTP relay: {e}")))?
            .port(mailer.port)
            .credentials(credentials)
            .timeout(Some(SEND_TIMEOUT))
            .build();

        let sender: Mailbox = format!("{} <{}>", mailer.sender_name, mailer.sender_email)
            .parse()
            .map_err(|e| TransportError::Config(format!("invalid sender address: {e}")))?;

        Ok(Self { transport, sender })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, mail: &RegistrationMail) -> Result<(), TransportError> {
        let recipient: Mailbox = mail.recipient.parse().map_err(|e| {
            TransportError::RecipientRejected(format!("invalid recipient address: {e}"))
        })?;

        let message = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(&mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.body_html.clone())
            .map_err(|e| TransportError::Config(format!("failed to build message: {e}")))?;

        match self.transport.send(message).await {
            Ok(_) => Ok(()),
            Err(e) => Err(classify_smtp_error(&e)),
        }
    }
}

/// Maps a lettre SMTP error onto the dispatcher's taxonomy.
fn classify_smtp_error(error: &lettre::transport::smtp::Error) -> TransportError {
    if let Some(code) = error.status() {
        // 530/534/535: authentication required / mechanism rejected /
        // credentials invalid.
        if matches!(code.to_string().as_str(), "530" | "534" | "535") {
            return TransportError::Auth(error.to_string());
        }
        if error.is_permanent() {
            return TransportError::RecipientRejected(error.to_string());
        }
    }
    // Connection failures, timeouts, TLS problems, transient replies.
    TransportError::Transient(error.to_string())
}
