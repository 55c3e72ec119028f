use std::time::Duration;

/// Configuration for the onboarding core.
///
/// Constructed once at process start and handed to each component's
/// constructor; business logic never reads ambient state. The `Default`
/// implementation reads `ONBOARD_AUTH_*` / `SMTP_*` environment variables
/// with conservative fallbacks.
///
/// # Environment Variables
///
/// - `ONBOARD_AUTH_TOKEN_LENGTH`: raw random bytes per token identifier
///   (default: 16)
/// - `ONBOARD_AUTH_CREATE_ATTEMPTS`: insert retry budget on identifier
///   collision (default: 3)
/// - `ONBOARD_AUTH_SIGNING_SECRET`: shared secret for credential signing
/// - `ONBOARD_AUTH_DELIVERY_ATTEMPTS`: mail delivery attempt budget
///   (default: 3)
/// - `ONBOARD_AUTH_DELIVERY_BACKOFF`: backoff unit in seconds (default: 1)
/// - `SMTP_HOST`, `SMTP_PORT`, `SMTP_SENDER`, `SMTP_SENDER_NAME`,
///   `SMTP_PASSWORD`: outbound mail transport
///
/// # Example
///
/// ```rust
/// use onboard_auth::{MailerConfig, OnboardConfig};
/// use std::time::Duration;
///
/// let config = OnboardConfig {
///     token_length: 16,
///     create_attempts: 3,
///     signing_secret: "a-long-shared-secret-for-hs256!!".to_string(),
///     mailer: MailerConfig {
///         host: "smtp.example.org".to_string(),
///         port: 587,
///         sender_email: "noreply@example.org".to_string(),
///         sender_name: "Event Registration".to_string(),
///         password: "app-password".to_string(),
///     },
///     delivery_attempts: 3,
///     delivery_backoff: Duration::from_secs(1),
/// };
/// assert!(config.validate().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct OnboardConfig {
    /// Raw random bytes per token identifier before URL-safe encoding.
    pub token_length: usize,
    /// How many insert attempts `create` makes before reporting exhaustion.
    pub create_attempts: u32,
    /// Shared secret for signing onboarding credentials.
    pub signing_secret: String,
    /// Outbound mail transport settings.
    pub mailer: MailerConfig,
    /// How many delivery attempts the dispatcher makes per notification.
    pub delivery_attempts: u32,
    /// Base unit for exponential backoff between delivery attempts.
    pub delivery_backoff: Duration,
}

impl Default for OnboardConfig {
    fn default() -> Self {
        Self {
            token_length: env_parse("ONBOARD_AUTH_TOKEN_LENGTH", 16),
            create_attempts: env_parse("ONBOARD_AUTH_CREATE_ATTEMPTS", 3),
            signing_secret: std::env::var("ONBOARD_AUTH_SIGNING_SECRET")
                .unwrap_or_else(|_| "secret".to_string()),
            mailer: MailerConfig::default(),
            delivery_attempts: env_parse("ONBOARD_AUTH_DELIVERY_ATTEMPTS", 3),
            delivery_backoff: Duration::from_secs(env_parse("ONBOARD_AUTH_DELIVERY_BACKOFF", 1)),
        }
    }
}

impl OnboardConfig {
    /// Validates the configuration and returns any warnings.
    ///
    /// Warnings flag settings that work but weaken the security or
    /// reliability posture; hard errors are left to the components that
    /// consume each field.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.token_length < 16 {
            warnings.push(
                "Token identifiers shorter than 16 random bytes weaken unguessability"
                    .to_string(),
            );
        }
        if self.create_attempts == 0 {
            warnings.push("A create retry budget of 0 makes every registration fail".to_string());
        }
        if self.signing_secret == "secret" {
            warnings.push("Default signing secret in use; set ONBOARD_AUTH_SIGNING_SECRET".to_string());
        }
        if self.signing_secret.len() < 32 {
            warnings.push(
                "Signing secret shorter than 32 bytes is weak for HMAC-class signing".to_string(),
            );
        }
        if self.delivery_attempts == 0 {
            warnings.push("A delivery budget of 0 disables notification entirely".to_string());
        }
        if !self.mailer.is_complete() {
            warnings.push(format!(
                "Mail transport configuration incomplete, missing: {}",
                self.mailer.missing_fields().join(", ")
            ));
        }

        warnings
    }
}

/// Outbound mail transport settings.
///
/// Validated for completeness by the dispatcher before any send attempt;
/// an incomplete configuration is a non-retried delivery failure.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub host: String,
    pub port: u16,
    pub sender_email: String,
    pub sender_name: String,
    pub password: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("SMTP_HOST").unwrap_or_default(),
            port: env_parse("SMTP_PORT", 587),
            sender_email: std::env::var("SMTP_SENDER").unwrap_or_default(),
            sender_name: std::env::var("SMTP_SENDER_NAME")
                .unwrap_or_else(|_| "Event Registration".to_string()),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
        }
    }
}

impl MailerConfig {
    /// Names of required fields that are currently empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.host.is_empty() {
            missing.push("host");
        }
        if self.port == 0 {
            missing.push("port");
        }
        if self.sender_email.is_empty() {
            missing.push("sender_email");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        missing
    }

    /// True when every field required to reach the transport is present.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(fallback)
}
