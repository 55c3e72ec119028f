//! # Onboard Auth
//!
//! Single-use registration tokens and time-bounded onboarding credentials
//! for patient-monitoring events.
//!
//! A registration mints one cryptographically random, URL-safe token tied
//! to a monitoring event and delivers it to the patient by email with
//! bounded retries. Onboarding later exchanges that token, exactly once
//! even under concurrent attempts, for a signed credential whose validity
//! window is the event's own monitoring window.
//!
//! ## Guarantees
//!
//! - **Unguessable identifiers**: tokens are fixed-length values from a
//!   cryptographically secure random source, encoded URL-safe.
//! - **Collision-safe creation**: the store's atomic insert-if-absent is the
//!   single uniqueness authority; collisions retry with a fresh identifier
//!   up to a bounded budget.
//! - **Exactly-once consumption**: the `PENDING -> DONE` transition is a
//!   compare-and-set re-asserted at write time, so N racing onboarding
//!   attempts yield exactly one success.
//! - **Bounded best-effort delivery**: mail dispatch retries transient
//!   failures with exponential backoff and always resolves to a boolean
//!   verdict.
//!
//! ## Quick Start
//!
//! ```rust
//! use onboard_auth::{
//!     CredentialIssuer, InMemoryEventProvider, MailerConfig, MemoryTokenStore,
//!     MockMailTransport, NotificationDispatcher, OnboardConfig, OnboardingService,
//!     RegistrationRequest, TokenGenerator, TokenLifecycle,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), onboard_auth::OnboardError> {
//! let config = OnboardConfig {
//!     signing_secret: "a-long-shared-secret-for-hs256!!".to_string(),
//!     mailer: MailerConfig {
//!         host: "smtp.example.org".to_string(),
//!         port: 587,
//!         sender_email: "noreply@example.org".to_string(),
//!         sender_name: "Event Registration".to_string(),
//!         password: "app-password".to_string(),
//!     },
//!     ..OnboardConfig::default()
//! };
//!
//! let lifecycle = Arc::new(TokenLifecycle::new(
//!     Arc::new(MemoryTokenStore::new()),
//!     TokenGenerator::new(config.token_length),
//!     config.create_attempts,
//! ));
//! let dispatcher = Arc::new(NotificationDispatcher::new(
//!     Arc::new(MockMailTransport::succeeding()),
//!     config.mailer.clone(),
//!     config.delivery_attempts,
//!     config.delivery_backoff,
//! ));
//! let service = OnboardingService::new(
//!     Arc::new(InMemoryEventProvider::new()),
//!     lifecycle,
//!     CredentialIssuer::new(config.signing_secret.as_bytes()),
//!     dispatcher,
//! );
//!
//! // Registration: event + token + notification.
//! let token_id = service
//!     .register_event(RegistrationRequest {
//!         patient_id: "patient-7".to_string(),
//!         patient_email: "patient@example.org".to_string(),
//!         start_time: "2025-06-01T08:00:00Z".to_string(),
//!         duration_secs: "3600".to_string(),
//!         appointment_time: "2025-05-28T09:30:00Z".to_string(),
//!     })
//!     .await?;
//!
//! // Onboarding: the token is consumed exactly once.
//! let credential = service.onboard_with_token(&token_id).await?;
//! assert!(service.onboard_with_token(&token_id).await.is_err());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Three pluggable seams keep the core free of web, database, and SMTP
//! plumbing:
//!
//! - **[`TokenStore`]**: insert-if-absent, point read, conditioned status
//!   update. [`MemoryTokenStore`] ships in-crate; database adapters live
//!   with integrators.
//! - **[`EventProvider`]**: the external system owning event records.
//! - **[`MailTransport`]**: one message per call, failures classified as
//!   fatal or transient. [`SmtpMailTransport`] (lettre, STARTTLS) and
//!   [`MockMailTransport`] ship in-crate.
//!
//! [`OnboardingService`] orchestrates the caller-facing operations;
//! [`TokenLifecycle`], [`CredentialIssuer`], and
//! [`NotificationDispatcher`] each own one concern and are usable on their
//! own.

pub mod onboarding;

// Re-export commonly used types
pub use onboarding::{
    CredentialClaims, CredentialIssuer, EventProvider, InMemoryEventProvider, MailTransport,
    MailerConfig, MemoryTokenStore, MockMailTransport, MonitoringEvent, NotificationDispatcher,
    OnboardConfig, OnboardError, OnboardingService, RegistrationMail, RegistrationRequest,
    RegistrationToken, SignedCredential, SmtpMailTransport, TokenGenerator, TokenLifecycle,
    TokenSourceFn, TokenStatus, TokenStore, TransportError,
};

// Seam modules at the crate root, matching the paths used in adapter docs.
pub use onboarding::{event, notify, store};
