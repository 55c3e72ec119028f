// Core architecture components
mod config;
mod credential;
mod error;
mod generator;
mod lifecycle;
mod service;

// Pluggable seams: persistence, event records, mail transport
pub mod event;
pub mod notify;
pub mod store;

// Core components exports
pub use config::{MailerConfig, OnboardConfig};
pub use credential::{CredentialClaims, CredentialIssuer, SignedCredential};
pub use error::OnboardError;
pub use generator::{TokenGenerator, TokenSourceFn};
pub use lifecycle::TokenLifecycle;
pub use service::OnboardingService;

// Seam exports
pub use event::{EventProvider, InMemoryEventProvider, MonitoringEvent, RegistrationRequest};
pub use notify::{
    MailTransport, MockMailTransport, NotificationDispatcher, RegistrationMail,
    SmtpMailTransport, TransportError,
};
pub use store::{MemoryTokenStore, RegistrationToken, TokenStatus, TokenStore};
