use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::onboarding::credential::{CredentialIssuer, SignedCredential};
use crate::onboarding::event::{EventProvider, RegistrationRequest};
use crate::onboarding::lifecycle::TokenLifecycle;
use crate::onboarding::notify::NotificationDispatcher;
use crate::OnboardError;

/// The caller-facing orchestration layer: registration and onboarding.
///
/// Upstream request handlers hand their decoded payloads here; everything
/// below this point is transport-agnostic. Construct one per process from an
/// [`OnboardConfig`](crate::OnboardConfig) and share it behind an `Arc`.
pub struct OnboardingService {
    events: Arc<dyn EventProvider>,
    lifecycle: Arc<TokenLifecycle>,
    issuer: CredentialIssuer,
    dispatcher: Arc<NotificationDispatcher>,
}

impl OnboardingService {
    /// Wires the orchestrator from its four collaborators.
    pub fn new(
        events: Arc<dyn EventProvider>,
        lifecycle: Arc<TokenLifecycle>,
        issuer: CredentialIssuer,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            events,
            lifecycle,
            issuer,
            dispatcher,
        }
    }

    /// Registers a monitoring event and notifies the patient.
    ///
    /// Creates the event record, mints a single-use registration token for
    /// it, and delivers the token by email. Delivery runs as its own task so
    /// the transport's network I/O and backoff sleeps never execute on the
    /// caller's path; the handler only awaits the boolean verdict.
    ///
    /// Returns the token identifier. If delivery fails the whole
    /// registration is reported failed with
    /// [`OnboardError::DeliveryFailed`], although the event and token rows
    /// remain persisted; see DESIGN.md for the policy discussion.
    pub async fn register_event(
        &self,
        request: RegistrationRequest,
    ) -> Result<String, OnboardError> {
        let appointment: DateTime<Utc> = request
            .appointment_time
            .parse()
            .map_err(|e| OnboardError::InvalidTiming(format!("unparsable appointment: {e}")))?;

        let event = self.events.create_event(&request).await?;
        let token = self.lifecycle.create(&event.id).await?;

        let dispatcher = Arc::clone(&self.dispatcher);
        let recipient = request.patient_email.clone();
        let token_id = token.id.clone();
        let delivery = tokio::spawn(async move {
            dispatcher.deliver(&recipient, &token_id, appointment).await
        });

        let delivered = delivery.await.unwrap_or(false);
        if !delivered {
            tracing::error!(event_id = %event.id, "registration notification failed");
            return Err(OnboardError::DeliveryFailed);
        }

        Ok(token.id)
    }

    /// Exchanges a registration token for a signed onboarding credential.
    ///
    /// Consumes the token exactly once, then derives the credential from the
    /// associated event's stored timing data. A second exchange attempt, or
    /// one racing against this call, reports
    /// [`OnboardError::TokenAlreadyUsed`].
    pub async fn onboard_with_token(
        &self,
        token_id: &str,
    ) -> Result<SignedCredential, OnboardError> {
        self.lifecycle.validate_and_consume(token_id).await?;

        // The row exists: validate_and_consume just flipped it.
        let token = self
            .lifecycle
            .get(token_id)
            .await?
            .ok_or(OnboardError::TokenNotFound)?;

        let event = self
            .events
            .get_event(&token.event_id)
            .await?
            .ok_or(OnboardError::EventNotFound)?;

        self.issuer
            .issue(&event.id, &event.start_time, &event.duration_secs)
    }
}
