use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::OnboardError;

/// An upstream registration request, as handed to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Patient identifier in the upstream system.
    pub patient_id: String,
    /// Address the registration token is delivered to.
    pub patient_email: String,
    /// Monitoring start instant, RFC 3339.
    pub start_time: String,
    /// Monitoring duration in seconds, decimal string.
    pub duration_secs: String,
    /// Appointment instant shown in the notification, RFC 3339.
    pub appointment_time: String,
}

/// A monitoring event record, owned by the external event provider.
///
/// Created once at registration time and immutable thereafter. The timing
/// fields are carried verbatim as supplied by the upstream scheduler; the
/// credential issuer parses and validates them at exchange time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringEvent {
    /// Globally unique event identifier.
    pub id: String,
    /// Patient the event belongs to.
    pub patient_id: String,
    /// Monitoring start instant, RFC 3339.
    pub start_time: String,
    /// Monitoring duration in seconds, decimal string.
    pub duration_secs: String,
}

/// The external event record provider, seen through a narrow contract.
///
/// The core calls `create_event` before minting a token and reads the
/// stored timing back through `get_event` when a consumed token is
/// exchanged for a credential.
#[async_trait]
pub trait EventProvider: Send + Sync {
    /// Creates and persists an event record for the registration request.
    async fn create_event(
        &self,
        request: &RegistrationRequest,
    ) -> Result<MonitoringEvent, OnboardError>;

    /// Reads an event record by identifier.
    async fn get_event(&self, event_id: &str) -> Result<Option<MonitoringEvent>, OnboardError>;
}

/// In-memory event provider for tests and single-process embeddings.
///
/// Mints UUID v4 event identifiers and keeps records in a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryEventProvider {
    events: Arc<RwLock<HashMap<String, MonitoringEvent>>>,
}

impl InMemoryEventProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventProvider for InMemoryEventProvider {
    async fn create_event(
        &self,
        request: &RegistrationRequest,
    ) -> Result<MonitoringEvent, OnboardError> {
        let event = MonitoringEvent {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: request.patient_id.clone(),
            start_time: request.start_time.clone(),
            duration_secs: request.duration_secs.clone(),
        };

        let mut events = self.events.write().await;
        events.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<MonitoringEvent>, OnboardError> {
        let events = self.events.read().await;
        Ok(events.get(event_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegistrationRequest {
        RegistrationRequest {
            patient_id: "patient-7".to_string(),
            patient_email: "patient@example.org".to_string(),
            start_time: "2025-01-01T00:00:00Z".to_string(),
            duration_secs: "900".to_string(),
            appointment_time: "2024-12-31T09:30:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_event() -> Result<(), OnboardError> {
        let provider = InMemoryEventProvider::new();
        let event = provider.create_event(&request()).await?;

        assert_eq!(event.patient_id, "patient-7");
        assert_eq!(event.start_time, "2025-01-01T00:00:00Z");

        let loaded = provider.get_event(&event.id).await?.unwrap();
        assert_eq!(loaded.id, event.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_event_is_absent() -> Result<(), OnboardError> {
        let provider = InMemoryEventProvider::new();
        assert!(provider.get_event("missing").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_event_ids_are_unique() -> Result<(), OnboardError> {
        let provider = InMemoryEventProvider::new();
        let a = provider.create_event(&request()).await?;
        let b = provider.create_event(&request()).await?;
        assert_ne!(a.id, b.id);
        Ok(())
    }
}
