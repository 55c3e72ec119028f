//! End-to-end tests of the registration and onboarding flow through the
//! public API: event creation, token minting, mail delivery, and the
//! exactly-once token exchange.

use std::sync::Arc;
use std::time::Duration;

use onboard_auth::{
    CredentialIssuer, InMemoryEventProvider, MailTransport, MailerConfig, MemoryTokenStore,
    MockMailTransport, NotificationDispatcher, OnboardError, OnboardingService,
    RegistrationRequest, TokenGenerator, TokenLifecycle, TokenStatus, TokenStore, TransportError,
};

const SECRET: &[u8] = b"integration-test-secret-0123456789";

fn mailer() -> MailerConfig {
    MailerConfig {
        host: "smtp.example.org".to_string(),
        port: 587,
        sender_email: "noreply@example.org".to_string(),
        sender_name: "Event Registration".to_string(),
        password: "app-password".to_string(),
    }
}

fn request() -> RegistrationRequest {
    RegistrationRequest {
        patient_id: "patient-7".to_string(),
        patient_email: "patient@example.org".to_string(),
        start_time: "2025-01-01T00:00:00Z".to_string(),
        duration_secs: "900".to_string(),
        appointment_time: "2024-12-31T09:30:00Z".to_string(),
    }
}

struct Harness {
    service: Arc<OnboardingService>,
    store: Arc<MemoryTokenStore>,
    transport: Arc<MockMailTransport>,
}

fn harness(transport: MockMailTransport) -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let store = Arc::new(MemoryTokenStore::new());
    let transport = Arc::new(transport);

    let lifecycle = Arc::new(TokenLifecycle::new(
        Arc::clone(&store) as Arc<dyn TokenStore>,
        TokenGenerator::new(16),
        3,
    ));
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::clone(&transport) as Arc<dyn MailTransport>,
        mailer(),
        3,
        Duration::from_millis(1),
    ));
    let service = Arc::new(OnboardingService::new(
        Arc::new(InMemoryEventProvider::new()),
        lifecycle,
        CredentialIssuer::new(SECRET),
        dispatcher,
    ));

    Harness {
        service,
        store,
        transport,
    }
}

#[tokio::test]
async fn full_registration_and_onboarding_flow() {
    let h = harness(MockMailTransport::succeeding());

    let token_id = h.service.register_event(request()).await.unwrap();
    assert_eq!(h.transport.attempts(), 1);

    let token = h.store.get(&token_id).await.unwrap().unwrap();
    assert_eq!(token.status, TokenStatus::Pending);

    let credential = h.service.onboard_with_token(&token_id).await.unwrap();

    // The credential covers exactly the event's monitoring window.
    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = false;
    let claims = jsonwebtoken::decode::<onboard_auth::CredentialClaims>(
        credential.as_str(),
        &jsonwebtoken::DecodingKey::from_secret(SECRET),
        &validation,
    )
    .unwrap()
    .claims;
    assert_eq!(claims.sub, token.event_id);
    assert_eq!(claims.iat, 1735689600);
    assert_eq!(claims.exp, 1735689600 + 900);

    assert_eq!(
        h.store.get(&token_id).await.unwrap().unwrap().status,
        TokenStatus::Done
    );
}

#[tokio::test]
async fn registration_survives_transient_delivery_failures() {
    let transient = || TransportError::Transient("450 mailbox busy".to_string());
    let h = harness(MockMailTransport::with_script(vec![
        Err(transient()),
        Err(transient()),
        Ok(()),
    ]));

    let token_id = h.service.register_event(request()).await.unwrap();
    assert_eq!(h.transport.attempts(), 3);
    assert!(h.store.get(&token_id).await.unwrap().is_some());
}

#[tokio::test]
async fn undeliverable_registration_reports_failure_but_persists_token() {
    let transient = || TransportError::Transient("450 mailbox busy".to_string());
    let h = harness(MockMailTransport::with_script(vec![
        Err(transient()),
        Err(transient()),
        Err(transient()),
    ]));

    let result = h.service.register_event(request()).await;
    assert!(matches!(result, Err(OnboardError::DeliveryFailed)));
    assert_eq!(h.transport.attempts(), 3);

    // The event and token rows were committed before delivery was attempted.
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn concurrent_onboarding_attempts_yield_one_credential() {
    let h = harness(MockMailTransport::succeeding());
    let token_id = h.service.register_event(request()).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = Arc::clone(&h.service);
        let token_id = token_id.clone();
        handles.push(tokio::spawn(async move {
            service.onboard_with_token(&token_id).await
        }));
    }

    let mut credentials = 0;
    let mut already_used = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => credentials += 1,
            Err(OnboardError::TokenAlreadyUsed) => already_used += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(credentials, 1);
    assert_eq!(already_used, 15);
    assert_eq!(
        h.store.get(&token_id).await.unwrap().unwrap().status,
        TokenStatus::Done
    );
}

#[tokio::test]
async fn concurrent_registrations_mint_unique_tokens() {
    let h = harness(MockMailTransport::succeeding());

    let mut handles = Vec::new();
    for i in 0..32 {
        let service = Arc::clone(&h.service);
        handles.push(tokio::spawn(async move {
            let mut req = request();
            req.patient_id = format!("patient-{i}");
            service.register_event(req).await.unwrap()
        }));
    }

    let mut ids = std::collections::HashSet::new();
    for handle in handles {
        assert!(ids.insert(handle.await.unwrap()));
    }
    assert_eq!(ids.len(), 32);
    assert_eq!(h.store.len().await, 32);
}

#[tokio::test]
async fn onboarding_with_unknown_token_is_rejected() {
    let h = harness(MockMailTransport::succeeding());
    let result = h.service.onboard_with_token("no-such-token").await;
    assert!(matches!(result, Err(OnboardError::TokenNotFound)));
    assert!(h.store.is_empty().await);
}
