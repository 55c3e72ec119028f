use std::sync::Arc;

use crate::onboarding::generator::TokenGenerator;
use crate::onboarding::store::{RegistrationToken, TokenStatus, TokenStore};
use crate::OnboardError;

/// Owns the registration token state machine: creation with a uniqueness
/// retry loop, and the validate-and-consume transition.
///
/// A token moves `Pending -> Done` at most once. Creation relies on the
/// store's atomic insert-if-absent for uniqueness; consumption relies on the
/// store's conditioned status update, so two concurrent consume attempts on
/// the same token resolve to exactly one success. The manager itself holds
/// no token state and takes no locks; every write goes through the store's
/// atomic primitives.
///
/// # Example
///
/// ```rust
/// use onboard_auth::{MemoryTokenStore, TokenGenerator, TokenLifecycle};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), onboard_auth::OnboardError> {
/// let lifecycle = TokenLifecycle::new(
///     Arc::new(MemoryTokenStore::new()),
///     TokenGenerator::new(16),
///     3,
/// );
///
/// let token = lifecycle.create("evt-1").await?;
/// lifecycle.validate_and_consume(&token.id).await?;
///
/// // A second consume attempt is rejected.
/// assert!(lifecycle.validate_and_consume(&token.id).await.is_err());
/// # Ok(())
/// # }
/// ```
pub struct TokenLifecycle {
    store: Arc<dyn TokenStore>,
    generator: TokenGenerator,
    create_attempts: u32,
}

impl TokenLifecycle {
    /// Creates a lifecycle manager over `store`.
    ///
    /// `create_attempts` bounds how many insert attempts [`create`]
    /// makes before reporting [`OnboardError::GenerationExhausted`].
    ///
    /// [`create`]: TokenLifecycle::create
    pub fn new(store: Arc<dyn TokenStore>, generator: TokenGenerator, create_attempts: u32) -> Self {
        Self {
            store,
            generator,
            create_attempts,
        }
    }

    /// Mints a new pending token for `event_id`.
    ///
    /// Each attempt generates a fresh identifier and inserts it through the
    /// store's atomic insert-if-absent. An identifier collision triggers a
    /// retry with a new identifier; any other storage failure aborts
    /// immediately. Exhausting the budget on repeated collisions reports
    /// [`OnboardError::GenerationExhausted`] with zero rows persisted;
    /// at sane identifier lengths that signals a misconfiguration or a
    /// systemic store problem, never ordinary bad luck.
    pub async fn create(&self, event_id: &str) -> Result<RegistrationToken, OnboardError> {
        for attempt in 1..=self.create_attempts {
            let token = RegistrationToken::new(self.generator.generate(), event_id);

            match self.store.insert(token.clone()).await {
                Ok(()) => {
                    tracing::debug!(
                        token_prefix = %token_prefix(&token.id),
                        event_id,
                        attempt,
                        "registration token created"
                    );
                    return Ok(token);
                }
                Err(OnboardError::DuplicateToken) => {
                    tracing::warn!(
                        event_id,
                        attempt,
                        max_attempts = self.create_attempts,
                        "token identifier collision, regenerating"
                    );
                }
                Err(other) => return Err(other),
            }
        }

        tracing::error!(
            event_id,
            attempts = self.create_attempts,
            "token generation exhausted"
        );
        Err(OnboardError::GenerationExhausted {
            attempts: self.create_attempts,
        })
    }

    /// Reads a token row by identifier.
    pub async fn get(&self, token_id: &str) -> Result<Option<RegistrationToken>, OnboardError> {
        self.store.get(token_id).await
    }

    /// Validates a token and consumes it, transitioning `Pending -> Done`
    /// exactly once.
    ///
    /// The status check is re-asserted by the store at write time via
    /// compare-and-set: a plain read-check-then-write would let two
    /// onboarding attempts racing between read and write both succeed.
    /// Losing that race is reported identically to presenting an
    /// already-consumed token.
    ///
    /// # Errors
    ///
    /// * [`OnboardError::TokenNotFound`]: no row for the identifier; no
    ///   write performed
    /// * [`OnboardError::TokenAlreadyUsed`]: the token was consumed
    ///   earlier, or a concurrent attempt won the race
    /// * [`OnboardError::Storage`]: backend failure; the token's status is
    ///   unchanged
    pub async fn validate_and_consume(&self, token_id: &str) -> Result<(), OnboardError> {
        let Some(token) = self.store.get(token_id).await? else {
            tracing::debug!(token_prefix = %token_prefix(token_id), "token not found");
            return Err(OnboardError::TokenNotFound);
        };

        if token.status != TokenStatus::Pending {
            tracing::debug!(token_prefix = %token_prefix(token_id), "token already used");
            return Err(OnboardError::TokenAlreadyUsed);
        }

        let swapped = self
            .store
            .compare_and_set_status(token_id, TokenStatus::Pending, TokenStatus::Done)
            .await?;

        if swapped {
            tracing::info!(
                token_prefix = %token_prefix(token_id),
                event_id = %token.event_id,
                "token validated and consumed"
            );
            Ok(())
        } else {
            // Lost the race against a concurrent consume.
            tracing::debug!(
                token_prefix = %token_prefix(token_id),
                "concurrent consume won the conditioned write"
            );
            Err(OnboardError::TokenAlreadyUsed)
        }
    }
}

/// First eight characters of a token identifier, for log lines.
///
/// The full identifier is a bearer secret and never appears in logs.
pub(crate) fn token_prefix(token_id: &str) -> String {
    token_id.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::store::MemoryTokenStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn lifecycle_with(store: Arc<dyn TokenStore>) -> TokenLifecycle {
        TokenLifecycle::new(store, TokenGenerator::new(16), 3)
    }

    /// Store whose insert always reports an identifier collision.
    #[derive(Default)]
    struct CollidingStore {
        inserts: AtomicU32,
    }

    #[async_trait]
    impl TokenStore for CollidingStore {
        async fn insert(&self, _token: RegistrationToken) -> Result<(), OnboardError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            Err(OnboardError::DuplicateToken)
        }

        async fn get(&self, _token_id: &str) -> Result<Option<RegistrationToken>, OnboardError> {
            Ok(None)
        }

        async fn compare_and_set_status(
            &self,
            _token_id: &str,
            _expected: TokenStatus,
            _new: TokenStatus,
        ) -> Result<bool, OnboardError> {
            Ok(false)
        }
    }

    /// Store whose every operation fails with a backend error.
    struct FailingStore;

    #[async_trait]
    impl TokenStore for FailingStore {
        async fn insert(&self, _token: RegistrationToken) -> Result<(), OnboardError> {
            Err(OnboardError::Storage("connection reset".to_string()))
        }

        async fn get(&self, _token_id: &str) -> Result<Option<RegistrationToken>, OnboardError> {
            Err(OnboardError::Storage("connection reset".to_string()))
        }

        async fn compare_and_set_status(
            &self,
            _token_id: &str,
            _expected: TokenStatus,
            _new: TokenStatus,
        ) -> Result<bool, OnboardError> {
            Err(OnboardError::Storage("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn test_create_returns_pending_token() {
        let lifecycle = lifecycle_with(Arc::new(MemoryTokenStore::new()));
        let token = lifecycle.create("evt-1").await.unwrap();

        assert_eq!(token.event_id, "evt-1");
        assert_eq!(token.status, TokenStatus::Pending);
        assert_eq!(token.id.len(), 22);
    }

    #[tokio::test]
    async fn test_create_retries_on_collision() {
        let store = Arc::new(MemoryTokenStore::new());
        // Seed the row the first generated identifier will collide with.
        store
            .insert(RegistrationToken::new("collide", "evt-0"))
            .await
            .unwrap();

        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        let generator = TokenGenerator::new(16).with_source(move || {
            match calls_clone.fetch_add(1, Ordering::SeqCst) {
                0 => "collide".to_string(),
                n => format!("fresh-{n}"),
            }
        });

        let lifecycle = TokenLifecycle::new(store, generator, 3);
        let token = lifecycle.create("evt-1").await.unwrap();
        assert_eq!(token.id, "fresh-1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_create_exhaustion_after_budget() {
        let store = Arc::new(CollidingStore::default());
        let lifecycle = TokenLifecycle::new(Arc::clone(&store) as Arc<dyn TokenStore>, TokenGenerator::new(16), 3);

        let result = lifecycle.create("evt-1").await;
        assert!(matches!(
            result,
            Err(OnboardError::GenerationExhausted { attempts: 3 })
        ));
        // Exactly the budget was spent, and nothing was persisted.
        assert_eq!(store.inserts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_create_aborts_on_non_collision_error() {
        let lifecycle = lifecycle_with(Arc::new(FailingStore));
        let result = lifecycle.create("evt-1").await;
        assert!(matches!(result, Err(OnboardError::Storage(_))));
    }

    #[tokio::test]
    async fn test_concurrent_creates_yield_unique_identifiers() {
        let store = Arc::new(MemoryTokenStore::new());
        let lifecycle = Arc::new(lifecycle_with(Arc::clone(&store) as Arc<dyn TokenStore>));

        let mut handles = Vec::new();
        for i in 0..64 {
            let lifecycle = Arc::clone(&lifecycle);
            handles.push(tokio::spawn(async move {
                lifecycle.create(&format!("evt-{i}")).await.unwrap().id
            }));
        }

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }
        assert_eq!(ids.len(), 64);
        assert_eq!(store.len().await, 64);
    }

    #[tokio::test]
    async fn test_consume_unknown_token() {
        let store = Arc::new(MemoryTokenStore::new());
        let lifecycle = lifecycle_with(Arc::clone(&store) as Arc<dyn TokenStore>);

        let result = lifecycle.validate_and_consume("ghost").await;
        assert!(matches!(result, Err(OnboardError::TokenNotFound)));
        // No side effect.
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_consume_transitions_to_done() {
        let lifecycle = lifecycle_with(Arc::new(MemoryTokenStore::new()));
        let token = lifecycle.create("evt-1").await.unwrap();

        lifecycle.validate_and_consume(&token.id).await.unwrap();
        assert_eq!(
            lifecycle.get(&token.id).await.unwrap().unwrap().status,
            TokenStatus::Done
        );
    }

    #[tokio::test]
    async fn test_second_consume_rejected() {
        let lifecycle = lifecycle_with(Arc::new(MemoryTokenStore::new()));
        let token = lifecycle.create("evt-1").await.unwrap();

        lifecycle.validate_and_consume(&token.id).await.unwrap();
        let result = lifecycle.validate_and_consume(&token.id).await;
        assert!(matches!(result, Err(OnboardError::TokenAlreadyUsed)));
    }

    #[tokio::test]
    async fn test_racing_consumes_exactly_one_success() {
        let lifecycle = Arc::new(lifecycle_with(Arc::new(MemoryTokenStore::new())));
        let token = lifecycle.create("evt-1").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let lifecycle = Arc::clone(&lifecycle);
            let token_id = token.id.clone();
            handles.push(tokio::spawn(async move {
                lifecycle.validate_and_consume(&token_id).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => successes += 1,
                Err(OnboardError::TokenAlreadyUsed) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(
            lifecycle.get(&token.id).await.unwrap().unwrap().status,
            TokenStatus::Done
        );
    }

    #[tokio::test]
    async fn test_consume_propagates_storage_failure() {
        let lifecycle = lifecycle_with(Arc::new(FailingStore));
        let result = lifecycle.validate_and_consume("tok-1").await;
        assert!(matches!(result, Err(OnboardError::Storage(_))));
    }
}
