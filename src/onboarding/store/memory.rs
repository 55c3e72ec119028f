use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RegistrationToken, TokenStatus, TokenStore};
use crate::OnboardError;

/// In-memory token store backed by a `HashMap`.
///
/// Fully thread-safe; the conditioned status update runs under the write
/// lock, so it is atomic with respect to every other access. Data does not
/// survive restarts; production deployments implement [`TokenStore`] over
/// their own database.
///
/// # Example
///
/// ```rust
/// use onboard_auth::store::{MemoryTokenStore, RegistrationToken, TokenStatus, TokenStore};
///
/// # async fn example() -> Result<(), onboard_auth::OnboardError> {
/// let store = MemoryTokenStore::new();
/// store.insert(RegistrationToken::new("tok-1", "evt-1")).await?;
///
/// let consumed = store
///     .compare_and_set_status("tok-1", TokenStatus::Pending, TokenStatus::Done)
///     .await?;
/// assert!(consumed);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    rows: Arc<RwLock<HashMap<String, RegistrationToken>>>,
}

impl MemoryTokenStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held. Diagnostics and tests only.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// True when the store holds no rows.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, token: RegistrationToken) -> Result<(), OnboardError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&token.id) {
            return Err(OnboardError::DuplicateToken);
        }
        rows.insert(token.id.clone(), token);
        Ok(())
    }

    async fn get(&self, token_id: &str) -> Result<Option<RegistrationToken>, OnboardError> {
        let rows = self.rows.read().await;
        Ok(rows.get(token_id).cloned())
    }

    async fn compare_and_set_status(
        &self,
        token_id: &str,
        expected: TokenStatus,
        new: TokenStatus,
    ) -> Result<bool, OnboardError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(token_id) {
            Some(row) if row.status == expected => {
                row.status = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
