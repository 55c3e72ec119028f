//! Pluggable persistence for registration tokens.
//!
//! The crate only ever touches token rows through the narrow [`TokenStore`]
//! contract: an atomic insert-if-absent, a point read, and a conditioned
//! status update. Any backend that can provide those three primitives can
//! carry the token lifecycle; [`MemoryTokenStore`] is always available and
//! backs tests and single-process embeddings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::OnboardError;

mod memory;
pub use memory::MemoryTokenStore;

/// Lifecycle state of a registration token.
///
/// A token transitions `Pending -> Done` at most once; there is no
/// transition back. Serialized as `PENDING`/`DONE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    /// Issued and not yet consumed.
    Pending,
    /// Consumed by a successful onboarding attempt.
    Done,
}

/// A persisted single-use registration token.
///
/// The identifier is both the primary key and the bearer secret; rows are
/// mutated only through [`TokenStore::compare_and_set_status`] and never
/// deleted by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationToken {
    /// Opaque random identifier, globally unique.
    pub id: String,
    /// The monitoring event this token was issued for.
    pub event_id: String,
    /// Current lifecycle state.
    pub status: TokenStatus,
    /// Unix timestamp of creation, for diagnostics.
    pub created_at: i64,
}

impl RegistrationToken {
    /// Creates a fresh pending token for `event_id`.
    pub fn new(id: impl Into<String>, event_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            event_id: event_id.into(),
            status: TokenStatus::Pending,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Abstract storage backend for registration tokens.
///
/// # Thread Safety
///
/// All methods are async and must be safe under concurrent access; the
/// uniqueness and exactly-once guarantees of the whole crate rest on the
/// atomicity of `insert` and `compare_and_set_status`.
///
/// # Error Handling
///
/// Backends map their native failures to [`OnboardError::Storage`], except
/// for the identifier-collision case of `insert`, which must be reported as
/// [`OnboardError::DuplicateToken`] so the lifecycle manager can retry with
/// a fresh identifier.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Atomically inserts a new token row if no row with its identifier
    /// exists.
    ///
    /// # Returns
    ///
    /// * `Ok(())`: the row was persisted
    /// * `Err(OnboardError::DuplicateToken)`: the identifier already exists;
    ///   no visible state changed
    /// * `Err(OnboardError::Storage)`: backend failure; no partial row may
    ///   remain visible
    async fn insert(&self, token: RegistrationToken) -> Result<(), OnboardError>;

    /// Reads a token row by identifier.
    async fn get(&self, token_id: &str) -> Result<Option<RegistrationToken>, OnboardError>;

    /// Atomically updates the token's status, conditioned on the status
    /// still being `expected` at write time.
    ///
    /// This is the primitive the exactly-once consumption guarantee is built
    /// on: two racing consume attempts must resolve to exactly one
    /// `Ok(true)`.
    ///
    /// # Returns
    ///
    /// * `Ok(true)`: the status matched `expected` and was set to `new`
    /// * `Ok(false)`: the status did not match (or the row is gone); nothing
    ///   was written
    /// * `Err(OnboardError::Storage)`: backend failure; the status is
    ///   provably unchanged
    async fn compare_and_set_status(
        &self,
        token_id: &str,
        expected: TokenStatus,
        new: TokenStatus,
    ) -> Result<bool, OnboardError>;

    /// Optional backend initialization (schema creation, connection checks).
    async fn init(&self) -> Result<(), OnboardError> {
        Ok(())
    }
}
