use thiserror::Error;

/// Error types that can occur during token issuance, consumption, and
/// credential exchange.
///
/// # Error Categories
///
/// - **Expected onboarding outcomes**: `TokenNotFound`, `TokenAlreadyUsed`:
///   negative results an upstream handler turns into a user-facing response,
///   not system failures.
/// - **Creation failures**: `DuplicateToken` (consumed internally by the
///   create retry loop), `GenerationExhausted`.
/// - **System errors**: `Storage`, `Crypto`, `EventNotFound`.
/// - **Input errors**: `InvalidTiming`.
/// - **Orchestration outcomes**: `DeliveryFailed`.
#[derive(Error, Debug)]
pub enum OnboardError {
    /// The generated token identifier already exists in the store.
    ///
    /// Surfaced by [`TokenStore::insert`](crate::TokenStore::insert) when the
    /// atomic insert-if-absent hits an existing row. The lifecycle manager
    /// retries with a fresh identifier; callers of `create` only ever see
    /// [`OnboardError::GenerationExhausted`].
    #[error("token identifier already exists")]
    DuplicateToken,

    /// Identifier collisions exhausted the create retry budget.
    ///
    /// Collisions are astronomically rare at the default identifier length,
    /// so exhaustion signals either a misconfigured (too short) identifier
    /// or a systemic store problem. Never swallowed.
    #[error("token generation exhausted after {attempts} attempts")]
    GenerationExhausted {
        /// Number of insert attempts made before giving up.
        attempts: u32,
    },

    /// No token row exists for the presented identifier.
    #[error("token not found")]
    TokenNotFound,

    /// The token was already consumed by an earlier (or concurrently racing)
    /// onboarding attempt. This is the exactly-once guard.
    #[error("token already used")]
    TokenAlreadyUsed,

    /// A consumed token references an event record the provider no longer
    /// knows about.
    #[error("event record not found")]
    EventNotFound,

    /// Malformed or negative timing input passed to credential issuance.
    ///
    /// Never silently coerced to a default.
    #[error("invalid event timing: {0}")]
    InvalidTiming(String),

    /// An unclassified persistence failure during token creation or
    /// consumption. A failed conditioned write leaves the token's status
    /// unchanged.
    #[error("token store error: {0}")]
    Storage(String),

    /// Credential signing or encoding failed.
    #[error("credential signing error: {0}")]
    Crypto(String),

    /// The registration notification could not be delivered within the
    /// retry budget. The event and token rows remain persisted; see
    /// DESIGN.md for the policy discussion.
    #[error("registration notification could not be delivered")]
    DeliveryFailed,
}

impl OnboardError {
    /// Creates a `Storage` error from any displayable cause.
    pub fn from_storage_message(message: impl std::fmt::Display) -> Self {
        OnboardError::Storage(message.to_string())
    }
}
