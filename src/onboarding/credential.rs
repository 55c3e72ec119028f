use std::fmt;

use chrono::DateTime;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::OnboardError;

/// Claims carried by an onboarding credential.
///
/// `iat` is the monitored event's start instant and `exp` is that instant
/// plus the event duration; the credential's validity window is the
/// monitoring window itself, not the moment of exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Subject: the event identifier.
    pub sub: String,
    /// Issued-at: event start, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry: issued-at plus event duration.
    pub exp: i64,
}

/// A signed, self-contained onboarding credential.
///
/// Bearer-equivalent to the registration token's authority: anyone holding
/// it can assert the subject's identity until expiry. The `Debug`
/// representation is redacted so the blob cannot leak through logs or error
/// messages; call [`as_str`](SignedCredential::as_str) only at the point the
/// credential is handed back to the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedCredential(String);

impl SignedCredential {
    /// The encoded credential, for returning to the onboarding caller.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and yields the encoded credential.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SignedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SignedCredential(<redacted>)")
    }
}

/// Derives time-bounded signed credentials from event timing data.
///
/// A pure function of its inputs and the signing key configured at
/// construction: no storage, no clock reads, no shared mutable state, safe
/// to call concurrently without coordination. Symmetric HMAC-class signing
/// (HS256 by default); the algorithm is a configuration choice.
///
/// # Example
///
/// ```rust
/// use onboard_auth::CredentialIssuer;
///
/// # fn example() -> Result<(), onboard_auth::OnboardError> {
/// let issuer = CredentialIssuer::new(b"a-long-shared-secret-for-hs256");
/// let credential = issuer.issue("evt-1", "2025-01-01T00:00:00Z", "900")?;
/// # Ok(())
/// # }
/// ```
pub struct CredentialIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    algorithm: Algorithm,
}

impl CredentialIssuer {
    /// Creates an issuer signing with HS256 over `secret`.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_algorithm(secret, Algorithm::HS256)
    }

    /// Creates an issuer with an explicit HMAC-class algorithm
    /// (HS256/HS384/HS512).
    pub fn with_algorithm(secret: &[u8], algorithm: Algorithm) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            header: Header::new(algorithm),
            algorithm,
        }
    }

    /// Issues a signed credential for `subject` covering the event window.
    ///
    /// `start_instant` is an RFC 3339 timestamp and `duration_seconds` a
    /// non-negative decimal count of seconds, both carried verbatim from the
    /// event record. Malformed or negative timing is rejected with
    /// [`OnboardError::InvalidTiming`], never coerced to a default.
    pub fn issue(
        &self,
        subject: &str,
        start_instant: &str,
        duration_seconds: &str,
    ) -> Result<SignedCredential, OnboardError> {
        let start = DateTime::parse_from_rfc3339(start_instant).map_err(|e| {
            OnboardError::InvalidTiming(format!("unparsable start instant: {e}"))
        })?;

        let duration: i64 = duration_seconds.trim().parse().map_err(|e| {
            OnboardError::InvalidTiming(format!("unparsable duration: {e}"))
        })?;
        if duration < 0 {
            return Err(OnboardError::InvalidTiming(format!(
                "duration is negative: {duration}"
            )));
        }

        let issued_at = start.timestamp();
        let claims = CredentialClaims {
            sub: subject.to_string(),
            iat: issued_at,
            exp: issued_at + duration,
        };

        encode(&self.header, &claims, &self.encoding_key)
            .map(SignedCredential)
            .map_err(|e| OnboardError::Crypto(e.to_string()))
    }

    /// Verifies a credential's signature and expiry, returning its claims.
    pub fn verify(&self, credential: &str) -> Result<CredentialClaims, OnboardError> {
        let validation = Validation::new(self.algorithm);
        decode::<CredentialClaims>(credential, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| OnboardError::Crypto(e.to_string()))
    }
}
