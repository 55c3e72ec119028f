use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// A function that produces token identifiers.
pub type TokenSourceFn = Box<dyn Fn() -> String + Send + Sync>;

/// Generates fixed-length, cryptographically random, URL-safe token
/// identifiers.
///
/// The default source draws `length` bytes from the thread-local CSPRNG and
/// encodes them with unpadded URL-safe base64, so the result is safe to
/// embed in URLs and QR-code payloads. 16 raw bytes (the default) encode to
/// a 22-character identifier.
///
/// Predictability is a security failure here, not a quality issue: the
/// identifier doubles as the bearer secret.
///
/// # Example
///
/// ```rust
/// use onboard_auth::TokenGenerator;
///
/// let generator = TokenGenerator::new(16);
/// let token = generator.generate();
/// assert_eq!(token.len(), 22);
/// ```
pub struct TokenGenerator {
    source: TokenSourceFn,
}

impl TokenGenerator {
    /// Creates a generator producing identifiers from `length` random bytes.
    pub fn new(length: usize) -> Self {
        Self {
            source: Box::new(move || {
                let mut bytes = vec![0u8; length];
                rand::thread_rng().fill_bytes(&mut bytes);
                URL_SAFE_NO_PAD.encode(&bytes)
            }),
        }
    }

    /// Replaces the identifier source.
    ///
    /// Intended for tests that need deterministic identifiers; the default
    /// source is the right choice everywhere else.
    ///
    /// # Example
    ///
    /// ```rust
    /// use onboard_auth::TokenGenerator;
    /// use std::sync::atomic::{AtomicU64, Ordering};
    /// use std::sync::Arc;
    ///
    /// let counter = Arc::new(AtomicU64::new(0));
    /// let counter_clone = counter.clone();
    /// let generator = TokenGenerator::new(16).with_source(move || {
    ///     format!("token-{:04}", counter_clone.fetch_add(1, Ordering::SeqCst))
    /// });
    /// assert_eq!(generator.generate(), "token-0000");
    /// ```
    pub fn with_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.source = Box::new(source);
        self
    }

    /// Produces a fresh identifier.
    pub fn generate(&self) -> String {
        (self.source)()
    }
}

impl Default for TokenGenerator {
    /// Creates a generator with the default 16-byte identifier length.
    fn default() -> Self {
        Self::new(16)
    }
}
