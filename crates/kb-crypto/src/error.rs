//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors from key handling and signing primitives.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// A key could not be parsed or encoded.
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
