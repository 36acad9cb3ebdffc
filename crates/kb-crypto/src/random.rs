//! Cryptographically secure random identifiers.
//!
//! Covers the opaque artifacts the authorization flow mints: session
//! identifiers, consent tokens, authorization codes and SSO nonces.

use rand::Rng;
use rand::distributions::{Alphanumeric, DistString};

/// Generates `len` cryptographically secure random bytes.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates a random alphanumeric string of length `len`.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), len)
}

/// Generates an opaque session identifier for the pending SSO handshake.
#[must_use]
pub fn generate_session_id() -> String {
    random_alphanumeric(32)
}

/// Generates an opaque consent token.
#[must_use]
pub fn generate_consent_token() -> String {
    random_alphanumeric(32)
}

/// Generates a nonce for the SSO round trip.
#[must_use]
pub fn generate_nonce() -> String {
    random_alphanumeric(32)
}

/// Generates an authorization code.
///
/// 32 random bytes hex-encoded: 64 characters, 256 bits of entropy, well
/// above the 128-bit minimum recommended by RFC 6749.
#[must_use]
pub fn generate_auth_code() -> String {
    hex::encode(random_bytes(32))
}
