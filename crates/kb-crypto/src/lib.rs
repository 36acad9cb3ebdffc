//! # kb-crypto
//!
//! Cryptographic primitives for keybridge.
//!
//! This crate owns the server's RSA signing key material and the small set of
//! primitives the authorization flow depends on:
//!
//! - [`RsaKeyPair`] - RSA key generation, PEM codecs, stable key IDs, JWK export
//! - [`hash`] - SHA-256 and HMAC-SHA256 (used by the SSO bridge)
//! - [`random`] - secure random identifiers for sessions, consents and codes

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod hash;
pub mod keys;
pub mod random;

pub use error::{CryptoError, CryptoResult};
pub use hash::{constant_time_eq, hmac_sha256, hmac_sha256_hex, sha256};
pub use keys::{RsaKeyPair, RsaPublicComponents};
pub use random::{
    generate_auth_code, generate_consent_token, generate_nonce, generate_session_id,
    random_alphanumeric, random_bytes,
};
