//! RSA key material for token signing.
//!
//! The server holds exactly one RSA key pair. The key ID (`kid`) is derived
//! from a SHA-256 hash of the DER-encoded public key, so it is stable for a
//! given key across restarts and changes only if the key itself changes.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::{CryptoError, CryptoResult};
use crate::hash::sha256;

/// RSA modulus size for generated keys, in bits.
const KEY_BITS: usize = 2048;

/// Number of hex characters of the public-key hash used as the key ID.
const KID_LEN: usize = 16;

/// An RSA key pair with a stable, content-derived key ID.
pub struct RsaKeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
    kid: String,
}

impl std::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("kid", &self.kid)
            .field("private", &"[REDACTED]")
            .finish()
    }
}

impl RsaKeyPair {
    /// Generates a new 2048-bit RSA key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    pub fn generate() -> CryptoResult<Self> {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, KEY_BITS)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Self::from_private(private)
    }

    /// Loads a key pair from a PKCS#8 PEM-encoded private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM is not a valid RSA private key.
    pub fn from_pem(pem: &str) -> CryptoResult<Self> {
        let private = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| CryptoError::InvalidKey(format!("invalid PKCS#8 PEM: {e}")))?;
        Self::from_private(private)
    }

    fn from_private(private: RsaPrivateKey) -> CryptoResult<Self> {
        let public = RsaPublicKey::from(&private);
        let kid = derive_kid(&public)?;
        Ok(Self {
            private,
            public,
            kid,
        })
    }

    /// Returns the key ID.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Returns the private key as PKCS#8 PEM.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be serialized.
    pub fn private_key_pem(&self) -> CryptoResult<String> {
        let pem = self
            .private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(pem.to_string())
    }

    /// Returns the public key as SPKI PEM.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be serialized.
    pub fn public_key_pem(&self) -> CryptoResult<String> {
        self.public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Returns the public key modulus and exponent, base64url-encoded without
    /// padding, as used in a JWK.
    #[must_use]
    pub fn public_components(&self) -> RsaPublicComponents {
        RsaPublicComponents {
            n: URL_SAFE_NO_PAD.encode(self.public.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(self.public.e().to_bytes_be()),
        }
    }
}

/// Base64url-encoded RSA public key components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicComponents {
    /// Modulus.
    pub n: String,
    /// Public exponent.
    pub e: String,
}

/// Derives the key ID from the DER-encoded public key.
fn derive_kid(public: &RsaPublicKey) -> CryptoResult<String> {
    let der = public
        .to_public_key_der()
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let digest = hex::encode(sha256(der.as_bytes()));
    Ok(digest[..KID_LEN].to_string())
}
