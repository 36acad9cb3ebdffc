//! JSON Web Key Set types (RFC 7517).
//!
//! This provider publishes exactly one RSA signing key.

use serde::{Deserialize, Serialize};

use kb_crypto::RsaPublicComponents;

/// JSON Web Key Set, served by the `/certs` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// Array of JSON Web Keys.
    pub keys: Vec<JsonWebKey>,
}

impl JsonWebKeySet {
    /// Creates a JWKS with the given keys.
    #[must_use]
    pub const fn with_keys(keys: Vec<JsonWebKey>) -> Self {
        Self { keys }
    }

    /// Finds a key by its ID.
    #[must_use]
    pub fn find_key(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

/// A single RSA signing key in JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type; always "RSA".
    pub kty: String,

    /// Algorithm; always "RS256".
    pub alg: String,

    /// Public key use; always "sig".
    #[serde(rename = "use")]
    pub key_use: String,

    /// Key ID.
    pub kid: String,

    /// Modulus, base64url without padding.
    pub n: String,

    /// Public exponent, base64url without padding.
    pub e: String,
}

impl JsonWebKey {
    /// Builds the JWK for an RSA public key.
    #[must_use]
    pub fn from_rsa(kid: &str, components: &RsaPublicComponents) -> Self {
        Self {
            kty: "RSA".to_string(),
            alg: "RS256".to_string(),
            key_use: "sig".to_string(),
            kid: kid.to_string(),
            n: components.n.clone(),
            e: components.e.clone(),
        }
    }
}
