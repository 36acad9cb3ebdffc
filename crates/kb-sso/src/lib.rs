//! # kb-sso
//!
//! Bridge to the forum's signed-redirect SSO scheme.
//!
//! The handshake is two redirects. Outbound, we send the browser to the
//! identity provider with a base64 payload carrying a nonce and our callback
//! URL, signed with HMAC-SHA256 under a shared secret. Inbound, the provider
//! redirects back with its own signed payload describing the authenticated
//! user; we verify the signature in constant time and require the nonce we
//! minted to come back unchanged. The nonce round trip is the sole defense
//! against replaying a captured SSO response into another session.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use std::collections::HashMap;

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;

use kb_crypto::{constant_time_eq, hmac_sha256_hex};

/// Errors from SSO URL generation and response validation.
#[derive(Debug, Error)]
pub enum SsoError {
    /// The response signature does not match the payload.
    #[error("invalid signature")]
    InvalidSignature,

    /// The response nonce does not match the one we issued.
    #[error("nonce mismatch")]
    NonceMismatch,

    /// The payload is not valid base64 or not a query string.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Result type for SSO operations.
pub type SsoResult<T> = Result<T, SsoError>;

/// The validated, decoded parameters of an SSO response.
#[derive(Debug, Clone)]
pub struct SsoResponse {
    params: HashMap<String, String>,
}

impl SsoResponse {
    /// Looks up an arbitrary response parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The authenticated user's stable external identifier.
    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.get("external_id")
    }

    /// The authenticated user's username.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.get("username")
    }

    /// The authenticated user's display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    /// The authenticated user's email address.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.get("email")
    }

    /// The authenticated user's avatar URL.
    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.get("avatar_url")
    }
}

/// Builds outbound SSO redirect URLs and validates inbound responses.
pub struct SsoBridge {
    secret: String,
    provider_base: String,
}

impl SsoBridge {
    /// Creates a bridge for the provider at `provider_base`, signing with
    /// `secret`. A trailing slash on the base URL is ignored.
    pub fn new(secret: impl Into<String>, provider_base: impl Into<String>) -> Self {
        let provider_base = provider_base.into();
        Self {
            secret: secret.into(),
            provider_base: provider_base.trim_end_matches('/').to_string(),
        }
    }

    /// Builds the signed redirect URL that sends the browser to the identity
    /// provider, instructing it to return to `callback_url` with `nonce`.
    #[must_use]
    pub fn authorization_url(&self, callback_url: &str, nonce: &str) -> String {
        let payload = format!("nonce={nonce}&return_sso_url={callback_url}");
        let encoded = STANDARD.encode(payload);
        let sig = hmac_sha256_hex(self.secret.as_bytes(), encoded.as_bytes());
        format!(
            "{}/session/sso_provider?sso={}&sig={}",
            self.provider_base,
            urlencoding::encode(&encoded),
            sig
        )
    }

    /// Validates an SSO response.
    ///
    /// The HMAC is recomputed over the raw `sso` value and compared against
    /// `sig` in constant time, then the payload is base64-decoded and parsed
    /// as a form-urlencoded query. The embedded nonce must equal
    /// `expected_nonce`.
    ///
    /// # Errors
    ///
    /// [`SsoError::InvalidSignature`] on signature mismatch,
    /// [`SsoError::NonceMismatch`] if the nonce differs, and
    /// [`SsoError::MalformedPayload`] if the payload cannot be decoded.
    pub fn validate_response(
        &self,
        sso: &str,
        sig: &str,
        expected_nonce: &str,
    ) -> SsoResult<SsoResponse> {
        let computed = hmac_sha256_hex(self.secret.as_bytes(), sso.as_bytes());
        if !constant_time_eq(computed.as_bytes(), sig.as_bytes()) {
            return Err(SsoError::InvalidSignature);
        }

        let decoded = STANDARD
            .decode(sso)
            .map_err(|e| SsoError::MalformedPayload(e.to_string()))?;

        let params: HashMap<String, String> = url::form_urlencoded::parse(&decoded)
            .into_owned()
            .collect();

        if params.get("nonce").map(String::as_str) != Some(expected_nonce) {
            return Err(SsoError::NonceMismatch);
        }

        Ok(SsoResponse { params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "d836444a9e4084d5b224a60c208dce14";

    fn bridge() -> SsoBridge {
        SsoBridge::new(SECRET, "https://forum.example/")
    }

    /// Signs a payload the way the identity provider would.
    fn provider_response(payload: &str) -> (String, String) {
        let encoded = STANDARD.encode(payload);
        let sig = hmac_sha256_hex(SECRET.as_bytes(), encoded.as_bytes());
        (encoded, sig)
    }

    #[test]
    fn authorization_url_signature_verifies() {
        let url = bridge().authorization_url("https://idp.example/callback", "abc123");
        assert!(url.starts_with("https://forum.example/session/sso_provider?sso="));

        let parsed = url::Url::parse(&url).unwrap();
        let pairs: HashMap<String, String> = parsed.query_pairs().into_owned().collect();
        let sso = &pairs["sso"];
        let sig = &pairs["sig"];

        assert_eq!(
            &hmac_sha256_hex(SECRET.as_bytes(), sso.as_bytes()),
            sig
        );

        let decoded = String::from_utf8(STANDARD.decode(sso).unwrap()).unwrap();
        assert_eq!(
            decoded,
            "nonce=abc123&return_sso_url=https://idp.example/callback"
        );
    }

    #[test]
    fn validate_accepts_well_signed_response() {
        let (sso, sig) =
            provider_response("nonce=abc123&username=alice&external_id=42&email=a%40b.c");
        let response = bridge().validate_response(&sso, &sig, "abc123").unwrap();
        assert_eq!(response.username(), Some("alice"));
        assert_eq!(response.external_id(), Some("42"));
        assert_eq!(response.email(), Some("a@b.c"));
        assert_eq!(response.avatar_url(), None);
    }

    #[test]
    fn validate_rejects_wrong_signature() {
        let (sso, sig) = provider_response("nonce=abc123&username=alice");
        // Flip one character of the hex signature.
        let mut tampered = sig.into_bytes();
        tampered[0] = if tampered[0] == b'0' { b'1' } else { b'0' };
        let tampered = String::from_utf8(tampered).unwrap();

        let err = bridge()
            .validate_response(&sso, &tampered, "abc123")
            .unwrap_err();
        assert!(matches!(err, SsoError::InvalidSignature));
    }

    #[test]
    fn validate_rejects_mutated_payload() {
        let (sso, sig) = provider_response("nonce=abc123&username=alice");
        let mutated = format!("{sso}A");
        let err = bridge()
            .validate_response(&mutated, &sig, "abc123")
            .unwrap_err();
        assert!(matches!(err, SsoError::InvalidSignature));
    }

    #[test]
    fn validate_rejects_nonce_mismatch() {
        let (sso, sig) = provider_response("nonce=other&username=alice");
        let err = bridge()
            .validate_response(&sso, &sig, "abc123")
            .unwrap_err();
        assert!(matches!(err, SsoError::NonceMismatch));
    }

    #[test]
    fn validate_rejects_payload_without_nonce() {
        let (sso, sig) = provider_response("username=alice");
        let err = bridge()
            .validate_response(&sso, &sig, "abc123")
            .unwrap_err();
        assert!(matches!(err, SsoError::NonceMismatch));
    }

    #[test]
    fn trailing_slash_on_provider_base_is_ignored() {
        let with = SsoBridge::new(SECRET, "https://forum.example/");
        let without = SsoBridge::new(SECRET, "https://forum.example");
        assert_eq!(
            with.authorization_url("https://cb", "n"),
            without.authorization_url("https://cb", "n")
        );
    }
}
