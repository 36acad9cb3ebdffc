//! Token manager: RS256 signing and verification of issued JWTs.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use kb_crypto::RsaKeyPair;
use kb_model::UserIdentity;

use crate::claims::{AccessTokenClaims, IdTokenClaims};
use crate::error::{OidcError, OidcResult};
use crate::jwks::JsonWebKey;

/// Token lifespans.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Access token lifespan in seconds.
    pub access_token_lifespan: i64,

    /// ID token lifespan in seconds.
    pub id_token_lifespan: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_lifespan: 1_800,  // 30 minutes
            id_token_lifespan: 21_600,     // 6 hours
        }
    }
}

/// Signs and verifies the server's RS256 JWTs.
///
/// Holds the single active key. Previously issued tokens stay verifiable
/// across restarts because the key itself is persisted and the `kid` is
/// derived from key content.
pub struct TokenManager {
    kid: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    jwk: JsonWebKey,
    config: TokenConfig,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("kid", &self.kid)
            .field("config", &self.config)
            .field("encoding_key", &"[REDACTED]")
            .finish()
    }
}

impl TokenManager {
    /// Creates a token manager from RSA key material.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be converted for JWT use.
    pub fn new(key: &RsaKeyPair, config: TokenConfig) -> OidcResult<Self> {
        let private_pem = key
            .private_key_pem()
            .map_err(|e| OidcError::TokenSigning(e.to_string()))?;
        let public_pem = key
            .public_key_pem()
            .map_err(|e| OidcError::TokenSigning(e.to_string()))?;

        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| OidcError::TokenSigning(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| OidcError::TokenSigning(e.to_string()))?;

        Ok(Self {
            kid: key.kid().to_string(),
            encoding_key,
            decoding_key,
            jwk: JsonWebKey::from_rsa(key.kid(), &key.public_components()),
            config,
        })
    }

    /// Returns the key ID.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Returns the token configuration.
    #[must_use]
    pub const fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Returns the public key as a JWK.
    #[must_use]
    pub fn public_jwk(&self) -> JsonWebKey {
        self.jwk.clone()
    }

    /// Signs an access token for `subject` issued to `client_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn sign_access_token(
        &self,
        issuer: &str,
        subject: &str,
        client_id: &str,
        scope: &str,
    ) -> OidcResult<String> {
        let expires_at = Utc::now() + Duration::seconds(self.config.access_token_lifespan);
        let claims = AccessTokenClaims::new(issuer, subject, client_id, scope, expires_at);
        self.sign(&claims)
    }

    /// Signs an ID token carrying the user's profile claims.
    ///
    /// `relay_email` replaces the user's real address. Empty profile values
    /// are omitted from the token entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn sign_id_token(
        &self,
        issuer: &str,
        client_id: &str,
        user: &UserIdentity,
        relay_email: &str,
        oidc_nonce: Option<&str>,
    ) -> OidcResult<String> {
        let expires_at = Utc::now() + Duration::seconds(self.config.id_token_lifespan);
        let mut claims = IdTokenClaims::new(issuer, &user.external_id, client_id, expires_at)
            .with_email(relay_email)
            .with_trust_level(user.trust_level);

        if !user.username.is_empty() {
            claims = claims.with_preferred_username(&user.username);
        }
        if !user.name.is_empty() {
            claims = claims.with_name(&user.name);
        }
        if !user.avatar_url.is_empty() {
            claims = claims.with_picture(&user.avatar_url);
        }
        if let Some(nonce) = oidc_nonce.filter(|n| !n.is_empty()) {
            claims = claims.with_nonce(nonce);
        }

        self.sign(&claims)
    }

    /// Verifies an access token's signature and expiry.
    ///
    /// Any verification failure, including tampering and expiry, yields
    /// `None`; verification problems are never surfaced as errors.
    #[must_use]
    pub fn decode_access_token(&self, token: &str) -> Option<AccessTokenClaims> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;

        match decode::<AccessTokenClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "access token failed verification");
                None
            }
        }
    }

    /// Signs a claim set with the active key.
    fn sign<T: Serialize>(&self, claims: &T) -> OidcResult<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        header.typ = Some("JWT".to_string());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| OidcError::TokenSigning(e.to_string()))
    }
}

/// Token endpoint response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,

    /// Token type (always "Bearer").
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: i64,

    /// ID token, present only when the granted scope includes `openid`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Granted scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Introspection endpoint response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrospectionResponse {
    /// Whether the token is active.
    pub active: bool,

    /// Subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Client the token was issued to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Token scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Expiration time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl IntrospectionResponse {
    /// The response for any token that fails verification.
    #[must_use]
    pub const fn inactive() -> Self {
        Self {
            active: false,
            sub: None,
            client_id: None,
            scope: None,
            iss: None,
            exp: None,
        }
    }

    /// The response for a verified access token.
    #[must_use]
    pub fn from_access_token(claims: &AccessTokenClaims) -> Self {
        Self {
            active: true,
            sub: Some(claims.sub.clone()),
            client_id: Some(claims.client_id.clone()),
            scope: Some(claims.scope.clone()),
            iss: Some(claims.iss.clone()),
            exp: Some(claims.exp),
        }
    }
}
