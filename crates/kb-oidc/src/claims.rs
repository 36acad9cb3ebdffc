//! JWT claim types for issued tokens.
//!
//! Implements the claim sets defined in RFC 7519 and `OpenID` Connect Core
//! 1.0, restricted to what this provider actually issues. Optional claims are
//! omitted from the encoded token rather than serialized as null.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audience claim: a single value or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// A single audience value.
    Single(String),
    /// Multiple audience values.
    Multiple(Vec<String>),
}

impl Audience {
    /// Whether the audience contains `client_id`.
    #[must_use]
    pub fn contains(&self, client_id: &str) -> bool {
        match self {
            Self::Single(aud) => aud == client_id,
            Self::Multiple(auds) => auds.iter().any(|a| a == client_id),
        }
    }
}

impl From<&str> for Audience {
    fn from(client_id: &str) -> Self {
        // Tokens always carry the audience as an array.
        Self::Multiple(vec![client_id.to_string()])
    }
}

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Issuer URL of this authorization server.
    pub iss: String,

    /// Subject: the user's stable external identifier.
    pub sub: String,

    /// Audience: the client the token was issued to.
    pub aud: Audience,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued-at time (Unix timestamp).
    pub iat: i64,

    /// Granted scope.
    pub scope: String,

    /// Client the token was issued to, as a plain claim.
    pub client_id: String,
}

impl AccessTokenClaims {
    /// Creates access token claims expiring at `expires_at`.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        client_id: &str,
        scope: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            aud: Audience::from(client_id),
            exp: expires_at.timestamp(),
            iat: Utc::now().timestamp(),
            scope: scope.into(),
            client_id: client_id.to_string(),
        }
    }

    /// Checks if the token is expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// ID token claims, issued only when the granted scope includes `openid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Issuer URL of this authorization server.
    pub iss: String,

    /// Subject: the user's stable external identifier.
    pub sub: String,

    /// Audience: the client the token was issued to.
    pub aud: Audience,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued-at time (Unix timestamp).
    pub iat: i64,

    /// Time of authentication (Unix timestamp).
    pub auth_time: i64,

    /// The client's OIDC nonce, echoed back when it supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Privacy-relay email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Whether the email is verified (always true for relay addresses).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    /// Forum username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Forum trust level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_level: Option<i64>,
}

impl IdTokenClaims {
    /// Creates minimal ID token claims expiring at `expires_at`.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        client_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            aud: Audience::from(client_id),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            auth_time: now.timestamp(),
            nonce: None,
            email: None,
            email_verified: None,
            preferred_username: None,
            name: None,
            picture: None,
            trust_level: None,
        }
    }

    /// Sets the nonce.
    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Sets the email claims.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self.email_verified = Some(true);
        self
    }

    /// Sets the username.
    #[must_use]
    pub fn with_preferred_username(mut self, username: impl Into<String>) -> Self {
        self.preferred_username = Some(username.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the avatar URL.
    #[must_use]
    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }

    /// Sets the trust level.
    #[must_use]
    pub const fn with_trust_level(mut self, trust_level: i64) -> Self {
        self.trust_level = Some(trust_level);
        self
    }
}
