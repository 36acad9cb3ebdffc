//! Protocol error types.
//!
//! Two families of errors leave this server, matching what OAuth2 consumers
//! expect:
//!
//! - [`OidcError`] - grant validation failures on the token endpoint,
//!   rendered as structured JSON error bodies (RFC 6749 §5.2).
//! - [`FlowError`] - failures in the browser-facing flow (unknown client,
//!   expired session or consent, SSO validation), rendered as plain-text
//!   responses because there is no verified redirect URI to send the user
//!   back to.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OAuth 2.0 / OIDC protocol errors.
#[derive(Debug, Error)]
pub enum OidcError {
    /// Invalid request parameters.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    /// Client authentication failed.
    #[error("invalid_client: {0}")]
    InvalidClient(String),

    /// Invalid or expired authorization grant.
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    /// Unsupported grant type.
    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),

    /// Token signing error.
    #[error("token signing failed: {0}")]
    TokenSigning(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OidcError {
    /// Returns the OAuth 2.0 error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::TokenSigning(_) | Self::Internal(_) => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidGrant(_) | Self::UnsupportedGrantType(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidClient(_) => StatusCode::UNAUTHORIZED,
            Self::TokenSigning(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Builds the JSON error body for this error.
    #[must_use]
    pub fn to_error_response(&self) -> ErrorResponse {
        let description = match self {
            Self::InvalidRequest(d)
            | Self::InvalidClient(d)
            | Self::InvalidGrant(d)
            | Self::UnsupportedGrantType(d)
            | Self::TokenSigning(d)
            | Self::Internal(d) => d.clone(),
        };
        ErrorResponse {
            error: self.error_code().to_string(),
            error_description: Some(description),
        }
    }
}

impl From<kb_store::StoreError> for OidcError {
    fn from(e: kb_store::StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

/// OAuth 2.0 error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Result type for protocol operations.
pub type OidcResult<T> = Result<T, OidcError>;

/// Failures in the browser-facing flow.
///
/// These terminate the flow with a plain-text response. Expired and
/// never-existed sessions produce the same message on purpose.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The `client_id` does not resolve in the registry.
    #[error("unknown client_id")]
    UnknownClient,

    /// The redirect URI is not on the client's allow-list.
    #[error("redirect_uri not registered for this app")]
    UnregisteredRedirect,

    /// The session cookie is missing or the session is gone.
    #[error("invalid session, please try again")]
    InvalidSession,

    /// The consent cookie is missing or the consent is gone.
    #[error("consent expired, please try again")]
    ConsentExpired,

    /// SSO response validation failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Internal error.
    #[error("internal error")]
    Internal(String),
}

impl FlowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::UnknownClient
            | Self::UnregisteredRedirect
            | Self::InvalidSession
            | Self::ConsentExpired
            | Self::Authentication(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OidcError> for FlowError {
    fn from(e: OidcError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl IntoResponse for FlowError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref detail) = self {
            tracing::error!(detail, "authorization flow failed");
        }
        (self.http_status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_match_rfc6749() {
        assert_eq!(
            OidcError::UnsupportedGrantType(String::new()).error_code(),
            "unsupported_grant_type"
        );
        assert_eq!(
            OidcError::InvalidGrant(String::new()).error_code(),
            "invalid_grant"
        );
        assert_eq!(
            OidcError::InvalidClient(String::new()).http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            OidcError::InvalidGrant(String::new()).http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn expired_and_missing_consent_read_identically() {
        // Callers must not be able to distinguish replay-of-expired from
        // replay-of-nonexistent.
        assert_eq!(
            FlowError::ConsentExpired.to_string(),
            "consent expired, please try again"
        );
    }

    #[test]
    fn error_response_omits_missing_description() {
        let body = ErrorResponse {
            error: "invalid_grant".to_string(),
            error_description: None,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            "{\"error\":\"invalid_grant\"}"
        );
    }
}
