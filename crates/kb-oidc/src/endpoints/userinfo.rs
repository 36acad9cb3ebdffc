//! `UserInfo` endpoint handler.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::session::CachedUserInfo;

use super::state::{FlowProviders, OidcState};

/// OIDC-shaped profile response.
///
/// Alongside the standard claim names we keep the provider's legacy aliases
/// (`id`, `username`, `avatar_url`) that existing consumers rely on. Empty
/// values are omitted rather than sent as null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfoResponse {
    /// Subject (legacy alias).
    pub id: String,

    /// Subject.
    pub sub: String,

    /// Username (legacy alias).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Username, OIDC name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Relay email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Whether the email is verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    /// Avatar URL (legacy alias).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Avatar URL, OIDC name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Forum trust level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_level: Option<i64>,

    /// Whether the account is active.
    pub active: bool,
}

impl UserInfoResponse {
    /// Builds the full profile response from the cached projection.
    #[must_use]
    pub fn from_cached(info: CachedUserInfo) -> Self {
        let avatar = non_empty(info.avatar_url);
        Self {
            id: info.id.clone(),
            sub: info.id,
            username: Some(info.username.clone()),
            preferred_username: Some(info.username),
            name: non_empty(info.name),
            email: non_empty(info.email),
            email_verified: Some(true),
            avatar_url: avatar.clone(),
            picture: avatar,
            trust_level: Some(info.trust_level),
            active: true,
        }
    }

    /// Minimal response when the cache has expired: the access token alone
    /// does not carry the full profile.
    #[must_use]
    pub fn minimal(subject: &str) -> Self {
        Self {
            id: subject.to_string(),
            sub: subject.to_string(),
            username: None,
            preferred_username: None,
            name: None,
            email: None,
            email_verified: None,
            avatar_url: None,
            picture: None,
            trust_level: None,
            active: true,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// GET `/userinfo`
///
/// Serves the cached profile for the bearer token's subject. Missing or
/// invalid tokens get a 401 with a `WWW-Authenticate` challenge.
pub async fn userinfo<P: FlowProviders>(
    State(state): State<OidcState<P>>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return unauthorized("missing or invalid bearer token");
    };

    let Some(claims) = state.tokens.decode_access_token(&token) else {
        return unauthorized("invalid access token");
    };

    match state.flows.userinfo(&claims.sub).await {
        Ok(Some(info)) => Json(UserInfoResponse::from_cached(info)).into_response(),
        Ok(None) => Json(UserInfoResponse::minimal(&claims.sub)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "userinfo lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Extracts the bearer token from the authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer error=\"invalid_token\"")],
        message.to_string(),
    )
        .into_response()
}
