//! Token endpoint handler.
//!
//! Implements POST `/token` for the `authorization_code` grant, the only
//! grant this provider supports. Errors follow RFC 6749 §5.2: structured
//! JSON bodies with OAuth error codes, 400 for grant problems and 401 for
//! client authentication problems.

use axum::Form;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;

use kb_crypto::constant_time_eq;

use crate::error::OidcError;
use crate::session::CachedUserInfo;
use crate::token::TokenResponse;

use super::state::{ClientRegistry, FlowProviders, OidcState};

/// Form body of the token request.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    /// Grant type; must be `authorization_code`.
    pub grant_type: Option<String>,

    /// The authorization code being redeemed.
    pub code: Option<String>,

    /// Client identifier (alternatively via Basic auth).
    pub client_id: Option<String>,

    /// Client secret (alternatively via Basic auth).
    pub client_secret: Option<String>,

    /// Redirect URI, validated against the code when supplied.
    pub redirect_uri: Option<String>,
}

/// POST `/token`
///
/// Exchanges an authorization code for tokens. The code is consumed
/// atomically before any further validation, so a second redemption of the
/// same code always fails with `invalid_grant`.
pub async fn token<P: FlowProviders>(
    State(state): State<OidcState<P>>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Response {
    match handle_token(&state, &headers, &request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(ref err) => error_response(err),
    }
}

async fn handle_token<P: FlowProviders>(
    state: &OidcState<P>,
    headers: &HeaderMap,
    request: &TokenRequest,
) -> Result<TokenResponse, OidcError> {
    if request.grant_type.as_deref() != Some("authorization_code") {
        return Err(OidcError::UnsupportedGrantType(
            "only authorization_code is supported".to_string(),
        ));
    }

    let code = request
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| OidcError::InvalidRequest("missing code parameter".to_string()))?;

    // Single use: consume before validating anything else.
    let entry = state
        .flows
        .take_auth_code(code)
        .await?
        .ok_or_else(|| {
            OidcError::InvalidGrant("invalid or expired authorization code".to_string())
        })?;

    // Basic auth wins over form fields.
    let (basic_id, basic_secret) = basic_credentials(headers);
    let client_id = basic_id.or_else(|| request.client_id.clone());
    let client_secret = basic_secret.or_else(|| request.client_secret.clone());

    if let Some(ref supplied) = client_id
        && supplied != &entry.client_id
    {
        return Err(OidcError::InvalidGrant("client_id mismatch".to_string()));
    }

    if let Some(ref supplied) = request.redirect_uri
        && !supplied.is_empty()
        && supplied != &entry.redirect_uri
    {
        return Err(OidcError::InvalidGrant("redirect_uri mismatch".to_string()));
    }

    let client_id = client_id.unwrap_or_else(|| entry.client_id.clone());
    let resolved = state
        .providers
        .resolve(&client_id)
        .await?
        .ok_or_else(|| OidcError::InvalidClient("unknown client_id".to_string()))?;

    if resolved.requires_secret_check() {
        let expected = &resolved.client().client_secret;
        let ok = client_secret
            .as_deref()
            .is_some_and(|s| !s.is_empty() && constant_time_eq(s.as_bytes(), expected.as_bytes()));
        if !ok {
            return Err(OidcError::InvalidClient("invalid client_secret".to_string()));
        }
    }

    let user = entry.user;
    let subject = user.external_id.clone();
    let relay_email = user.relay_email(&state.config.relay_email_domain);

    let access_token =
        state
            .tokens
            .sign_access_token(&state.config.issuer, &subject, &client_id, &entry.scope)?;

    let id_token = if entry.scope.contains("openid") {
        Some(state.tokens.sign_id_token(
            &state.config.issuer,
            &client_id,
            &user,
            &relay_email,
            entry.oidc_nonce.as_deref(),
        )?)
    } else {
        None
    };

    // Cache the privacy projection so /userinfo can answer without the
    // access token carrying the full profile.
    state
        .flows
        .cache_userinfo(
            &subject,
            &CachedUserInfo {
                id: subject.clone(),
                username: user.username.clone(),
                name: user.name.clone(),
                avatar_url: user.avatar_url.clone(),
                trust_level: user.trust_level,
                email: relay_email,
                active: true,
                silenced: false,
            },
        )
        .await?;

    tracing::info!(client_id = %client_id, subject = %subject, "issued tokens");
    Ok(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.config().access_token_lifespan,
        id_token,
        scope: Some(entry.scope),
    })
}

/// Extracts client credentials from a Basic authorization header, if one is
/// present and well-formed. Malformed headers are treated as absent; the
/// form-body credentials then apply.
fn basic_credentials(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let Some(value) = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
    else {
        return (None, None);
    };

    let Ok(decoded) = STANDARD.decode(value.trim()) else {
        return (None, None);
    };
    let Ok(credentials) = String::from_utf8(decoded) else {
        return (None, None);
    };
    match credentials.split_once(':') {
        Some((id, secret)) => (Some(id.to_string()), Some(secret.to_string())),
        None => (None, None),
    }
}

/// Converts an [`OidcError`] to an HTTP response.
fn error_response(err: &OidcError) -> Response {
    if matches!(err, OidcError::Internal(_) | OidcError::TokenSigning(_)) {
        tracing::error!(error = %err, "token endpoint failed");
    }
    (err.http_status(), Json(err.to_error_response())).into_response()
}
