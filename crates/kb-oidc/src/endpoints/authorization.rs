//! Authorization and SSO callback endpoint handlers.
//!
//! `GET /auth` starts the flow: the client application sends the browser
//! here, and we bounce it onward to the identity provider with a signed
//! payload. `GET /callback` receives the provider's signed answer and turns
//! it into a pending consent.

use askama::Template;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use tower_cookies::Cookies;

use kb_crypto::generate_nonce;
use kb_model::UserIdentity;

use crate::error::FlowError;
use crate::session::{PendingConsent, PendingSsoSession};

use super::state::{ClientRegistry, FlowProviders, IdentityResolver, OidcState};
use super::{CONSENT_COOKIE, OIDC_SESSION_COOKIE, clear_flow_cookie, flow_cookie, set_flow_cookie};

/// Inline placeholder shown when the user has no avatar.
const AVATAR_PLACEHOLDER: &str = "data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 100 100'%3E%3Ccircle cx='50' cy='50' r='50' fill='%23ddd'/%3E%3C/svg%3E";

/// Query parameters of the authorization request.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthRequest {
    /// Requesting client.
    pub client_id: Option<String>,

    /// Requested redirect URI; must be on the client's allow-list.
    pub redirect_uri: Option<String>,

    /// Requested scope; defaults to `openid`.
    pub scope: Option<String>,

    /// Opaque client state, echoed back on the final redirect.
    pub state: Option<String>,

    /// OAuth response type.
    pub response_type: Option<String>,

    /// The client's OIDC nonce for the ID token.
    pub nonce: Option<String>,
}

/// Query parameters of the SSO callback.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackParams {
    /// Signed SSO payload.
    pub sso: Option<String>,

    /// Hex HMAC signature over the payload.
    pub sig: Option<String>,
}

/// Consent page rendered after a successful SSO round trip.
#[derive(Template)]
#[template(path = "consent.html")]
struct ConsentTemplate {
    app_name: String,
    display_name: String,
    username: String,
    avatar_url: String,
    authorize_url: String,
    deny_url: String,
}

/// GET `/auth`
///
/// Starts the authorization flow. On success the browser is redirected to
/// the identity provider and a session cookie correlates the eventual
/// callback with this request.
///
/// Client configuration errors terminate with a plain-text 400; there is no
/// verified redirect URI to send the user back to at this point.
pub async fn auth<P: FlowProviders>(
    State(state): State<OidcState<P>>,
    cookies: Cookies,
    Query(request): Query<AuthRequest>,
) -> Response {
    match handle_auth(&state, &cookies, &request).await {
        Ok(redirect) => redirect.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle_auth<P: FlowProviders>(
    state: &OidcState<P>,
    cookies: &Cookies,
    request: &AuthRequest,
) -> Result<Redirect, FlowError> {
    let client_id = request.client_id.as_deref().unwrap_or("");
    let resolved = state
        .providers
        .resolve(client_id)
        .await?
        .ok_or(FlowError::UnknownClient)?;

    let redirect_uri = request.redirect_uri.clone().unwrap_or_default();
    if !resolved.client().allows_redirect(&redirect_uri) {
        return Err(FlowError::UnregisteredRedirect);
    }

    let nonce = generate_nonce();
    let session = PendingSsoSession {
        nonce: nonce.clone(),
        client_id: client_id.to_string(),
        redirect_uri,
        scope: request
            .scope
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "openid".to_string()),
        state: request.state.clone(),
        response_type: request.response_type.clone(),
        oidc_nonce: request.nonce.clone(),
    };

    let session_id = state.flows.create_sso_session(&session).await?;
    set_flow_cookie(
        cookies,
        OIDC_SESSION_COOKIE,
        session_id,
        state.config.ttls.session,
    );

    let sso_url = state
        .sso
        .authorization_url(&state.config.callback_url(), &nonce);
    tracing::debug!(client_id, "redirecting browser to identity provider");
    Ok(Redirect::to(&sso_url))
}

/// GET `/callback`
///
/// Receives the identity provider's signed response. The pending session is
/// consumed (it cannot be replayed), the response is validated against the
/// session's nonce, and the user is shown the consent page.
pub async fn callback<P: FlowProviders>(
    State(state): State<OidcState<P>>,
    cookies: Cookies,
    Query(params): Query<CallbackParams>,
) -> Response {
    match handle_callback(&state, &cookies, &params).await {
        Ok(html) => html.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle_callback<P: FlowProviders>(
    state: &OidcState<P>,
    cookies: &Cookies,
    params: &CallbackParams,
) -> Result<Html<String>, FlowError> {
    // The session identifier comes exclusively from our own cookie; a
    // provider-supplied identifier could be spoofed across sessions.
    let session_id =
        flow_cookie(cookies, OIDC_SESSION_COOKIE).ok_or(FlowError::InvalidSession)?;
    let session = state
        .flows
        .take_sso_session(&session_id)
        .await?
        .ok_or(FlowError::InvalidSession)?;

    let sso = params.sso.as_deref().unwrap_or("");
    let sig = params.sig.as_deref().unwrap_or("");
    let response = state
        .sso
        .validate_response(sso, sig, &session.nonce)
        .map_err(|e| FlowError::Authentication(e.to_string()))?;

    let username = response.username().unwrap_or("").to_string();
    let local = state.providers.resolve_local_user(&username).await?;
    let user = UserIdentity {
        external_id: response.external_id().unwrap_or("").to_string(),
        username: username.clone(),
        name: response
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| username.clone()),
        email: response.email().unwrap_or("").to_string(),
        avatar_url: response.avatar_url().unwrap_or("").to_string(),
        trust_level: local.map_or(0, |u| u.trust_level),
    };

    // The client may have been deleted mid-flight; fall back to its id.
    let app_name = match state.providers.resolve(&session.client_id).await? {
        Some(resolved) => resolved.client().name.clone(),
        None => session.client_id.clone(),
    };

    let consent = PendingConsent {
        client_id: session.client_id,
        app_name: app_name.clone(),
        redirect_uri: session.redirect_uri,
        scope: session.scope,
        state: session.state,
        oidc_nonce: session.oidc_nonce,
        user: user.clone(),
    };
    let consent_token = state.flows.create_consent(&consent).await?;

    clear_flow_cookie(cookies, OIDC_SESSION_COOKIE);
    set_flow_cookie(
        cookies,
        CONSENT_COOKIE,
        consent_token,
        state.config.ttls.consent,
    );

    tracing::info!(username = %user.username, app = %app_name, "rendering consent page");
    let page = ConsentTemplate {
        app_name,
        display_name: user.name,
        username: user.username,
        avatar_url: if user.avatar_url.is_empty() {
            AVATAR_PLACEHOLDER.to_string()
        } else {
            user.avatar_url
        },
        authorize_url: state.config.authorize_url(),
        deny_url: state.config.deny_url(),
    };
    let body = page
        .render()
        .map_err(|e| FlowError::Internal(e.to_string()))?;
    Ok(Html(body))
}
