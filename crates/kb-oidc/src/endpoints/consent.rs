//! Consent decision endpoint handlers.
//!
//! `POST /authorize` and `POST /deny` consume the pending consent created by
//! the SSO callback and send the browser back to the client's redirect URI,
//! carrying either an authorization code or an `access_denied` error. Either
//! way the decision is recorded for audit.

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use tower_cookies::Cookies;

use kb_model::{AuthorizationDecision, AuthorizationRecord};

use crate::error::FlowError;
use crate::session::{IssuedAuthorizationCode, PendingConsent};

use super::state::{AuditSink, FlowProviders, OidcState};
use super::{CONSENT_COOKIE, clear_flow_cookie, flow_cookie};

/// POST `/authorize`
///
/// The user approved the request. Mints a single-use authorization code and
/// redirects to the client with `code` (and `state` when present).
pub async fn authorize<P: FlowProviders>(
    State(state): State<OidcState<P>>,
    cookies: Cookies,
) -> Response {
    match handle_authorize(&state, &cookies).await {
        Ok(redirect) => redirect.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle_authorize<P: FlowProviders>(
    state: &OidcState<P>,
    cookies: &Cookies,
) -> Result<Redirect, FlowError> {
    let consent = consume_consent(state, cookies).await?;

    let code = state
        .flows
        .create_auth_code(&IssuedAuthorizationCode {
            client_id: consent.client_id.clone(),
            redirect_uri: consent.redirect_uri.clone(),
            user: consent.user.clone(),
            scope: consent.scope.clone(),
            oidc_nonce: consent.oidc_nonce.clone(),
        })
        .await?;

    record_decision(state, &consent, AuthorizationDecision::Approved).await?;

    let mut params = vec![("code", code.as_str())];
    if let Some(ref client_state) = consent.state {
        params.push(("state", client_state));
    }
    let target = append_redirect_params(&consent.redirect_uri, &params)?;

    tracing::info!(
        client_id = %consent.client_id,
        user = %consent.user.username,
        "authorization approved"
    );
    Ok(Redirect::to(&target))
}

/// POST `/deny`
///
/// The user denied the request. Redirects to the client with
/// `error=access_denied`.
pub async fn deny<P: FlowProviders>(
    State(state): State<OidcState<P>>,
    cookies: Cookies,
) -> Response {
    match handle_deny(&state, &cookies).await {
        Ok(redirect) => redirect.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle_deny<P: FlowProviders>(
    state: &OidcState<P>,
    cookies: &Cookies,
) -> Result<Redirect, FlowError> {
    let consent = consume_consent(state, cookies).await?;

    record_decision(state, &consent, AuthorizationDecision::Denied).await?;

    let mut params = vec![
        ("error", "access_denied"),
        ("error_description", "user denied the request"),
    ];
    if let Some(ref client_state) = consent.state {
        params.push(("state", client_state));
    }
    let target = append_redirect_params(&consent.redirect_uri, &params)?;

    tracing::info!(
        client_id = %consent.client_id,
        user = %consent.user.username,
        "authorization denied"
    );
    Ok(Redirect::to(&target))
}

/// Consumes the pending consent addressed by the cookie, clearing the cookie
/// in the process. Consent tokens are never accepted from the request body.
async fn consume_consent<P: FlowProviders>(
    state: &OidcState<P>,
    cookies: &Cookies,
) -> Result<PendingConsent, FlowError> {
    let token = flow_cookie(cookies, CONSENT_COOKIE).ok_or(FlowError::InvalidSession)?;
    let consent = state
        .flows
        .take_consent(&token)
        .await?
        .ok_or(FlowError::ConsentExpired)?;
    clear_flow_cookie(cookies, CONSENT_COOKIE);
    Ok(consent)
}

async fn record_decision<P: FlowProviders>(
    state: &OidcState<P>,
    consent: &PendingConsent,
    decision: AuthorizationDecision,
) -> Result<(), FlowError> {
    let record = AuthorizationRecord {
        user_id: consent.user.external_id.parse().unwrap_or(0),
        client_id: consent.client_id.clone(),
        app_name: consent.app_name.clone(),
        scope: consent.scope.clone(),
        decision,
    };
    state.providers.record_authorization(&record).await?;
    Ok(())
}

/// Appends query parameters to a redirect URI, preserving its existing query.
fn append_redirect_params(
    redirect_uri: &str,
    params: &[(&str, &str)],
) -> Result<String, FlowError> {
    let mut url = url::Url::parse(redirect_uri)
        .map_err(|e| FlowError::Internal(format!("invalid redirect_uri: {e}")))?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url.to_string())
}
