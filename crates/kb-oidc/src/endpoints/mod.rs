//! Axum handlers for the authorization flow.
//!
//! The flow is a state machine driven by browser redirects:
//!
//! | Transition | Trigger | Consumes | Produces |
//! |---|---|---|---|
//! | `auth` | `GET /auth` | - | pending SSO session + cookie |
//! | `callback` | `GET /callback` | SSO session | pending consent + cookie |
//! | `authorize` | `POST /authorize` | consent | authorization code |
//! | `deny` | `POST /deny` | consent | error redirect |
//! | `token` | `POST /token` | authorization code | signed tokens |
//! | `userinfo` | `GET /userinfo` | - | cached profile |
//!
//! Session and consent identifiers travel exclusively in cookies set by this
//! server; they are never accepted from query parameters or request bodies,
//! so the external identity provider cannot inject them.

pub mod authorization;
pub mod consent;
pub mod discovery;
pub mod introspection;
pub mod revocation;
pub mod router;
pub mod state;
pub mod token;
pub mod userinfo;

pub use router::oidc_router;
pub use state::{
    AuditSink, ClientRegistry, FlowProviders, IdentityResolver, OidcConfig, OidcState,
};

use std::time::Duration;

use tower_cookies::cookie::time::Duration as CookieDuration;
use tower_cookies::{Cookie, Cookies};

/// Cookie carrying the pending SSO session identifier.
pub const OIDC_SESSION_COOKIE: &str = "oidc_session";

/// Cookie carrying the pending consent token.
pub const CONSENT_COOKIE: &str = "consent_token";

/// Sets a flow cookie scoped to the whole site.
fn set_flow_cookie(cookies: &Cookies, name: &'static str, value: String, ttl: Duration) {
    let cookie = Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::seconds(ttl.as_secs().try_into().unwrap_or(i64::MAX)))
        .build();
    cookies.add(cookie);
}

/// Clears a flow cookie.
fn clear_flow_cookie(cookies: &Cookies, name: &'static str) {
    cookies.remove(Cookie::build((name, "")).path("/").build());
}

/// Reads a flow cookie's value.
fn flow_cookie(cookies: &Cookies, name: &str) -> Option<String> {
    cookies
        .get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
