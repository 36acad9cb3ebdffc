//! Router for the authorization flow endpoints.

use axum::Router;
use axum::routing::{get, post};

use super::authorization::{auth, callback};
use super::consent::{authorize, deny};
use super::discovery::{certs, openid_configuration};
use super::introspection::introspect;
use super::revocation::revoke;
use super::state::{FlowProviders, OidcState};
use super::token::token;
use super::userinfo::userinfo;

/// Creates the protocol router.
///
/// | Method | Path | Handler |
/// |--------|------|---------|
/// | GET | `/auth` | start the flow, redirect to the identity provider |
/// | GET | `/callback` | validate the SSO response, render consent |
/// | POST | `/authorize` | approve: mint code, redirect to client |
/// | POST | `/deny` | deny: error redirect to client |
/// | POST | `/token` | redeem code for tokens |
/// | GET | `/userinfo` | cached profile for a bearer token |
/// | GET | `/certs` | JSON Web Key Set |
/// | POST | `/introspect` | token introspection |
/// | POST | `/revoke` | no-op revocation |
/// | GET | `/.well-known/openid-configuration` | discovery document |
///
/// The caller supplies the state (and a `CookieManagerLayer` on the outer
/// router; the flow handlers read and set cookies).
pub fn oidc_router<P: FlowProviders>() -> Router<OidcState<P>> {
    Router::new()
        .route("/auth", get(auth::<P>))
        .route("/callback", get(callback::<P>))
        .route("/authorize", post(authorize::<P>))
        .route("/deny", post(deny::<P>))
        .route("/token", post(token::<P>))
        .route("/userinfo", get(userinfo::<P>))
        .route("/certs", get(certs::<P>))
        .route("/introspect", post(introspect::<P>))
        .route("/revoke", post(revoke))
        .route(
            "/.well-known/openid-configuration",
            get(openid_configuration::<P>),
        )
}
