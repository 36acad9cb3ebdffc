//! # kb-oidc
//!
//! The OAuth2/`OpenID` Connect protocol core of keybridge.
//!
//! This crate contains everything between "browser arrives at `/auth`" and
//! "client holds verified tokens":
//!
//! - [`claims`] - JWT claim types for access and ID tokens
//! - [`token`] - the [`token::TokenManager`] signing and verifying RS256 JWTs
//! - [`jwks`] - the published JSON Web Key Set
//! - [`discovery`] - the `OpenID` Provider metadata document
//! - [`session`] - the ephemeral, single-use flow records and their store
//! - [`endpoints`] - axum handlers and the router for the full flow
//!
//! The flow itself is a six-transition state machine driven by browser
//! redirects; see [`endpoints`] for the transition table.

#![forbid(unsafe_code)]

pub mod claims;
pub mod discovery;
pub mod endpoints;
pub mod error;
pub mod jwks;
pub mod session;
pub mod token;

pub use claims::{AccessTokenClaims, Audience, IdTokenClaims};
pub use discovery::ProviderMetadata;
pub use error::{ErrorResponse, FlowError, OidcError, OidcResult};
pub use jwks::{JsonWebKey, JsonWebKeySet};
pub use session::{
    CachedUserInfo, FlowStore, FlowTtls, IssuedAuthorizationCode, PendingConsent,
    PendingSsoSession,
};
pub use token::{IntrospectionResponse, TokenConfig, TokenManager, TokenResponse};
