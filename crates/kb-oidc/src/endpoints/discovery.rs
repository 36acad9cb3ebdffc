//! Discovery and JWKS endpoint handlers.

use axum::Json;
use axum::extract::State;

use crate::discovery::ProviderMetadata;
use crate::jwks::JsonWebKeySet;

use super::state::{FlowProviders, OidcState};

/// GET `/.well-known/openid-configuration`
pub async fn openid_configuration<P: FlowProviders>(
    State(state): State<OidcState<P>>,
) -> Json<ProviderMetadata> {
    Json(ProviderMetadata::for_issuer(&state.config.issuer))
}

/// GET `/certs`
///
/// The published JSON Web Key Set: the single active signing key.
pub async fn certs<P: FlowProviders>(State(state): State<OidcState<P>>) -> Json<JsonWebKeySet> {
    Json(JsonWebKeySet::with_keys(vec![state.tokens.public_jwk()]))
}
