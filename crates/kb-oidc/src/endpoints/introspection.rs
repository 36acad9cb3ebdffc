//! Token introspection endpoint handler (RFC 7662).

use axum::Form;
use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use crate::token::IntrospectionResponse;

use super::state::{FlowProviders, OidcState};

/// Form body of the introspection request.
#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectionRequest {
    /// The token to introspect.
    pub token: Option<String>,
}

/// POST `/introspect`
///
/// Reports whether a token is active. "Invalid" is itself a valid
/// introspection result, so any decode failure yields `{active:false}` with
/// status 200, never an error.
pub async fn introspect<P: FlowProviders>(
    State(state): State<OidcState<P>>,
    Form(request): Form<IntrospectionRequest>,
) -> Json<IntrospectionResponse> {
    let response = request
        .token
        .as_deref()
        .and_then(|token| state.tokens.decode_access_token(token))
        .map_or_else(
            IntrospectionResponse::inactive,
            |claims| IntrospectionResponse::from_access_token(&claims),
        );
    Json(response)
}
