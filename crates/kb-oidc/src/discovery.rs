//! `OpenID` Connect Discovery 1.0 provider metadata.

use serde::{Deserialize, Serialize};

/// `OpenID` Provider Metadata, served at
/// `/.well-known/openid-configuration`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier URL.
    pub issuer: String,

    /// URL of the authorization endpoint.
    pub authorization_endpoint: String,

    /// URL of the token endpoint.
    pub token_endpoint: String,

    /// URL of the `UserInfo` endpoint.
    pub userinfo_endpoint: String,

    /// URL of the JSON Web Key Set document.
    pub jwks_uri: String,

    /// URL of the introspection endpoint.
    pub introspection_endpoint: String,

    /// URL of the revocation endpoint.
    pub revocation_endpoint: String,

    /// Supported response types. Only the authorization code flow exists.
    pub response_types_supported: Vec<String>,

    /// Supported subject identifier types.
    pub subject_types_supported: Vec<String>,

    /// Supported ID token signing algorithms.
    pub id_token_signing_alg_values_supported: Vec<String>,

    /// Supported scopes.
    pub scopes_supported: Vec<String>,

    /// Supported client authentication methods at the token endpoint.
    pub token_endpoint_auth_methods_supported: Vec<String>,

    /// Claims this provider can supply.
    pub claims_supported: Vec<String>,
}

impl ProviderMetadata {
    /// Builds the metadata document for an issuer base URL.
    #[must_use]
    pub fn for_issuer(issuer: &str) -> Self {
        let issuer = issuer.trim_end_matches('/');
        Self {
            issuer: issuer.to_string(),
            authorization_endpoint: format!("{issuer}/auth"),
            token_endpoint: format!("{issuer}/token"),
            userinfo_endpoint: format!("{issuer}/userinfo"),
            jwks_uri: format!("{issuer}/certs"),
            introspection_endpoint: format!("{issuer}/introspect"),
            revocation_endpoint: format!("{issuer}/revoke"),
            response_types_supported: vec!["code".to_string()],
            subject_types_supported: vec!["public".to_string()],
            id_token_signing_alg_values_supported: vec!["RS256".to_string()],
            scopes_supported: vec![
                "openid".to_string(),
                "profile".to_string(),
                "email".to_string(),
            ],
            token_endpoint_auth_methods_supported: vec![
                "client_secret_basic".to_string(),
                "client_secret_post".to_string(),
            ],
            claims_supported: [
                "sub",
                "iss",
                "aud",
                "exp",
                "iat",
                "auth_time",
                "nonce",
                "email",
                "email_verified",
                "preferred_username",
                "name",
                "picture",
                "trust_level",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}
