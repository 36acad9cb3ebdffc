//! Client application model.
//!
//! Clients are the registered third-party applications that request tokens.
//! Registration itself lives outside this server; we only resolve records
//! from a read-only registry.

use serde::{Deserialize, Serialize};

/// A registered client application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier (OAuth `client_id`).
    pub client_id: String,

    /// Client secret for the token endpoint.
    pub client_secret: String,

    /// Display name shown on the consent page.
    pub name: String,

    /// Allow-list of exact redirect URIs.
    pub redirect_uris: Vec<String>,

    /// Forum account that owns this registration.
    pub owner_id: i64,
}

impl Client {
    /// Whether `uri` is on this client's redirect allow-list.
    #[must_use]
    pub fn allows_redirect(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Parses a comma-separated redirect URI allow-list.
    #[must_use]
    pub fn parse_redirect_uris(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// The built-in test client's `client_id`.
pub const BUILTIN_TEST_CLIENT_ID: &str = "test";

/// A client as resolved by the registry.
///
/// The built-in test client is a distinct variant rather than a magic string,
/// so the secret-check bypass is visible in the type at every call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedClient {
    /// A normal registered client. The secret must be validated.
    Registered(Client),

    /// The built-in test client. Secret validation is skipped.
    Builtin(Client),
}

impl ResolvedClient {
    /// The built-in test client, always resolvable regardless of registry
    /// state. Only loopback redirect URIs are allowed.
    #[must_use]
    pub fn builtin_test() -> Self {
        Self::Builtin(Client {
            client_id: BUILTIN_TEST_CLIENT_ID.to_string(),
            client_secret: "__TEST_APP_NO_SECRET__".to_string(),
            name: "Test App (Built-in)".to_string(),
            redirect_uris: Client::parse_redirect_uris(
                "http://localhost:8080/,http://localhost:3000/,http://127.0.0.1:8080/,http://127.0.0.1:3000/",
            ),
            owner_id: 0,
        })
    }

    /// The underlying client record.
    #[must_use]
    pub fn client(&self) -> &Client {
        match self {
            Self::Registered(client) | Self::Builtin(client) => client,
        }
    }

    /// Whether the token endpoint must validate the client secret.
    #[must_use]
    pub const fn requires_secret_check(&self) -> bool {
        matches!(self, Self::Registered(_))
    }
}
