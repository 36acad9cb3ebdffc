//! Collaborator provider implementations.
//!
//! The protocol core consumes three collaborator interfaces: client
//! registry, identity resolution and the audit sink. The implementations
//! here are deliberately thin - an in-memory registry loaded from a JSON
//! file, an in-memory trust-level table, and a structured-log audit sink.
//! A deployment embedded in the forum substitutes its own.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;

use kb_model::{AuthorizationRecord, BUILTIN_TEST_CLIENT_ID, Client, LocalUser, ResolvedClient};
use kb_oidc::endpoints::{AuditSink, ClientRegistry, IdentityResolver};
use kb_oidc::error::OidcResult;

/// In-memory providers backing all three collaborator interfaces.
#[derive(Debug, Default)]
pub struct Providers {
    clients: HashMap<String, Client>,
    trust_levels: HashMap<String, i64>,
}

impl Providers {
    /// Creates empty providers. The built-in test client still resolves.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds providers from the server configuration, loading the client
    /// registry file when one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the clients file cannot be read or parsed.
    pub fn from_config(config: &crate::config::ServerConfig) -> anyhow::Result<Self> {
        let mut providers = Self::new();
        if let Some(ref path) = config.clients_file {
            providers = providers.with_clients(load_clients(path)?);
        }
        Ok(providers)
    }

    /// Adds registered clients.
    #[must_use]
    pub fn with_clients(mut self, clients: Vec<Client>) -> Self {
        for client in clients {
            self.clients.insert(client.client_id.clone(), client);
        }
        self
    }

    /// Sets a user's trust level.
    #[must_use]
    pub fn with_trust_level(mut self, username: &str, trust_level: i64) -> Self {
        self.trust_levels.insert(username.to_string(), trust_level);
        self
    }
}

/// Loads a client registry JSON file: an array of client records.
fn load_clients(path: &Path) -> anyhow::Result<Vec<Client>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read clients file {}: {e}", path.display()))?;
    let clients: Vec<Client> = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("cannot parse clients file {}: {e}", path.display()))?;
    tracing::info!(count = clients.len(), path = %path.display(), "loaded client registry");
    Ok(clients)
}

#[async_trait]
impl ClientRegistry for Providers {
    async fn resolve(&self, client_id: &str) -> OidcResult<Option<ResolvedClient>> {
        if client_id == BUILTIN_TEST_CLIENT_ID {
            return Ok(Some(ResolvedClient::builtin_test()));
        }
        Ok(self
            .clients
            .get(client_id)
            .cloned()
            .map(ResolvedClient::Registered))
    }
}

#[async_trait]
impl IdentityResolver for Providers {
    async fn resolve_local_user(&self, username: &str) -> OidcResult<Option<LocalUser>> {
        Ok(self
            .trust_levels
            .get(username)
            .map(|&trust_level| LocalUser { trust_level }))
    }
}

#[async_trait]
impl AuditSink for Providers {
    async fn record_authorization(&self, record: &AuthorizationRecord) -> OidcResult<()> {
        // Structured audit event; a forum-backed deployment persists these.
        tracing::info!(
            target: "keybridge::audit",
            user_id = record.user_id,
            client_id = %record.client_id,
            app_name = %record.app_name,
            scope = %record.scope,
            decision = %record.decision,
            "authorization decision"
        );
        Ok(())
    }
}
