//! Server configuration.
//!
//! Configuration is loaded from environment variables with sensible
//! defaults; only the SSO collaborator settings are required.

use std::path::{Path, PathBuf};
use std::time::Duration;

use kb_oidc::session::FlowTtls;
use kb_oidc::token::TokenConfig;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host to bind to.
    pub host: String,

    /// Server port. Zero picks an ephemeral port.
    pub port: u16,

    /// Issuer base URL; endpoint URLs and the `iss` claim derive from it.
    pub issuer_url: String,

    /// Shared secret for the SSO handshake.
    pub sso_secret: String,

    /// Base URL of the forum identity provider.
    pub sso_provider_url: String,

    /// Domain of synthesized relay email addresses.
    pub relay_email_domain: String,

    /// Path of the persisted signing key.
    pub key_store_path: PathBuf,

    /// Optional JSON file with registered clients.
    pub clients_file: Option<PathBuf>,

    /// Pending SSO session lifetime in seconds.
    pub session_ttl_secs: u64,

    /// Pending consent lifetime in seconds.
    pub consent_ttl_secs: u64,

    /// Authorization code lifetime in seconds.
    pub auth_code_ttl_secs: u64,

    /// Cached userinfo lifetime in seconds.
    pub userinfo_ttl_secs: u64,

    /// Access token lifespan in seconds.
    pub access_token_lifespan: i64,

    /// ID token lifespan in seconds.
    pub id_token_lifespan: i64,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let host = std::env::var("KB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("KB_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let issuer_url = std::env::var("KB_ISSUER_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}"));

        let sso_secret = std::env::var("KB_SSO_SECRET")
            .map_err(|_| anyhow::anyhow!("KB_SSO_SECRET environment variable is required"))?;

        let sso_provider_url = std::env::var("KB_SSO_PROVIDER_URL").map_err(|_| {
            anyhow::anyhow!("KB_SSO_PROVIDER_URL environment variable is required")
        })?;

        let relay_email_domain = std::env::var("KB_RELAY_EMAIL_DOMAIN")
            .unwrap_or_else(|_| "privaterelay.example.com".to_string());

        let key_store_path = std::env::var("KB_KEY_STORE_PATH")
            .map_or_else(|_| PathBuf::from("data/signing_key.pem"), PathBuf::from);

        let clients_file = std::env::var("KB_CLIENTS_FILE").ok().map(PathBuf::from);

        Ok(Self {
            host,
            port,
            issuer_url,
            sso_secret,
            sso_provider_url,
            relay_email_domain,
            key_store_path,
            clients_file,
            session_ttl_secs: env_u64("KB_SESSION_TTL", 600),
            consent_ttl_secs: env_u64("KB_CONSENT_TTL", 600),
            auth_code_ttl_secs: env_u64("KB_AUTH_CODE_TTL", 300),
            userinfo_ttl_secs: env_u64("KB_USERINFO_TTL", 21_600),
            access_token_lifespan: env_i64("KB_ACCESS_TOKEN_LIFESPAN", 1_800),
            id_token_lifespan: env_i64("KB_ID_TOKEN_LIFESPAN", 21_600),
        })
    }

    /// Creates a configuration for testing, binding an ephemeral port.
    #[must_use]
    pub fn for_testing(key_store_path: &Path) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            issuer_url: "http://127.0.0.1/oauth-provider".to_string(),
            sso_secret: "test-sso-secret".to_string(),
            sso_provider_url: "https://forum.example".to_string(),
            relay_email_domain: "privaterelay.example.com".to_string(),
            key_store_path: key_store_path.to_path_buf(),
            clients_file: None,
            session_ttl_secs: 600,
            consent_ttl_secs: 600,
            auth_code_ttl_secs: 300,
            userinfo_ttl_secs: 21_600,
            access_token_lifespan: 1_800,
            id_token_lifespan: 21_600,
        }
    }

    /// Flow artifact TTLs.
    #[must_use]
    pub const fn flow_ttls(&self) -> FlowTtls {
        FlowTtls {
            session: Duration::from_secs(self.session_ttl_secs),
            consent: Duration::from_secs(self.consent_ttl_secs),
            auth_code: Duration::from_secs(self.auth_code_ttl_secs),
            userinfo: Duration::from_secs(self.userinfo_ttl_secs),
        }
    }

    /// Token lifespans.
    #[must_use]
    pub const fn token_config(&self) -> TokenConfig {
        TokenConfig {
            access_token_lifespan: self.access_token_lifespan,
            id_token_lifespan: self.id_token_lifespan,
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
