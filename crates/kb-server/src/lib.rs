//! # kb-server
//!
//! The keybridge server: wires configuration, key bootstrap, collaborator
//! providers and the protocol router into a runnable HTTP service.

#![forbid(unsafe_code)]

pub mod config;
pub mod providers;
pub mod router;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;

use kb_crypto::RsaKeyPair;
use kb_oidc::endpoints::{OidcConfig, OidcState};
use kb_oidc::session::FlowStore;
use kb_oidc::token::TokenManager;
use kb_sso::SsoBridge;
use kb_store::{EphemeralStore, FileKeyStore, KeyStore, MemoryStore};

pub use config::ServerConfig;
pub use providers::Providers;
pub use state::AppState;

/// The assembled server, bound to its listener.
pub struct Server {
    listener: tokio::net::TcpListener,
    router: Router,
}

impl Server {
    /// Builds the server from configuration, loading providers from the
    /// configured registry file.
    ///
    /// # Errors
    ///
    /// Returns an error on configuration, key-bootstrap or bind failure.
    pub async fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let providers = Providers::from_config(&config)?;
        Self::with_providers(config, providers).await
    }

    /// Builds the server with explicit collaborator providers.
    ///
    /// # Errors
    ///
    /// Returns an error on key-bootstrap or bind failure.
    pub async fn with_providers(
        config: ServerConfig,
        providers: Providers,
    ) -> anyhow::Result<Self> {
        let key_store = FileKeyStore::new(&config.key_store_path);
        let key = load_or_generate_key(&key_store).await?;
        tracing::info!(kid = %key.kid(), "signing key ready");

        let tokens = TokenManager::new(&key, config.token_config())?;

        let store: Arc<dyn EphemeralStore> = Arc::new(MemoryStore::new());
        let flows = FlowStore::new(store, config.flow_ttls());

        let sso = SsoBridge::new(&config.sso_secret, &config.sso_provider_url);

        let mut oidc_config = OidcConfig::new(&config.issuer_url, &config.relay_email_domain);
        oidc_config.ttls = config.flow_ttls();

        let oidc = OidcState::new(oidc_config, tokens, flows, sso, Arc::new(providers));
        let state = AppState::new(config, oidc);

        let router = router::create_router(&state);
        let listener = tokio::net::TcpListener::bind((
            state.config.host.as_str(),
            state.config.port,
        ))
        .await?;

        Ok(Self { listener, router })
    }

    /// The address the server is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's address cannot be read.
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves requests until the process is stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!(addr = %self.listener.local_addr()?, "keybridge listening");
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}

/// Loads the persisted signing key, generating and persisting one on first
/// run. Concurrent first runs race on the store; the first writer wins and
/// everyone ends up with the same key.
///
/// # Errors
///
/// Returns an error if the store or key material fails.
pub async fn load_or_generate_key(store: &dyn KeyStore) -> anyhow::Result<RsaKeyPair> {
    if let Some(pem) = store.load().await? {
        return Ok(RsaKeyPair::from_pem(&pem)?);
    }

    let fresh = RsaKeyPair::generate()?;
    let winner = store.store_if_absent(&fresh.private_key_pem()?).await?;
    Ok(RsaKeyPair::from_pem(&winner)?)
}
