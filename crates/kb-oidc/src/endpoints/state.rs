//! Shared state and collaborator traits for the flow endpoints.

use std::sync::Arc;

use async_trait::async_trait;

use kb_model::{AuthorizationRecord, LocalUser, ResolvedClient};
use kb_sso::SsoBridge;

use crate::error::OidcResult;
use crate::session::{FlowStore, FlowTtls};
use crate::token::TokenManager;

/// Read-only lookup of registered client applications.
///
/// Implementations must always resolve the built-in test client, regardless
/// of registry contents.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Resolves a `client_id` to its registration, or `None` if unknown.
    async fn resolve(&self, client_id: &str) -> OidcResult<Option<ResolvedClient>>;
}

/// Resolution of SSO usernames to local forum accounts.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Looks up the local account for an SSO username. `None` when the
    /// account is unknown locally; callers fall back to trust level 0.
    async fn resolve_local_user(&self, username: &str) -> OidcResult<Option<LocalUser>>;
}

/// Sink for authorization decisions.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Records an approved or denied authorization.
    async fn record_authorization(&self, record: &AuthorizationRecord) -> OidcResult<()>;
}

/// The bundle of collaborators the flow endpoints need.
pub trait FlowProviders: ClientRegistry + IdentityResolver + AuditSink + 'static {}

impl<T: ClientRegistry + IdentityResolver + AuditSink + 'static> FlowProviders for T {}

/// Flow-level configuration, injected at construction.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Issuer base URL, without trailing slash. All endpoint URLs and the
    /// `iss` claim derive from it.
    pub issuer: String,

    /// Domain of synthesized relay email addresses.
    pub relay_email_domain: String,

    /// TTLs for the flow artifacts.
    pub ttls: FlowTtls,
}

impl OidcConfig {
    /// Creates a config for `issuer`, normalizing a trailing slash.
    pub fn new(issuer: impl Into<String>, relay_email_domain: impl Into<String>) -> Self {
        let issuer: String = issuer.into();
        Self {
            issuer: issuer.trim_end_matches('/').to_string(),
            relay_email_domain: relay_email_domain.into(),
            ttls: FlowTtls::default(),
        }
    }

    /// The SSO callback URL the identity provider returns to.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("{}/callback", self.issuer)
    }

    /// The consent approval form action.
    #[must_use]
    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.issuer)
    }

    /// The consent denial form action.
    #[must_use]
    pub fn deny_url(&self) -> String {
        format!("{}/deny", self.issuer)
    }
}

/// Shared state for the flow endpoints.
pub struct OidcState<P: FlowProviders> {
    /// Flow configuration.
    pub config: Arc<OidcConfig>,

    /// Token signing and verification.
    pub tokens: Arc<TokenManager>,

    /// Ephemeral flow artifacts.
    pub flows: Arc<FlowStore>,

    /// Bridge to the forum's SSO scheme.
    pub sso: Arc<SsoBridge>,

    /// Client registry, identity resolution and audit.
    pub providers: Arc<P>,
}

// Manual impl: deriving would wrongly require `P: Clone`.
impl<P: FlowProviders> Clone for OidcState<P> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            tokens: self.tokens.clone(),
            flows: self.flows.clone(),
            sso: self.sso.clone(),
            providers: self.providers.clone(),
        }
    }
}

impl<P: FlowProviders> OidcState<P> {
    /// Creates the endpoint state.
    pub fn new(
        config: OidcConfig,
        tokens: TokenManager,
        flows: FlowStore,
        sso: SsoBridge,
        providers: Arc<P>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            flows: Arc::new(flows),
            sso: Arc::new(sso),
            providers,
        }
    }
}
