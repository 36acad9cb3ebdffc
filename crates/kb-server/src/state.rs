//! Application state shared across request handlers.

use std::sync::Arc;

use kb_oidc::endpoints::OidcState;

use crate::config::ServerConfig;
use crate::providers::Providers;

/// Application state: configuration plus the protocol endpoint state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// State for the protocol endpoints.
    pub oidc: OidcState<Providers>,
}

impl AppState {
    /// Creates the application state.
    pub fn new(config: ServerConfig, oidc: OidcState<Providers>) -> Self {
        Self {
            config: Arc::new(config),
            oidc,
        }
    }
}
