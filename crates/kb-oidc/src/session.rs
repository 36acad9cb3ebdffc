//! Ephemeral flow records and their store.
//!
//! The authorization flow leaves three transient artifacts behind as it
//! progresses: the pending SSO handshake, the pending consent, and the issued
//! authorization code. All three are structurally the same thing - an opaque
//! key mapping to a payload that is written once, consumed at most once, and
//! expires on its own - so one generic store backs them, with disjoint key
//! namespaces and per-namespace TTLs. Consumption always goes through the
//! store's atomic `take`, which is what makes replay of callbacks, consents
//! and codes impossible.
//!
//! Cached userinfo is the one non-consumable record: it is read repeatedly
//! until it expires.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use kb_crypto::{generate_auth_code, generate_consent_token, generate_session_id};
use kb_model::UserIdentity;
use kb_store::EphemeralStore;

use crate::error::{OidcError, OidcResult};

const SSO_SESSION_NS: &str = "oidc_session";
const CONSENT_NS: &str = "consent";
const AUTH_CODE_NS: &str = "auth_code";
const USERINFO_NS: &str = "userinfo";

/// The pending SSO handshake, created on `auth` and consumed on `callback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSsoSession {
    /// Nonce we sent to the identity provider.
    pub nonce: String,

    /// Requesting client.
    pub client_id: String,

    /// Redirect URI the client asked for (already allow-list checked).
    pub redirect_uri: String,

    /// Requested scope.
    pub scope: String,

    /// OAuth `state` parameter, echoed back to the client later.
    pub state: Option<String>,

    /// OAuth `response_type` parameter.
    pub response_type: Option<String>,

    /// The client's own OIDC nonce, for the eventual ID token.
    pub oidc_nonce: Option<String>,
}

/// The pending consent, created on `callback` and consumed on `authorize` or
/// `deny`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConsent {
    /// Requesting client.
    pub client_id: String,

    /// Client display name at callback time.
    pub app_name: String,

    /// Redirect URI the flow will return to.
    pub redirect_uri: String,

    /// Requested scope.
    pub scope: String,

    /// OAuth `state` parameter.
    pub state: Option<String>,

    /// The client's OIDC nonce.
    pub oidc_nonce: Option<String>,

    /// The authenticated user.
    pub user: UserIdentity,
}

/// An issued authorization code, created on `authorize` and consumed on
/// `token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedAuthorizationCode {
    /// Client the code was issued to.
    pub client_id: String,

    /// Redirect URI the code was delivered to.
    pub redirect_uri: String,

    /// The authenticated user.
    pub user: UserIdentity,

    /// Granted scope.
    pub scope: String,

    /// The client's OIDC nonce.
    pub oidc_nonce: Option<String>,
}

/// Privacy-preserving user projection cached for the userinfo endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedUserInfo {
    /// Subject (external user identifier).
    pub id: String,

    /// Forum username.
    pub username: String,

    /// Display name.
    pub name: String,

    /// Avatar URL, possibly empty.
    pub avatar_url: String,

    /// Forum trust level.
    pub trust_level: i64,

    /// Relay email address; the real address never enters this cache.
    pub email: String,

    /// Whether the account is active.
    pub active: bool,

    /// Whether the account is silenced.
    pub silenced: bool,
}

/// Time-to-live for each flow artifact namespace.
#[derive(Debug, Clone, Copy)]
pub struct FlowTtls {
    /// Pending SSO session lifetime.
    pub session: Duration,

    /// Pending consent lifetime.
    pub consent: Duration,

    /// Authorization code lifetime.
    pub auth_code: Duration,

    /// Cached userinfo lifetime.
    pub userinfo: Duration,
}

impl Default for FlowTtls {
    fn default() -> Self {
        Self {
            session: Duration::from_secs(600),     // 10 minutes
            consent: Duration::from_secs(600),     // 10 minutes
            auth_code: Duration::from_secs(300),   // 5 minutes
            userinfo: Duration::from_secs(21_600), // 6 hours
        }
    }
}

/// Typed access to the flow artifacts on top of an [`EphemeralStore`].
pub struct FlowStore {
    store: Arc<dyn EphemeralStore>,
    ttls: FlowTtls,
}

impl FlowStore {
    /// Creates a flow store.
    pub fn new(store: Arc<dyn EphemeralStore>, ttls: FlowTtls) -> Self {
        Self { store, ttls }
    }

    /// Stores a pending SSO session and returns its opaque identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn create_sso_session(&self, session: &PendingSsoSession) -> OidcResult<String> {
        let id = generate_session_id();
        self.put(SSO_SESSION_NS, &id, session, self.ttls.session)
            .await?;
        Ok(id)
    }

    /// Consumes a pending SSO session.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn take_sso_session(&self, id: &str) -> OidcResult<Option<PendingSsoSession>> {
        self.take(SSO_SESSION_NS, id).await
    }

    /// Stores a pending consent and returns its opaque token.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn create_consent(&self, consent: &PendingConsent) -> OidcResult<String> {
        let token = generate_consent_token();
        self.put(CONSENT_NS, &token, consent, self.ttls.consent)
            .await?;
        Ok(token)
    }

    /// Consumes a pending consent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn take_consent(&self, token: &str) -> OidcResult<Option<PendingConsent>> {
        self.take(CONSENT_NS, token).await
    }

    /// Stores an authorization code record and returns the code.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn create_auth_code(&self, entry: &IssuedAuthorizationCode) -> OidcResult<String> {
        let code = generate_auth_code();
        self.put(AUTH_CODE_NS, &code, entry, self.ttls.auth_code)
            .await?;
        Ok(code)
    }

    /// Consumes an authorization code. Exactly one concurrent redemption of
    /// the same code can succeed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn take_auth_code(&self, code: &str) -> OidcResult<Option<IssuedAuthorizationCode>> {
        self.take(AUTH_CODE_NS, code).await
    }

    /// Caches the userinfo projection for `subject`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn cache_userinfo(&self, subject: &str, info: &CachedUserInfo) -> OidcResult<()> {
        self.put(USERINFO_NS, subject, info, self.ttls.userinfo)
            .await
    }

    /// Reads the cached userinfo projection without consuming it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn userinfo(&self, subject: &str) -> OidcResult<Option<CachedUserInfo>> {
        let key = namespaced(USERINFO_NS, subject);
        let Some(bytes) = self.store.get(&key).await? else {
            return Ok(None);
        };
        decode(&bytes).map(Some)
    }

    async fn put<T: Serialize>(
        &self,
        ns: &str,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> OidcResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| OidcError::Internal(e.to_string()))?;
        self.store.put(&namespaced(ns, key), &bytes, ttl).await?;
        Ok(())
    }

    async fn take<T: DeserializeOwned>(&self, ns: &str, key: &str) -> OidcResult<Option<T>> {
        let Some(bytes) = self.store.take(&namespaced(ns, key)).await? else {
            return Ok(None);
        };
        decode(&bytes).map(Some)
    }
}

fn namespaced(ns: &str, key: &str) -> String {
    format!("{ns}::{key}")
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> OidcResult<T> {
    serde_json::from_slice(bytes).map_err(|e| OidcError::Internal(e.to_string()))
}
