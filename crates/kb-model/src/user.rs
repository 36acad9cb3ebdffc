//! User identity as established by the SSO handshake.

use serde::{Deserialize, Serialize};

/// A user identity resolved during the SSO callback.
///
/// Assembled from the validated SSO response parameters plus the local
/// account lookup (trust level). This is what flows into consents,
/// authorization codes and issued tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable external user identifier; becomes the token subject.
    pub external_id: String,

    /// Forum username.
    pub username: String,

    /// Display name; falls back to the username.
    pub name: String,

    /// The user's real email address as reported by the SSO provider.
    ///
    /// Never emitted to clients; tokens and userinfo carry a relay address.
    pub email: String,

    /// Avatar URL, possibly empty.
    pub avatar_url: String,

    /// Forum trust level (0 when the local account is unknown).
    pub trust_level: i64,
}

impl UserIdentity {
    /// Synthesizes the privacy-preserving relay address handed to clients in
    /// place of the user's real email.
    #[must_use]
    pub fn relay_email(&self, relay_domain: &str) -> String {
        format!("{}_{}@{}", self.username, self.external_id, relay_domain)
    }
}

/// The locally known part of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
    /// Forum trust level.
    pub trust_level: i64,
}
