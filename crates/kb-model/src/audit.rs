//! Authorization audit records.

use serde::{Deserialize, Serialize};

/// The user's decision on a consent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationDecision {
    /// The user approved the client's access request.
    Approved,
    /// The user denied the client's access request.
    Denied,
}

impl AuthorizationDecision {
    /// Stable string form used in audit output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Denied => "denied",
        }
    }
}

impl std::fmt::Display for AuthorizationDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One authorization decision, keyed by (user, client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRecord {
    /// Forum account identifier of the deciding user.
    pub user_id: i64,

    /// Client the decision applies to.
    pub client_id: String,

    /// Client display name at decision time.
    pub app_name: String,

    /// Scope that was requested.
    pub scope: String,

    /// Approved or denied.
    pub decision: AuthorizationDecision,
}
