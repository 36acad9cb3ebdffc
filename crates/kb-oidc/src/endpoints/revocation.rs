//! Token revocation endpoint handler (RFC 7009).
//!
//! This provider keeps no revocation list; tokens are only ever invalidated
//! by natural expiry. Per RFC 7009 the endpoint still reports success, which
//! also prevents token scanning.

use axum::Json;

/// POST `/revoke`
///
/// Always returns an empty JSON object with status 200.
pub async fn revoke() -> Json<serde_json::Value> {
    Json(serde_json::json!({}))
}
