//! Storage provider traits.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;

/// A TTL-bounded key/value store for transient protocol artifacts.
///
/// Implementations must be thread-safe. Values are opaque bytes; callers own
/// serialization. Expired entries behave exactly like missing entries.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Stores a value under `key`, expiring after `ttl`.
    ///
    /// Overwrites any existing value.
    async fn put(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()>;

    /// Reads a value without consuming it.
    ///
    /// Returns `None` when the key was never written or has expired.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Atomically reads and deletes a value.
    ///
    /// At most one concurrent caller observes `Some` for a given entry;
    /// every other caller (and any later caller) gets `None`.
    async fn take(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Deletes a value.
    ///
    /// Succeeds even if the key does not exist.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Durable storage for the server's signing key.
///
/// A fleet of servers sharing one backend must end up with one key: the first
/// writer wins and everyone else loads what was written.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Loads the stored key PEM, if any.
    async fn load(&self) -> StoreResult<Option<String>>;

    /// Stores `pem` unless a key already exists, returning the PEM that is
    /// durably stored afterwards (the argument if this call won the race,
    /// the previously stored key otherwise).
    async fn store_if_absent(&self, pem: &str) -> StoreResult<String>;
}
