//! In-memory storage implementations.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::StoreResult;
use crate::provider::{EphemeralStore, KeyStore};

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory [`EphemeralStore`].
///
/// Entries are checked against their deadline on every read and pruned
/// opportunistically on writes. All operations on one entry happen under a
/// single lock, which is what makes `take` consume-exactly-once.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    /// Whether the store holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn put(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, e| !e.is_expired(now));
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn take(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.remove(key) {
            Some(entry) if entry.is_expired(now) => Ok(None),
            Some(entry) => Ok(Some(entry.value)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// In-memory [`KeyStore`] for tests and single-process setups.
#[derive(Default)]
pub struct MemoryKeyStore {
    pem: Mutex<Option<String>>,
}

impl MemoryKeyStore {
    /// Creates an empty key store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a key store pre-seeded with `pem`.
    #[must_use]
    pub fn with_key(pem: &str) -> Self {
        Self {
            pem: Mutex::new(Some(pem.to_string())),
        }
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn load(&self) -> StoreResult<Option<String>> {
        Ok(self.pem.lock().clone())
    }

    async fn store_if_absent(&self, pem: &str) -> StoreResult<String> {
        let mut slot = self.pem.lock();
        match slot.as_ref() {
            Some(existing) => Ok(existing.clone()),
            None => {
                *slot = Some(pem.to_string());
                Ok(pem.to_string())
            }
        }
    }
}
