//! File-backed key storage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::StoreResult;
use crate::provider::KeyStore;

/// [`KeyStore`] backed by a single file on disk.
///
/// Bootstrap atomicity comes from `create_new`: when several processes race
/// to persist a freshly generated key, exactly one file creation succeeds and
/// the losers load the winner's key.
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    /// Creates a key store at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn load(&self) -> StoreResult<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(pem) => Ok(Some(pem)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store_if_absent(&self, pem: &str) -> StoreResult<String> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(mut file) => {
                file.write_all(pem.as_bytes()).await?;
                file.flush().await?;
                tracing::info!(path = %self.path.display(), "persisted new signing key");
                Ok(pem.to_string())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // Lost the bootstrap race; use whatever the winner wrote.
                let existing = tokio::fs::read_to_string(&self.path).await?;
                Ok(existing)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("key.pem"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("key.pem"));
        let winner = store.store_if_absent("PEM DATA").await.unwrap();
        assert_eq!(winner, "PEM DATA");
        assert_eq!(store.load().await.unwrap(), Some("PEM DATA".to_string()));
    }

    #[tokio::test]
    async fn second_writer_loads_first_writers_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.pem");
        let a = FileKeyStore::new(&path);
        let b = FileKeyStore::new(&path);

        assert_eq!(a.store_if_absent("first").await.unwrap(), "first");
        assert_eq!(b.store_if_absent("second").await.unwrap(), "first");
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("nested/dir/key.pem"));
        store.store_if_absent("PEM").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("PEM".to_string()));
    }
}
