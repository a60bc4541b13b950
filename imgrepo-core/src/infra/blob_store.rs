use std::{
    fmt,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use bytes::Bytes;
use imgrepo_model::ImageID;
use tracing::debug;

use crate::error::{RepoError, Result};
use crate::ports::BlobStore;

/// Root directory managed by `cacache` (index + content-addressed blobs).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BlobCacheRoot(PathBuf);

impl BlobCacheRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Debug for BlobCacheRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BlobCacheRoot").field(&self.0).finish()
    }
}

/// Stable, versioned cache key for an image payload.
pub fn blob_key_for(id: ImageID) -> String {
    format!("images/v1/{}", id.as_uuid().as_hyphenated())
}

fn map_cacache_error(key: &str, op: &str, err: cacache::Error) -> RepoError {
    match err {
        cacache::Error::EntryNotFound(_, _) => {
            RepoError::NotFound(format!("blob entry not found: {key}"))
        }
        cacache::Error::IntegrityError(err) => RepoError::Storage(format!(
            "blob entry failed integrity check: {key} ({err})"
        )),
        cacache::Error::SizeMismatch(wanted, actual) => {
            RepoError::Storage(format!(
                "blob entry size mismatch: key={key}, wanted={wanted}, actual={actual}"
            ))
        }
        cacache::Error::IoError(_, msg) => {
            RepoError::Storage(format!("cacache {op} I/O error: {msg}"))
        }
        cacache::Error::SerdeError(_, msg) => {
            RepoError::Storage(format!("cacache {op} serde error: {msg}"))
        }
    }
}

/// Integrity-checked on-disk blob store.
#[derive(Clone, Debug)]
pub struct CacacheBlobStore {
    root: BlobCacheRoot,
}

impl CacacheBlobStore {
    pub fn new(root: BlobCacheRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &BlobCacheRoot {
        &self.root
    }
}

#[async_trait]
impl BlobStore for CacacheBlobStore {
    async fn put(&self, id: ImageID, data: Bytes) -> Result<()> {
        let key = blob_key_for(id);
        let integrity = cacache::write(self.root.as_path(), &key, &data)
            .await
            .map_err(|e| map_cacache_error(&key, "write", e))?;
        debug!(%key, %integrity, bytes = data.len(), "stored blob");
        Ok(())
    }

    async fn get(&self, id: ImageID) -> Result<Bytes> {
        let key = blob_key_for(id);
        cacache::read(self.root.as_path(), &key)
            .await
            .map(Bytes::from)
            .map_err(|e| map_cacache_error(&key, "read", e))
    }

    async fn delete(&self, id: ImageID) -> Result<()> {
        let key = blob_key_for(id);
        cacache::index::RemoveOpts::new()
            .remove_fully(true)
            .remove(self.root.as_path(), &key)
            .await
            .map_err(|e| map_cacache_error(&key, "remove", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn blob_key_is_stable_and_versioned() {
        let id = ImageID(
            Uuid::parse_str("01234567-89ab-cdef-0123-456789abcdef").unwrap(),
        );
        assert_eq!(
            blob_key_for(id),
            "images/v1/01234567-89ab-cdef-0123-456789abcdef"
        );
    }

    #[tokio::test]
    async fn writes_reads_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacacheBlobStore::new(BlobCacheRoot::new(dir.path()));
        let id = ImageID::new();

        store.put(id, Bytes::from_static(b"pixels")).await.unwrap();
        assert_eq!(store.get(id).await.unwrap(), Bytes::from_static(b"pixels"));

        store.delete(id).await.unwrap();
        assert!(matches!(store.get(id).await, Err(RepoError::NotFound(_))));
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacacheBlobStore::new(BlobCacheRoot::new(dir.path()));
        assert!(matches!(
            store.get(ImageID::new()).await,
            Err(RepoError::NotFound(_))
        ));
    }
}
