use async_trait::async_trait;
use bytes::Bytes;
use imgrepo_model::ImageID;

use crate::error::Result;

/// Raw byte storage keyed by image id.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, id: ImageID, data: Bytes) -> Result<()>;

    /// Fails with `NotFound` when no blob exists for `id`.
    async fn get(&self, id: ImageID) -> Result<Bytes>;

    async fn delete(&self, id: ImageID) -> Result<()>;
}
