use async_trait::async_trait;
use imgrepo_model::{ImageID, ImageRecord};

use crate::error::Result;

/// Image metadata records.
#[async_trait]
pub trait ImageMetadataRepository: Send + Sync {
    async fn insert(&self, record: &ImageRecord) -> Result<()>;

    async fn find(&self, id: ImageID) -> Result<Option<ImageRecord>>;

    /// Records visible to `requester` (owned by them or public), newest
    /// first, strictly older than `before` when given, at most `limit`.
    /// The filter runs inside the store so cursors stay stable under
    /// concurrent inserts.
    async fn list_visible(
        &self,
        requester: &str,
        before: Option<ImageID>,
        limit: u32,
    ) -> Result<Vec<ImageRecord>>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: ImageID) -> Result<bool>;
}
