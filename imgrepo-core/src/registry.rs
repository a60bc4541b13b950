//! Metadata registry coordinating the metadata store with the blob store.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use imgrepo_model::{DEFAULT_PAGE_SIZE, Image, ImageID, ImageRecord, NewImage};
use tracing::{error, info, warn};

use crate::deadline::with_deadline;
use crate::error::{RepoError, Result, ResultExt};
use crate::ports::{BlobStore, ImageMetadataRepository};

#[derive(Debug, Clone)]
pub struct RegistryOptions {
    /// Deadline for each metadata store call. Blob transfers are unbounded.
    pub operation_timeout: Duration,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Delete the metadata record again when the blob write fails.
    pub compensate_failed_uploads: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(5),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: 100,
            compensate_failed_uploads: true,
        }
    }
}

#[derive(Clone)]
pub struct ImageRegistry {
    images: Arc<dyn ImageMetadataRepository>,
    blobs: Arc<dyn BlobStore>,
    options: RegistryOptions,
}

impl std::fmt::Debug for ImageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRegistry")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ImageRegistry {
    pub fn new(
        images: Arc<dyn ImageMetadataRepository>,
        blobs: Arc<dyn BlobStore>,
        options: RegistryOptions,
    ) -> Self {
        Self {
            images,
            blobs,
            options,
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Insert metadata under a fresh id, then store the payload.
    ///
    /// Metadata is written first. When the blob write fails the record is
    /// deleted again if compensation is enabled; if that delete fails too
    /// the record stays behind and will fail later downloads with
    /// `Storage`.
    pub async fn upload(&self, image: NewImage, data: Bytes) -> Result<ImageID> {
        if image.name.trim().is_empty() {
            return Err(RepoError::Validation("image name must not be empty".into()));
        }
        if image.owner.trim().is_empty() {
            return Err(RepoError::Validation("image owner must not be empty".into()));
        }

        let id = ImageID::new();
        let record = image.into_record(id);
        let size = data.len();

        with_deadline(
            self.options.operation_timeout,
            "insert image metadata",
            self.images.insert(&record),
        )
        .await
        .context("upload")?;

        if let Err(err) = self.blobs.put(id, data).await {
            error!(image_id = %id, error = %err, "blob write failed after metadata insert");
            if self.options.compensate_failed_uploads {
                self.compensate(id).await;
            }
            return Err(err.context(format!("upload {id}")));
        }

        info!(
            image_id = %id,
            owner = %record.owner,
            visibility = %record.visibility,
            bytes = size,
            "image uploaded"
        );
        Ok(id)
    }

    async fn compensate(&self, id: ImageID) {
        let removed = with_deadline(
            self.options.operation_timeout,
            "delete orphaned metadata",
            self.images.delete(id),
        )
        .await;
        match removed {
            Ok(_) => info!(image_id = %id, "removed metadata for failed upload"),
            Err(err) => warn!(
                image_id = %id,
                error = %err,
                "metadata for failed upload left in place"
            ),
        }
    }

    /// Fetch a record and its payload if `requester` may see it.
    pub async fn download(&self, requester: &str, id: ImageID) -> Result<Image> {
        let record = with_deadline(
            self.options.operation_timeout,
            "find image metadata",
            self.images.find(id),
        )
        .await
        .context("download")?
        .ok_or_else(|| RepoError::NotFound(format!("image {id}")))?;

        if !record.is_visible_to(requester) {
            warn!(image_id = %id, requester, "download denied");
            return Err(RepoError::Authorization(format!(
                "image {id} is private to its owner"
            )));
        }

        let data = self.blobs.get(id).await.map_err(|err| {
            error!(image_id = %id, error = %err, "blob missing for existing metadata");
            // The record exists, so a missing blob is a storage fault.
            let err = match err {
                RepoError::NotFound(msg) => RepoError::Storage(msg),
                other => other,
            };
            err.context(format!("download {id}"))
        })?;

        Ok(Image { record, data })
    }

    /// Records visible to `requester`, newest first, strictly older than
    /// `cursor`. A page size of zero selects the default; larger sizes are
    /// clamped.
    pub async fn list(
        &self,
        requester: &str,
        page_size: u32,
        cursor: Option<ImageID>,
    ) -> Result<Vec<ImageRecord>> {
        let limit = self.page_size(page_size);
        with_deadline(
            self.options.operation_timeout,
            "list images",
            self.images.list_visible(requester, cursor, limit),
        )
        .await
        .context("list")
    }

    fn page_size(&self, requested: u32) -> u32 {
        match requested {
            0 => self.options.default_page_size,
            n => n.min(self.options.max_page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::{InMemoryBlobStore, InMemoryImageRepository};

    fn registry() -> ImageRegistry {
        ImageRegistry::new(
            Arc::new(InMemoryImageRepository::default()),
            Arc::new(InMemoryBlobStore::default()),
            RegistryOptions {
                max_page_size: 5,
                ..RegistryOptions::default()
            },
        )
    }

    #[test]
    fn page_size_defaults_and_clamps() {
        let registry = registry();
        assert_eq!(registry.page_size(0), DEFAULT_PAGE_SIZE);
        assert_eq!(registry.page_size(3), 3);
        assert_eq!(registry.page_size(50), 5);
    }

    #[tokio::test]
    async fn rejects_nameless_uploads() {
        let err = registry()
            .upload(
                NewImage::new(" ", "alice", imgrepo_model::Visibility::Public),
                Bytes::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let err = registry().download("alice", ImageID::new()).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }
}
