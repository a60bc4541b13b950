use async_trait::async_trait;
use imgrepo_model::{ImageID, ImageRecord, Visibility};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{RepoError, Result};
use crate::ports::ImageMetadataRepository;

#[derive(Debug, Clone)]
pub struct PostgresImageRepository {
    pool: PgPool,
}

impl PostgresImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_row(row: &PgRow) -> Result<ImageRecord> {
        let id: Uuid = row
            .try_get("id")
            .map_err(|e| RepoError::Storage(format!("Failed to read image id: {e}")))?;
        let name: String = row
            .try_get("name")
            .map_err(|e| RepoError::Storage(format!("Failed to read image name: {e}")))?;
        let owner: String = row
            .try_get("owner")
            .map_err(|e| RepoError::Storage(format!("Failed to read image owner: {e}")))?;
        let visibility: i16 = row
            .try_get("visibility")
            .map_err(|e| RepoError::Storage(format!("Failed to read visibility: {e}")))?;

        Ok(ImageRecord {
            id: ImageID(id),
            name,
            owner,
            visibility: Visibility::try_from(i32::from(visibility)).map_err(
                |e| RepoError::Storage(format!("Corrupt image row {id}: {e}")),
            )?,
        })
    }
}

#[async_trait]
impl ImageMetadataRepository for PostgresImageRepository {
    async fn insert(&self, record: &ImageRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO images (id, name, owner, visibility)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.id.to_uuid())
        .bind(&record.name)
        .bind(&record.owner)
        .bind(record.visibility.as_i32() as i16)
        .execute(self.pool())
        .await
        .map_err(|e| RepoError::Storage(format!("Failed to insert image: {e}")))?;

        Ok(())
    }

    async fn find(&self, id: ImageID) -> Result<Option<ImageRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, owner, visibility
            FROM images
            WHERE id = $1
            "#,
        )
        .bind(id.to_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| RepoError::Storage(format!("Failed to fetch image: {e}")))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn list_visible(
        &self,
        requester: &str,
        before: Option<ImageID>,
        limit: u32,
    ) -> Result<Vec<ImageRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, owner, visibility
            FROM images
            WHERE (visibility = 0 OR owner = $1)
              AND ($2::uuid IS NULL OR id < $2)
            ORDER BY id DESC
            LIMIT $3
            "#,
        )
        .bind(requester)
        .bind(before.map(|id| id.to_uuid()))
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(|e| RepoError::Storage(format!("Failed to list images: {e}")))?;

        rows.iter().map(Self::map_row).collect()
    }

    async fn delete(&self, id: ImageID) -> Result<bool> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id.to_uuid())
            .execute(self.pool())
            .await
            .map_err(|e| RepoError::Storage(format!("Failed to delete image: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
