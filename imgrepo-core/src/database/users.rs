use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::error::{RepoError, Result};
use crate::ports::UserCredentialsRepository;

#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserCredentialsRepository for PostgresUserRepository {
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Storage(format!("Failed to create user: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::Duplicate(format!(
                "username {username} already exists"
            )));
        }
        Ok(())
    }

    async fn find_password_hash(&self, username: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT password_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                RepoError::Storage(format!("Failed to fetch user credentials: {e}"))
            })?;

        row.map(|row| {
            row.try_get("password_hash").map_err(|e| {
                RepoError::Storage(format!("Failed to read password hash: {e}"))
            })
        })
        .transpose()
    }
}
