use std::future::Future;
use std::time::Duration;

use crate::error::{RepoError, Result};

/// Bound `fut` by `limit`, failing with `DeadlineExceeded` named after `op`.
pub async fn with_deadline<T, F>(limit: Duration, op: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RepoError::DeadlineExceeded(format!(
            "{op} did not complete within {limit:?}"
        ))),
    }
}
