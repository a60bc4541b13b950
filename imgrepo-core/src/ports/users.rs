use async_trait::async_trait;

use crate::error::Result;

/// Registration and credential checks. Password hashing is internal to the
/// implementation.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn register(&self, username: &str, password: &str) -> Result<()>;

    /// Returns the canonical subject on success. Unknown users and wrong
    /// passwords fail identically with `Credential`.
    async fn login(&self, username: &str, password: &str) -> Result<String>;
}

// Username -> password hash storage backing the credential service
#[async_trait]
pub trait UserCredentialsRepository: Send + Sync {
    /// Fails with `Duplicate` when the username is taken.
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<()>;

    async fn find_password_hash(&self, username: &str) -> Result<Option<String>>;
}
