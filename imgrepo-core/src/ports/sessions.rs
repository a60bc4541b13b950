use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::session_token::SessionToken;
use crate::error::Result;

/// A validated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub subject: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates opaque session tokens with a fixed TTL.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn new_session(&self, subject: &str) -> Result<SessionToken>;

    /// Fails with `Authentication` for unknown or expired tokens.
    async fn is_session(&self, token: &str) -> Result<Session>;
}
