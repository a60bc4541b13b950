use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::{debug, info};

use crate::auth::crypto::AuthCrypto;
use crate::auth::session_token::SessionToken;
use crate::error::{RepoError, Result};
use crate::ports::{Session, SessionStore};

const KEY_PREFIX: &str = "imgrepo:session:";

/// Redis-backed sessions. Keys are HMACs of the token, so raw bearer
/// tokens never reach Redis; expiry is Redis' own `EX`.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
    crypto: Arc<AuthCrypto>,
    ttl: Duration,
}

impl fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("connection", &"ConnectionManager")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl RedisSessionStore {
    pub async fn connect(
        redis_url: &str,
        crypto: Arc<AuthCrypto>,
        ttl: Duration,
    ) -> Result<Self> {
        info!("Connecting to Redis session store");

        let client = redis::Client::open(redis_url).map_err(|e| {
            RepoError::Storage(format!("Failed to create Redis client: {e}"))
        })?;
        let conn = ConnectionManager::new(client).await.map_err(|e| {
            RepoError::Storage(format!("Failed to connect to Redis: {e}"))
        })?;

        Ok(Self::new(conn, crypto, ttl))
    }

    pub fn new(
        conn: ConnectionManager,
        crypto: Arc<AuthCrypto>,
        ttl: Duration,
    ) -> Self {
        Self { conn, crypto, ttl }
    }

    fn key_for(&self, token: &str) -> String {
        format!("{KEY_PREFIX}{}", self.crypto.hash_token(token))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn new_session(&self, subject: &str) -> Result<SessionToken> {
        let lifetime = chrono::Duration::from_std(self.ttl)
            .map_err(|e| RepoError::Internal(format!("invalid session ttl: {e}")))?;
        let token = SessionToken::generate(lifetime)?;

        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(
            self.key_for(token.as_str()),
            subject,
            self.ttl.as_secs().max(1),
        )
        .await
        .map_err(|e| RepoError::Storage(format!("Redis SETEX failed: {e}")))?;

        debug!(subject, "session created");
        Ok(token)
    }

    async fn is_session(&self, token: &str) -> Result<Session> {
        let key = self.key_for(token);
        let mut conn = self.conn.clone();

        let (subject, ttl): (Option<String>, i64) = redis::pipe()
            .get(&key)
            .ttl(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| RepoError::Storage(format!("Redis GET failed: {e}")))?;

        let subject = subject.ok_or_else(|| {
            RepoError::Authentication("unknown or expired session".into())
        })?;
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl.max(0));

        Ok(Session {
            subject,
            expires_at,
        })
    }
}
