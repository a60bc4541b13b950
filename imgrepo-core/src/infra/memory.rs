//! In-process backends. Used by the `memory` storage backend and by tests.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use imgrepo_model::{ImageID, ImageRecord};
use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::auth::session_token::SessionToken;
use crate::error::{RepoError, Result};
use crate::ports::{
    BlobStore, ImageMetadataRepository, Session, SessionStore,
    UserCredentialsRepository,
};

#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: DashMap<ImageID, Bytes>,
}

impl InMemoryBlobStore {
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, id: ImageID, data: Bytes) -> Result<()> {
        self.blobs.insert(id, data);
        Ok(())
    }

    async fn get(&self, id: ImageID) -> Result<Bytes> {
        self.blobs
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RepoError::NotFound(format!("blob {id}")))
    }

    async fn delete(&self, id: ImageID) -> Result<()> {
        self.blobs.remove(&id);
        Ok(())
    }
}

/// Ordered by id, so keyset pagination is a reverse range scan.
#[derive(Debug, Default)]
pub struct InMemoryImageRepository {
    records: RwLock<BTreeMap<ImageID, ImageRecord>>,
}

#[async_trait]
impl ImageMetadataRepository for InMemoryImageRepository {
    async fn insert(&self, record: &ImageRecord) -> Result<()> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(RepoError::Duplicate(format!("image {}", record.id)));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn find(&self, id: ImageID) -> Result<Option<ImageRecord>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn list_visible(
        &self,
        requester: &str,
        before: Option<ImageID>,
        limit: u32,
    ) -> Result<Vec<ImageRecord>> {
        let records = self.records.read();
        let range = match before {
            Some(cursor) => records.range(..cursor),
            None => records.range(..),
        };
        Ok(range
            .rev()
            .map(|(_, record)| record)
            .filter(|record| record.is_visible_to(requester))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: ImageID) -> Result<bool> {
        Ok(self.records.write().remove(&id).is_some())
    }
}

#[derive(Debug)]
struct SessionEntry {
    subject: String,
    deadline: Instant,
    expires_at: chrono::DateTime<Utc>,
}

/// Session store with expiry measured on tokio's clock.
#[derive(Debug)]
pub struct InMemorySessionStore {
    ttl: Duration,
    sessions: DashMap<String, SessionEntry>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: DashMap::new(),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn new_session(&self, subject: &str) -> Result<SessionToken> {
        let lifetime = chrono::Duration::from_std(self.ttl)
            .map_err(|e| RepoError::Internal(format!("invalid session ttl: {e}")))?;
        let token = SessionToken::generate(lifetime)?;
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.deadline > now);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            debug!(evicted, "purged expired sessions");
        }
        self.sessions.insert(
            token.as_str().to_string(),
            SessionEntry {
                subject: subject.to_string(),
                deadline: now + self.ttl,
                expires_at: token.expires_at(),
            },
        );
        Ok(token)
    }

    async fn is_session(&self, token: &str) -> Result<Session> {
        match self.sessions.entry(token.to_string()) {
            Entry::Occupied(entry) if Instant::now() >= entry.get().deadline => {
                debug!("evicting expired session");
                entry.remove();
                Err(RepoError::Authentication("session expired".into()))
            }
            Entry::Occupied(entry) => Ok(Session {
                subject: entry.get().subject.clone(),
                expires_at: entry.get().expires_at,
            }),
            Entry::Vacant(_) => {
                Err(RepoError::Authentication("unknown session".into()))
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, String>,
}

#[async_trait]
impl UserCredentialsRepository for InMemoryUserRepository {
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<()> {
        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => Err(RepoError::Duplicate(format!(
                "username {username} already exists"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(password_hash.to_string());
                Ok(())
            }
        }
    }

    async fn find_password_hash(&self, username: &str) -> Result<Option<String>> {
        Ok(self.users.get(username).map(|hash| hash.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgrepo_model::{NewImage, Visibility};

    #[tokio::test(start_paused = true)]
    async fn sessions_expire_after_ttl() {
        let store = InMemorySessionStore::new(Duration::from_secs(30 * 60));
        let token = store.new_session("alice").await.unwrap();

        let session = store.is_session(token.as_str()).await.unwrap();
        assert_eq!(session.subject, "alice");

        tokio::time::advance(Duration::from_secs(29 * 60)).await;
        assert!(store.is_session(token.as_str()).await.is_ok());

        tokio::time::advance(Duration::from_secs(60)).await;
        let err = store.is_session(token.as_str()).await.unwrap_err();
        assert!(matches!(err, RepoError::Authentication(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_sessions_are_purged_on_login() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        for _ in 0..100 {
            store.new_session("alice").await.unwrap();
        }
        assert_eq!(store.sessions.len(), 100);

        tokio::time::advance(Duration::from_secs(3600)).await;
        let fresh = store.new_session("bob").await.unwrap();

        assert_eq!(store.sessions.len(), 1);
        assert_eq!(store.is_session(fresh.as_str()).await.unwrap().subject, "bob");
    }

    #[tokio::test]
    async fn unknown_tokens_are_rejected() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        assert!(matches!(
            store.is_session("nope").await,
            Err(RepoError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn list_filters_and_pages_newest_first() {
        let repo = InMemoryImageRepository::default();
        let mut ids = Vec::new();
        for (i, (owner, visibility)) in [
            ("alice", Visibility::Public),
            ("bob", Visibility::Private),
            ("alice", Visibility::Private),
            ("bob", Visibility::Public),
        ]
        .into_iter()
        .enumerate()
        {
            let record = NewImage::new(format!("{i}.png"), owner, visibility)
                .into_record(ImageID::new());
            ids.push(record.id);
            repo.insert(&record).await.unwrap();
        }

        let page = repo.list_visible("alice", None, 10).await.unwrap();
        let seen: Vec<_> = page.iter().map(|r| r.id).collect();
        assert_eq!(seen, vec![ids[3], ids[2], ids[0]]);

        let page = repo.list_visible("alice", Some(ids[2]), 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, ids[0]);
    }
}
