use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::auth::crypto::AuthCrypto;
use crate::error::{RepoError, Result};
use crate::ports::users::{UserCredentialsRepository, UserService};

/// [`UserService`] backed by Argon2id hashes in a credentials repository.
#[derive(Clone)]
pub struct CredentialService {
    users: Arc<dyn UserCredentialsRepository>,
    crypto: Arc<AuthCrypto>,
    /// Hash verified against when the username is unknown, so both login
    /// failures cost one Argon2 verification.
    decoy_hash: Arc<OnceCell<String>>,
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService").finish_non_exhaustive()
    }
}

impl CredentialService {
    pub fn new(
        users: Arc<dyn UserCredentialsRepository>,
        crypto: Arc<AuthCrypto>,
    ) -> Self {
        Self {
            users,
            crypto,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    async fn verify(&self, password: &str, hash: String) -> Result<bool> {
        let crypto = Arc::clone(&self.crypto);
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || {
            crypto.verify_password(&password, &hash)
        })
        .await??;
        Ok(verified)
    }

    async fn decoy_hash(&self) -> Result<String> {
        let hash = self
            .decoy_hash
            .get_or_try_init(|| async {
                let crypto = Arc::clone(&self.crypto);
                let hash = tokio::task::spawn_blocking(move || {
                    crypto.hash_password("imgrepo-decoy-password")
                })
                .await??;
                Ok::<_, RepoError>(hash)
            })
            .await?;
        Ok(hash.clone())
    }

    fn normalize(username: &str, password: &str) -> Result<String> {
        let username = username.trim();
        if username.is_empty() {
            return Err(RepoError::Validation("username must not be empty".into()));
        }
        if password.is_empty() {
            return Err(RepoError::Validation("password must not be empty".into()));
        }
        Ok(username.to_string())
    }
}

#[async_trait]
impl UserService for CredentialService {
    async fn register(&self, username: &str, password: &str) -> Result<()> {
        let username = Self::normalize(username, password)?;

        let crypto = Arc::clone(&self.crypto);
        let password = password.to_string();
        let hash =
            tokio::task::spawn_blocking(move || crypto.hash_password(&password))
                .await??;

        self.users.insert_user(&username, &hash).await?;
        info!(username = %username, "registered user");
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> Result<String> {
        let username = match Self::normalize(username, password) {
            Ok(username) => username,
            Err(_) => return Err(RepoError::Credential),
        };

        let Some(hash) = self.users.find_password_hash(&username).await? else {
            let decoy = self.decoy_hash().await?;
            self.verify(password, decoy).await?;
            warn!(username = %username, "login for unknown user");
            return Err(RepoError::Credential);
        };

        if !self.verify(password, hash).await? {
            warn!(username = %username, "login with wrong password");
            return Err(RepoError::Credential);
        }

        Ok(username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::InMemoryUserRepository;

    fn service() -> CredentialService {
        CredentialService::new(
            Arc::new(InMemoryUserRepository::default()),
            Arc::new(AuthCrypto::with_minimal_cost("pepper", "key").unwrap()),
        )
    }

    #[tokio::test]
    async fn register_then_login() {
        let users = service();
        users.register("alice", "wonderland").await.unwrap();
        let subject = users.login("  alice ", "wonderland").await.unwrap();
        assert_eq!(subject, "alice");
    }

    #[tokio::test]
    async fn second_registration_is_duplicate() {
        let users = service();
        users.register("alice", "one").await.unwrap();
        let err = users.register("alice", "two").await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)), "{err:?}");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let users = service();
        users.register("alice", "wonderland").await.unwrap();

        let wrong = users.login("alice", "looking-glass").await.unwrap_err();
        let unknown = users.login("mallory", "wonderland").await.unwrap_err();
        assert_eq!(wrong, RepoError::Credential);
        assert_eq!(unknown, RepoError::Credential);
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn unknown_users_pay_for_a_hash_verification() {
        let users = service();
        assert!(users.decoy_hash.get().is_none());

        let err = users.login("mallory", "wonderland").await.unwrap_err();
        assert_eq!(err, RepoError::Credential);
        let decoy = users.decoy_hash.get().cloned().unwrap();
        assert!(decoy.starts_with("$argon2id$"));

        users.login("trudy", "wonderland").await.unwrap_err();
        assert_eq!(users.decoy_hash.get(), Some(&decoy));
    }

    #[tokio::test]
    async fn empty_fields_are_rejected() {
        let users = service();
        assert!(matches!(
            users.register("   ", "pw").await,
            Err(RepoError::Validation(_))
        ));
        assert!(matches!(
            users.register("bob", "").await,
            Err(RepoError::Validation(_))
        ));
    }
}
