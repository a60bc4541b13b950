//! Backend composition. Each port gets exactly one implementation chosen by
//! the configured storage backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use imgrepo_config::{Config, StorageBackend};
use imgrepo_core::auth::{AuthCrypto, CredentialService};
use imgrepo_core::database::{MIGRATOR, PostgresImageRepository, PostgresUserRepository};
use imgrepo_core::infra::{
    BlobCacheRoot, CacacheBlobStore, InMemoryBlobStore, InMemoryImageRepository,
    InMemorySessionStore, InMemoryUserRepository, RedisSessionStore,
};
use imgrepo_core::{ImageRegistry, RegistryOptions};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::service::RepositoryService;

/// Tunables shared by every backend family.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub session_ttl: Duration,
    pub registry: RegistryOptions,
    pub max_image_bytes: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(30 * 60),
            registry: RegistryOptions::default(),
            max_image_bytes: 64 * 1024 * 1024,
        }
    }
}

impl From<&Config> for ServiceSettings {
    fn from(config: &Config) -> Self {
        let repo = &config.repository;
        Self {
            session_ttl: config.auth.session_ttl,
            registry: RegistryOptions {
                operation_timeout: repo.operation_timeout,
                default_page_size: repo.default_page_size,
                max_page_size: repo.max_page_size,
                compensate_failed_uploads: repo.compensate_failed_uploads,
            },
            max_image_bytes: repo.max_image_bytes,
        }
    }
}

/// Everything in process. Used by the `memory` backend and by tests.
pub fn in_memory_service(
    crypto: Arc<AuthCrypto>,
    settings: &ServiceSettings,
) -> RepositoryService {
    let users = CredentialService::new(Arc::new(InMemoryUserRepository::default()), crypto);
    let registry = ImageRegistry::new(
        Arc::new(InMemoryImageRepository::default()),
        Arc::new(InMemoryBlobStore::default()),
        settings.registry.clone(),
    );
    RepositoryService::new(
        Arc::new(users),
        Arc::new(InMemorySessionStore::new(settings.session_ttl)),
        registry,
        settings.max_image_bytes,
    )
}

pub async fn connect_pool(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(16)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .context("failed to connect to PostgreSQL")
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to apply database migrations")?;
    info!("database migrations applied");
    Ok(())
}

/// PostgreSQL metadata and users, Redis sessions, cacache blobs.
pub async fn postgres_service(
    config: &Config,
    crypto: Arc<AuthCrypto>,
    settings: &ServiceSettings,
) -> anyhow::Result<RepositoryService> {
    let database_url = config
        .database
        .url
        .as_deref()
        .context("DATABASE_URL is required for the postgres backend")?;
    let redis_url = config
        .redis
        .as_ref()
        .map(|redis| redis.url.as_str())
        .context("REDIS_URL is required for the postgres backend")?;

    let pool = connect_pool(database_url).await?;
    run_migrations(&pool).await?;

    let sessions =
        RedisSessionStore::connect(redis_url, Arc::clone(&crypto), settings.session_ttl)
            .await
            .context("failed to connect session store")?;

    tokio::fs::create_dir_all(&config.storage.blob_root)
        .await
        .with_context(|| {
            format!(
                "failed to create blob store directory {}",
                config.storage.blob_root.display()
            )
        })?;
    let blobs = CacacheBlobStore::new(BlobCacheRoot::new(&config.storage.blob_root));

    let users = CredentialService::new(
        Arc::new(PostgresUserRepository::new(pool.clone())),
        crypto,
    );
    let registry = ImageRegistry::new(
        Arc::new(PostgresImageRepository::new(pool)),
        Arc::new(blobs),
        settings.registry.clone(),
    );

    Ok(RepositoryService::new(
        Arc::new(users),
        Arc::new(sessions),
        registry,
        settings.max_image_bytes,
    ))
}

pub async fn build_service(config: &Config) -> anyhow::Result<RepositoryService> {
    let crypto = Arc::new(
        AuthCrypto::new(&config.auth.password_pepper, &config.auth.token_key)
            .context("invalid authentication secrets")?,
    );
    let settings = ServiceSettings::from(config);

    info!(backend = %config.storage.backend, "composing storage backends");
    match config.storage.backend {
        StorageBackend::Memory => Ok(in_memory_service(crypto, &settings)),
        StorageBackend::Postgres => postgres_service(config, crypto, &settings).await,
    }
}
