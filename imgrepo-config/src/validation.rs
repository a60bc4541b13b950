use thiserror::Error;
use url::Url;

use crate::constants::{DEFAULT_PASSWORD_PEPPER, DEFAULT_TOKEN_KEY};
use crate::models::{Config, StorageBackend};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error("storage backend 'postgres' requires DATABASE_URL / database.url")]
    MissingDatabaseUrl,
    #[error("storage backend 'postgres' requires REDIS_URL / redis.url")]
    MissingRedisUrl,
    #[error("invalid {what} URL: {reason}")]
    InvalidUrl { what: &'static str, reason: String },
    #[error("list page sizes must be greater than zero")]
    ZeroPageSize,
    #[error("default page size {default} exceeds the maximum {max}")]
    DefaultPageSizeAboveMax { default: u32, max: u32 },
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    let repo = &config.repository;
    if repo.default_page_size == 0 || repo.max_page_size == 0 {
        return Err(ConfigGuardRailError::ZeroPageSize);
    }
    if repo.default_page_size > repo.max_page_size {
        return Err(ConfigGuardRailError::DefaultPageSizeAboveMax {
            default: repo.default_page_size,
            max: repo.max_page_size,
        });
    }
    if repo.operation_timeout.is_zero() {
        return Err(ConfigGuardRailError::ZeroValue("operation timeout"));
    }
    if config.auth.session_ttl.is_zero() {
        return Err(ConfigGuardRailError::ZeroValue("session TTL"));
    }
    if repo.max_image_bytes == 0 {
        return Err(ConfigGuardRailError::ZeroValue("max image bytes"));
    }

    if config.storage.backend == StorageBackend::Postgres {
        let database_url = config
            .database
            .url
            .as_deref()
            .ok_or(ConfigGuardRailError::MissingDatabaseUrl)?;
        check_url("database", database_url)?;

        let redis = config
            .redis
            .as_ref()
            .ok_or(ConfigGuardRailError::MissingRedisUrl)?;
        check_url("redis", &redis.url)?;
    }

    if config.auth.password_pepper == DEFAULT_PASSWORD_PEPPER {
        warnings.push_with_hint(
            "Using the development password pepper",
            "Set AUTH_PASSWORD_PEPPER to a long random value",
        );
    }
    if config.auth.token_key == DEFAULT_TOKEN_KEY {
        warnings.push_with_hint(
            "Using the development session token key",
            "Set AUTH_TOKEN_KEY to a long random value",
        );
    }
    if !repo.compensate_failed_uploads {
        warnings.push(
            "Failed uploads will leave unreadable metadata records behind",
        );
    }

    Ok(warnings)
}

fn check_url(what: &'static str, raw: &str) -> Result<(), ConfigGuardRailError> {
    Url::parse(raw)
        .map(|_| ())
        .map_err(|err| ConfigGuardRailError::InvalidUrl {
            what,
            reason: err.to_string(),
        })
}
