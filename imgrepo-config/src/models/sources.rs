use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::CONFIG_PATH_ENV;
use crate::loader::error::ConfigLoadError;
use crate::models::StorageBackend;
use crate::util::{parse_bool, parse_duration};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub storage: FileStorageConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    pub redis: Option<FileRedisConfig>,
    #[serde(default)]
    pub auth: FileAuthConfig,
    #[serde(default)]
    pub repository: FileRepositoryConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<StorageBackend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_root: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileRedisConfig {
    pub url: String,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileAuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_pepper: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_key: Option<String>,
    /// `humantime` syntax, e.g. `"30m"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_ttl: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileRepositoryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_image_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compensate_failed_uploads: Option<bool>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub storage_backend: Option<StorageBackend>,
    pub blob_root: Option<PathBuf>,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub auth_password_pepper: Option<String>,
    pub auth_token_key: Option<String>,
    pub session_ttl: Option<Duration>,
    pub default_page_size: Option<u32>,
    pub max_page_size: Option<u32>,
    pub operation_timeout: Option<Duration>,
    pub max_image_bytes: Option<usize>,
    pub compensate_failed_uploads: Option<bool>,
}

impl EnvConfig {
    /// Read the process environment.
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset;
    /// values that fail to parse are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            config_path: get(CONFIG_PATH_ENV).map(PathBuf::from),
            server_host: get("SERVER_HOST"),
            server_port: parse_var(&get, "SERVER_PORT", |raw| raw.trim().parse().ok())?,
            storage_backend: parse_var(&get, "STORAGE_BACKEND", |raw| {
                StorageBackend::from_str(raw).ok()
            })?,
            blob_root: get("BLOB_STORE_DIR").map(PathBuf::from),
            database_url: get("DATABASE_URL"),
            redis_url: get("REDIS_URL"),
            auth_password_pepper: get("AUTH_PASSWORD_PEPPER"),
            auth_token_key: get("AUTH_TOKEN_KEY"),
            session_ttl: parse_var(&get, "SESSION_TTL", parse_duration)?,
            default_page_size: parse_var(&get, "LIST_DEFAULT_PAGE_SIZE", |raw| {
                raw.trim().parse().ok()
            })?,
            max_page_size: parse_var(&get, "LIST_MAX_PAGE_SIZE", |raw| {
                raw.trim().parse().ok()
            })?,
            operation_timeout: parse_var(&get, "OPERATION_TIMEOUT", parse_duration)?,
            max_image_bytes: parse_var(&get, "MAX_IMAGE_BYTES", |raw| {
                raw.trim().parse().ok()
            })?,
            compensate_failed_uploads: parse_var(
                &get,
                "COMPENSATE_FAILED_UPLOADS",
                parse_bool,
            )?,
        })
    }
}

fn parse_var<T, G, P>(get: &G, key: &str, parse: P) -> Result<Option<T>, ConfigLoadError>
where
    G: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => parse(&raw).map(Some).ok_or_else(|| ConfigLoadError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}
