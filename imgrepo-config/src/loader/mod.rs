pub mod error;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::{
    DEFAULT_BLOB_ROOT, DEFAULT_HOST, DEFAULT_MAX_IMAGE_BYTES,
    DEFAULT_MAX_PAGE_SIZE, DEFAULT_OPERATION_TIMEOUT, DEFAULT_PAGE_SIZE,
    DEFAULT_PASSWORD_PEPPER, DEFAULT_PORT, DEFAULT_SESSION_TTL,
    DEFAULT_TOKEN_KEY,
};
use crate::models::sources::{EnvConfig, FileConfig};
use crate::models::{
    AuthConfig, Config, ConfigMetadata, DatabaseConfig, RedisConfig,
    RepositoryConfig, ServerConfig, StorageConfig,
};
use crate::util::parse_duration;
use crate::validation::{self, ConfigWarnings};
use error::ConfigLoadError;

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["imgrepo.toml", "config/imgrepo.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

/// Result of a successful load: the configuration plus anything worth
/// logging at startup.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env`, the process environment and the config file.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        let env = EnvConfig::gather()?;
        self.load_with_env(env, env_file_loaded)
    }

    /// Same as [`ConfigLoader::load`] with an already gathered environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let (file, config_path) = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigLoadError::MissingConfig { path });
                }
                (Some(read_file_config(&path)?), Some(path))
            }
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => (Some(read_file_config(&path)?), Some(path)),
                None => (None, None),
            },
        };

        if let Some(path) = &config_path {
            debug!(path = %path.display(), "loaded configuration file");
        }

        compose(
            file,
            env,
            ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        )
    }
}

pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn file_duration(
    key: &str,
    raw: Option<String>,
) -> Result<Option<std::time::Duration>, ConfigLoadError> {
    raw.map(|value| {
        parse_duration(&value).ok_or_else(|| ConfigLoadError::InvalidValue {
            key: key.to_string(),
            value,
        })
    })
    .transpose()
}

/// Merge environment over file over defaults, then apply guard rails.
pub fn compose(
    file: Option<FileConfig>,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<ConfigLoad, ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();
    if metadata.config_path.is_none() {
        warnings.push_with_hint(
            "No imgrepo.toml detected; using environment variables and defaults",
            "Pass --config or set IMGREPO_CONFIG to use a configuration file",
        );
    }

    let FileConfig {
        server: file_server,
        storage: file_storage,
        database: file_database,
        redis: file_redis,
        auth: file_auth,
        repository: file_repository,
    } = file.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
    };

    let storage = StorageConfig {
        backend: env
            .storage_backend
            .or(file_storage.backend)
            .unwrap_or_default(),
        blob_root: env
            .blob_root
            .or(file_storage.blob_root)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BLOB_ROOT)),
    };

    let database = DatabaseConfig {
        url: env
            .database_url
            .or(file_database.url)
            .filter(|url| !url.trim().is_empty()),
    };

    let redis = env
        .redis_url
        .map(|url| RedisConfig { url })
        .or_else(|| file_redis.map(|r| RedisConfig { url: r.url }));

    let auth = AuthConfig {
        password_pepper: env
            .auth_password_pepper
            .or(file_auth.password_pepper)
            .unwrap_or_else(|| DEFAULT_PASSWORD_PEPPER.to_string()),
        token_key: env
            .auth_token_key
            .or(file_auth.token_key)
            .unwrap_or_else(|| DEFAULT_TOKEN_KEY.to_string()),
        session_ttl: env
            .session_ttl
            .or(file_duration("auth.session_ttl", file_auth.session_ttl)?)
            .unwrap_or(DEFAULT_SESSION_TTL),
    };

    let repository = RepositoryConfig {
        default_page_size: env
            .default_page_size
            .or(file_repository.default_page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE),
        max_page_size: env
            .max_page_size
            .or(file_repository.max_page_size)
            .unwrap_or(DEFAULT_MAX_PAGE_SIZE),
        operation_timeout: env
            .operation_timeout
            .or(file_duration(
                "repository.operation_timeout",
                file_repository.operation_timeout,
            )?)
            .unwrap_or(DEFAULT_OPERATION_TIMEOUT),
        max_image_bytes: env
            .max_image_bytes
            .or(file_repository.max_image_bytes)
            .unwrap_or(DEFAULT_MAX_IMAGE_BYTES),
        compensate_failed_uploads: env
            .compensate_failed_uploads
            .or(file_repository.compensate_failed_uploads)
            .unwrap_or(true),
    };

    let config = Config {
        server,
        storage,
        database,
        redis,
        auth,
        repository,
        metadata,
    };

    warnings.extend(validation::apply_guard_rails(&config)?);

    Ok(ConfigLoad { config, warnings })
}
