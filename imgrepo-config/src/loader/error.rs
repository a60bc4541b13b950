use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ConfigGuardRailError;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to load env file")]
    EnvFile(#[from] dotenvy::Error),
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
}
