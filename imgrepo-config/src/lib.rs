//! Configuration for the imgrepo server.
//!
//! Values are composed from environment variables, an optional TOML file and
//! built-in defaults, in that order of precedence. A `.env` file is loaded
//! first when present.

pub mod constants;
pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{
    AuthConfig, Config, ConfigMetadata, DatabaseConfig, RedisConfig,
    RepositoryConfig, ServerConfig, StorageBackend, StorageConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
