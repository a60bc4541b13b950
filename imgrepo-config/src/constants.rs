use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_BLOB_ROOT: &str = "./data/blobs";

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 64 * 1024 * 1024;

// Development-only secrets; guard rails warn when they are in use.
pub const DEFAULT_PASSWORD_PEPPER: &str = "imgrepo-dev-pepper-change-me";
pub const DEFAULT_TOKEN_KEY: &str = "imgrepo-dev-token-key-change-me";

pub const CONFIG_PATH_ENV: &str = "IMGREPO_CONFIG";
