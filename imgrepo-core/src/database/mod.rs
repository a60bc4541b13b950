//! PostgreSQL adapters.

pub mod images;
pub mod users;

pub use images::PostgresImageRepository;
pub use users::PostgresUserRepository;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
