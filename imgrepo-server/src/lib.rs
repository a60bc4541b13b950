//! # imgrepo server
//!
//! HTTP surface of the image repository: session-authenticated chunked
//! uploads and downloads plus keyset-paginated listing, over a PostgreSQL,
//! Redis and cacache backend or a fully in-memory one.

pub mod handlers;
pub mod infra;
pub mod routes;
pub mod service;

pub use infra::app_state::AppState;
pub use routes::create_app;
pub use service::RepositoryService;
