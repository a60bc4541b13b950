//! Coordination layer of the imgrepo image repository.
//!
//! - [`registry`]: metadata registry over a metadata store and a blob store.
//! - [`transfer`]: chunked transfer protocol (codec, chunker, receiver).
//! - [`auth`]: credential hashing, session tokens and the credential service.
//! - [`ports`]: capability traits with in-memory, cacache, Redis and
//!   PostgreSQL implementations.

pub mod auth;
#[cfg(feature = "database")]
pub mod database;
pub mod deadline;
pub mod error;
pub mod infra;
pub mod ports;
pub mod registry;
pub mod transfer;

pub use error::{RepoError, Result, ResultExt};
pub use imgrepo_model as model;
pub use registry::{ImageRegistry, RegistryOptions};
