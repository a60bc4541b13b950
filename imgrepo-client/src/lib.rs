//! Client driver for the imgrepo server.
//!
//! [`RepositoryClient`] holds the session obtained by `login` and drives the
//! sending half of an upload and the receiving half of a download over the
//! framed transfer protocol.

pub mod client;
pub mod config;
pub mod files;

pub use client::{ListPage, RepositoryClient};
pub use config::ClientConfig;
pub use files::find_files;
pub use imgrepo_core::{RepoError, Result};
