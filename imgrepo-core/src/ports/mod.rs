//! Capability interfaces consumed by the registry and the service layer.
//!
//! Each port has exactly one implementation per backing technology; they are
//! composed by constructor injection at startup.

pub mod blobs;
pub mod images;
pub mod sessions;
pub mod users;

pub use blobs::BlobStore;
pub use images::ImageMetadataRepository;
pub use sessions::{Session, SessionStore};
pub use users::{UserCredentialsRepository, UserService};
