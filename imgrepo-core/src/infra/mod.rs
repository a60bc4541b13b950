pub mod blob_store;
pub mod memory;
#[cfg(feature = "database")]
pub mod redis_sessions;

pub use blob_store::{BlobCacheRoot, CacacheBlobStore};
pub use memory::{
    InMemoryBlobStore, InMemoryImageRepository, InMemorySessionStore,
    InMemoryUserRepository,
};
#[cfg(feature = "database")]
pub use redis_sessions::RedisSessionStore;
