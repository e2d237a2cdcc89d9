//! Cache infrastructure - store implementations

mod factory;
mod filesystem;
mod redis;

pub use factory::{StoreConfig, StoreFactory, StoreType};
pub use filesystem::{FilesystemStore, FilesystemStoreConfig};
pub use self::redis::{RedisStore, RedisStoreConfig};
