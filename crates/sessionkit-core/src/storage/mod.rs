//! Persistent key-value storage backends.
//!
//! Everything the session layer persists (the credential record, the OTP
//! validation hash and the GraphQL response cache) goes through the
//! `KeyValueStore` trait, so the host application decides where it lands:
//!
//! - `MemoryStore`: process-local, for tests and ephemeral sessions
//! - `FileStore`: one JSON file per key in a cache directory
//! - `KeyringStore`: the OS keychain, for secrets

pub mod file;
pub mod keychain;
pub mod memory;

use futures::future::BoxFuture;
use thiserror::Error;

pub use self::file::FileStore;
pub use self::keychain::KeyringStore;
pub use self::memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Keychain error: {0}")]
    Keychain(#[from] keyring::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Async string key-value store.
///
/// `set` must replace the previous value atomically: a concurrent `get`
/// observes either the old value or the new one in full.
pub trait KeyValueStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<Option<String>>>;

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, StorageResult<()>>;

    /// Removing a missing key is not an error.
    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StorageResult<()>>;
}
