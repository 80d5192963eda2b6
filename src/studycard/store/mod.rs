//! # Storage Layer
//!
//! Durable key-value storage for the session. Three logical records are kept,
//! each under its own key and each holding a JSON document:
//!
//! ```text
//! <data dir>/
//! ├── lastCard.json      # the draft being edited
//! ├── userInfo.json      # author nickname and avatar
//! ├── cardHistory.json   # exported cards, newest first
//! └── config.json        # see config.rs (not managed by the store)
//! ```
//!
//! The [`KeyValueStore`] trait only moves strings in and out. Encoding,
//! decoding and the fallback-to-defaults policy live in [`crate::persist`].
//!
//! ## Implementations
//!
//! - [`fs::FsBackend`]: one file per key, written atomically (tmp + rename).
//! - [`memory::MemBackend`]: in-memory map for tests, with write-error
//!   simulation.

use crate::error::Result;

pub mod fs;
pub mod memory;

pub const DRAFT_KEY: &str = "lastCard";
pub const AUTHOR_KEY: &str = "userInfo";
pub const HISTORY_KEY: &str = "cardHistory";

/// Raw string storage addressed by key.
///
/// Methods take `&self`; backends that need mutation use interior
/// mutability, since the application is single-threaded.
pub trait KeyValueStore {
    /// Returns `Ok(None)` when the key has never been written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    /// Must not leave a partially written value behind.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}
