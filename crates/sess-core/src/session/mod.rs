//! Session storage module
//!
//! Provides the storage contract a session middleware depends on,
//! a SQLite implementation of it, and an optional expired-row sweeper.

pub mod cleanup;
pub mod expiry;
mod store;
mod traits;

pub use cleanup::{spawn_cleanup_task, DEFAULT_CLEANUP_INTERVAL_SECS};
pub use expiry::DEFAULT_MAX_AGE_SECS;
pub use store::{SharedConnection, SqliteStore, SqliteStoreOptions};
pub use traits::SessionStore;
