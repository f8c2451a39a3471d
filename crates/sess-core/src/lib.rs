//! sess-core: SQLite-backed web session store
//!
//! セッションデータを SQLite テーブルに保存し、
//! 読み込み時に有効期限を判定するストアを提供します。

pub mod config;
pub mod error;
pub mod session;

pub use config::{CleanupConfig, Config, StoreConfig};
pub use error::{Error, Result};
pub use session::{SessionStore, SharedConnection, SqliteStore, SqliteStoreOptions};
