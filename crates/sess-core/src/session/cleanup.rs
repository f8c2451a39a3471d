//! Background removal of expired session rows.
//!
//! Reads already hide expired sessions, so this task only reclaims space.
//! It is never started by the store itself.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

use super::store::SqliteStore;

/// Default cleanup interval in seconds.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 900;

/// Spawn a task that periodically deletes expired sessions.
///
/// Returns a `JoinHandle` that can be used to abort the task.
pub fn spawn_cleanup_task(
    store: Arc<SqliteStore>,
    cleanup_interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(cleanup_interval_secs.max(1)));

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match store.clear_expired() {
                Ok(0) => debug!("Session cleanup: no expired sessions"),
                Ok(count) => info!(removed = count, "Session cleanup completed"),
                Err(e) => warn!(error = %e, "Session cleanup failed"),
            }

            match store.count() {
                Ok(count) => debug!(stored_sessions = count, "Session store status"),
                Err(e) => debug!(error = %e, "Failed to get session count"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SharedConnection, SqliteStoreOptions};
    use rusqlite::Connection;
    use serde_json::json;
    use std::sync::Mutex;

    fn test_store() -> Arc<SqliteStore> {
        let conn: SharedConnection = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
        Arc::new(SqliteStore::new(SqliteStoreOptions::new().with_client(conn)).unwrap())
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_only() {
        let store = test_store();
        store.upsert("valid", &json!({"cookie": {"maxAge": 3600}})).unwrap();
        store.upsert("expired", &json!({"cookie": {"maxAge": -1}})).unwrap();
        assert_eq!(store.count().unwrap(), 2);

        let handle = spawn_cleanup_task(Arc::clone(&store), 1);

        // Wait for at least one cleanup cycle
        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.abort();

        assert_eq!(store.count().unwrap(), 1);
        assert!(store.get("valid").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let store = test_store();
        let handle = spawn_cleanup_task(Arc::clone(&store), 3600);
        handle.abort();

        let result = handle.await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
