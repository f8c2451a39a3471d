//! Session store trait definition
//!
//! Defines the operations a session middleware relies on. Any storage
//! backend can be plugged in by implementing [`SessionStore`].

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::Result;

/// Storage contract for web-session state
///
/// Every operation resolves to either a value or an [`crate::Error`].
/// A session that is absent and a session that has expired are
/// indistinguishable to callers: both read back as `None`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write `session` under `sid`, replacing any existing record
    ///
    /// An empty `sid` is rejected with [`crate::Error::InvalidSessionId`].
    ///
    /// # Returns
    /// The number of rows written
    async fn set(&self, sid: &str, session: &JsonValue) -> Result<usize>;

    /// Read the session stored under `sid` if it has not expired
    async fn get(&self, sid: &str) -> Result<Option<JsonValue>>;

    /// Remove the session stored under `sid`
    ///
    /// Removing a session that does not exist succeeds with `0`.
    async fn destroy(&self, sid: &str) -> Result<usize>;

    /// Number of stored records, expired ones included
    async fn length(&self) -> Result<usize>;

    /// All non-expired sessions keyed by id
    async fn all(&self) -> Result<HashMap<String, JsonValue>>;

    /// Remove every stored record
    async fn clear(&self) -> Result<usize>;

    /// Reset the expiry of a live session without rewriting its payload
    async fn touch(&self, sid: &str, session: &JsonValue) -> Result<usize>;
}
