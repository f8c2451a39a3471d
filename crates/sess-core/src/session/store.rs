//! Session persistence using SQLite

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{Connection, params};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::session::SessionStore;
use crate::session::expiry::{self, DEFAULT_MAX_AGE_SECS};
use crate::config::StoreConfig;
use crate::{Error, Result};

/// An open SQLite connection shared between the store and its owner
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Options for building a [`SqliteStore`]
#[derive(Debug, Clone)]
pub struct SqliteStoreOptions {
    /// Already-open connection (required)
    pub client: Option<SharedConnection>,
    /// Session table name
    pub table_name: String,
    /// Max-age applied when a session has no `cookie.maxAge` (seconds)
    pub default_max_age_secs: i64,
}

impl Default for SqliteStoreOptions {
    fn default() -> Self {
        Self {
            client: None,
            table_name: "sessions".to_string(),
            default_max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }
}

impl SqliteStoreOptions {
    /// Create options with default settings and no client
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from the store section of the configuration
    pub fn from_config(config: &StoreConfig, client: SharedConnection) -> Self {
        Self {
            client: Some(client),
            table_name: config.table_name.clone(),
            default_max_age_secs: config.default_max_age_secs,
        }
    }

    pub fn with_client(mut self, client: SharedConnection) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_default_max_age(mut self, secs: i64) -> Self {
        self.default_max_age_secs = secs;
        self
    }
}

/// SQL statements bound to a table name
#[derive(Debug)]
struct Statements {
    upsert: String,
    select_active: String,
    select_all_active: String,
    select_expire: String,
    delete: String,
    delete_all: String,
    delete_expired: String,
    touch: String,
    count: String,
}

impl Statements {
    fn new(table: &str) -> Self {
        Self {
            upsert: format!(
                "INSERT OR REPLACE INTO {table} (sid, sess, expire) VALUES (?1, ?2, ?3)"
            ),
            select_active: format!(
                "SELECT sess FROM {table}
                 WHERE sid = ?1 AND julianday('now') < julianday(expire)"
            ),
            select_all_active: format!(
                "SELECT sid, sess FROM {table}
                 WHERE julianday('now') < julianday(expire)"
            ),
            select_expire: format!("SELECT expire FROM {table} WHERE sid = ?1"),
            delete: format!("DELETE FROM {table} WHERE sid = ?1"),
            delete_all: format!("DELETE FROM {table}"),
            delete_expired: format!(
                "DELETE FROM {table} WHERE julianday(expire) <= julianday('now')"
            ),
            touch: format!(
                "UPDATE {table} SET expire = ?2
                 WHERE sid = ?1 AND julianday('now') < julianday(expire)"
            ),
            count: format!("SELECT COUNT(*) FROM {table}"),
        }
    }
}

/// SQLite-based session store
///
/// Expiry is evaluated when reading: a record past its `expire` timestamp
/// is never returned, but stays in the table until it is destroyed or
/// swept by [`SqliteStore::clear_expired`].
#[derive(Debug)]
pub struct SqliteStore {
    client: SharedConnection,
    table_name: String,
    default_max_age_secs: i64,
    sql: Statements,
}

impl SqliteStore {
    /// Create a store over the connection in `options` and ensure its table exists
    ///
    /// Fails with [`Error::Config`] before touching the database when the
    /// client is missing or the options are invalid.
    pub fn new(options: SqliteStoreOptions) -> Result<Self> {
        let client = options.client.ok_or_else(|| {
            Error::Config("A client must be directly provided to SqliteStore".to_string())
        })?;

        if !is_valid_table_name(&options.table_name) {
            return Err(Error::Config(format!(
                "Invalid session table name: {:?}",
                options.table_name
            )));
        }
        if options.default_max_age_secs <= 0 {
            return Err(Error::Config(format!(
                "Default max-age must be positive, got {}",
                options.default_max_age_secs
            )));
        }

        let store = Self {
            client,
            sql: Statements::new(&options.table_name),
            table_name: options.table_name,
            default_max_age_secs: options.default_max_age_secs,
        };
        store.init_table()?;
        info!("SqliteStore initialized (table: {})", store.table_name);
        Ok(store)
    }

    /// Session table name
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Max-age applied when a session carries none
    pub fn default_max_age_secs(&self) -> i64 {
        self.default_max_age_secs
    }

    /// Initialize the session table
    fn init_table(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    sid TEXT NOT NULL PRIMARY KEY,
                    sess JSON NOT NULL,
                    expire TEXT NOT NULL
                )",
                self.table_name
            ),
            [],
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.client.lock().map_err(|_| Error::LockPoisoned)
    }

    /// Write a session, replacing any existing record with the same id
    ///
    /// The expiry is recomputed from the current time on every write.
    pub fn upsert(&self, sid: &str, session: &JsonValue) -> Result<usize> {
        check_sid(sid)?;
        let expire = expiry::compute_expiry(session, self.default_max_age_secs, Utc::now())?;
        let payload = encode_payload(session)?;

        let conn = self.conn()?;
        let written = conn.execute(
            &self.sql.upsert,
            params![sid, payload, expiry::format_expiry(expire)],
        )?;

        debug!("Saved session {} (expires {})", sid, expire);
        Ok(written)
    }

    /// Load a session by ID if it has not expired
    pub fn get(&self, sid: &str) -> Result<Option<JsonValue>> {
        let conn = self.conn()?;
        let result = conn.query_row(&self.sql.select_active, params![sid], |row| {
            row.get::<_, SqlValue>(0)
        });

        match result {
            Ok(payload) => Ok(Some(decode_payload(payload)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                debug!("No active session for {}", sid);
                Ok(None)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    /// Delete a session by ID
    pub fn destroy(&self, sid: &str) -> Result<usize> {
        let conn = self.conn()?;
        let affected = conn.execute(&self.sql.delete, params![sid])?;
        debug!("Destroyed session {} ({} rows)", sid, affected);
        Ok(affected)
    }

    /// Count stored rows, including expired rows that have not been removed
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(&self.sql.count, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Load every non-expired session keyed by id
    pub fn all(&self) -> Result<HashMap<String, JsonValue>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&self.sql.select_all_active)?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, SqlValue>(1)?))
        })?;

        let mut sessions = HashMap::new();
        for row in rows {
            let (sid, payload) = row?;
            sessions.insert(sid, decode_payload(payload)?);
        }
        Ok(sessions)
    }

    /// Delete every stored session
    pub fn clear(&self) -> Result<usize> {
        let conn = self.conn()?;
        let affected = conn.execute(&self.sql.delete_all, [])?;
        info!("Cleared {} sessions", affected);
        Ok(affected)
    }

    /// Recompute the expiry of a live session from `session`'s max-age
    ///
    /// The stored payload is left untouched. Absent or expired sessions
    /// are not revived.
    pub fn touch(&self, sid: &str, session: &JsonValue) -> Result<usize> {
        check_sid(sid)?;
        let expire = expiry::compute_expiry(session, self.default_max_age_secs, Utc::now())?;

        let conn = self.conn()?;
        let affected = conn.execute(
            &self.sql.touch,
            params![sid, expiry::format_expiry(expire)],
        )?;
        debug!("Touched session {} ({} rows)", sid, affected);
        Ok(affected)
    }

    /// Physically delete rows whose expiry has passed
    pub fn clear_expired(&self) -> Result<usize> {
        let conn = self.conn()?;
        let affected = conn.execute(&self.sql.delete_expired, [])?;
        debug!("Removed {} expired sessions", affected);
        Ok(affected)
    }

    /// Stored expiry of a session, whether or not it has passed
    pub fn expiry(&self, sid: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn()?;
        let result = conn.query_row(&self.sql.select_expire, params![sid], |row| {
            row.get::<_, String>(0)
        });

        match result {
            Ok(expire) => Ok(Some(expiry::parse_expiry(&expire)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::from(e)),
        }
    }
}

/// Each call locks the shared connection and runs its statement inline,
/// so it blocks the calling worker until SQLite returns.
#[async_trait]
impl SessionStore for SqliteStore {
    async fn set(&self, sid: &str, session: &JsonValue) -> Result<usize> {
        self.upsert(sid, session)
    }

    async fn get(&self, sid: &str) -> Result<Option<JsonValue>> {
        SqliteStore::get(self, sid)
    }

    async fn destroy(&self, sid: &str) -> Result<usize> {
        SqliteStore::destroy(self, sid)
    }

    async fn length(&self) -> Result<usize> {
        self.count()
    }

    async fn all(&self) -> Result<HashMap<String, JsonValue>> {
        SqliteStore::all(self)
    }

    async fn clear(&self) -> Result<usize> {
        SqliteStore::clear(self)
    }

    async fn touch(&self, sid: &str, session: &JsonValue) -> Result<usize> {
        SqliteStore::touch(self, sid, session)
    }
}

fn check_sid(sid: &str) -> Result<()> {
    if sid.is_empty() {
        return Err(Error::InvalidSessionId("session id must not be empty".to_string()));
    }
    Ok(())
}

/// Serialize a session for the `sess` column.
///
/// The column has NUMERIC affinity, which would coerce a bare JSON number
/// into an INTEGER or REAL and lose its exact form. Those payloads are
/// bound as BLOBs, which SQLite never coerces.
fn encode_payload(session: &JsonValue) -> Result<SqlValue> {
    let sess_json = serde_json::to_string(session)?;
    if session.is_number() {
        Ok(SqlValue::Blob(sess_json.into_bytes()))
    } else {
        Ok(SqlValue::Text(sess_json))
    }
}

/// Rebuild a session from whatever storage class the `sess` column holds.
///
/// INTEGER and REAL only appear in rows written by other clients.
fn decode_payload(payload: SqlValue) -> Result<JsonValue> {
    match payload {
        SqlValue::Text(text) => Ok(serde_json::from_str(&text)?),
        SqlValue::Blob(bytes) => Ok(serde_json::from_slice(&bytes)?),
        SqlValue::Integer(n) => Ok(JsonValue::from(n)),
        SqlValue::Real(f) => Ok(JsonValue::from(f)),
        SqlValue::Null => Err(Error::Database(rusqlite::Error::InvalidColumnType(
            0,
            "sess".to_string(),
            Type::Null,
        ))),
    }
}

/// Table names are interpolated into SQL, so only plain identifiers are allowed
fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
