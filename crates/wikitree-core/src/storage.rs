use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use serde::{Serialize, de::DeserializeOwned};
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Prefix shared by every persisted sidebar key.
pub const STORAGE_PREFIX: &str = "wiki_sidebar_";

/// Build the namespaced key for one field of a project's sidebar state.
pub fn storage_key(project_id: &str, key: &str) -> String {
    format!("{STORAGE_PREFIX}{project_id}_{key}")
}

// ── KeyValueStore ────────────────────────────────────────────────────

/// Synchronous string key/value persistence, scoped to one user profile.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
}

/// Store backed by a table in the shared SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { conn })
    }
}

/// Initialize the key/value table.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sidebar_storage (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );",
    )?;
    Ok(())
}

impl KeyValueStore for SqliteStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM sidebar_storage WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sidebar_storage (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }
}

/// Session-only store, used when persistent storage is unavailable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ── JSON helpers ─────────────────────────────────────────────────────

/// Read a JSON value, falling back when it is missing, unreadable or corrupt.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str, fallback: T) -> T {
    match store.get_item(key) {
        Ok(Some(raw)) if !raw.is_empty() => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                debug!(key, error = %err, "Ignoring unparseable stored value");
                fallback
            }
        },
        Ok(_) => fallback,
        Err(err) => {
            warn!(key, error = %err, "Storage read failed; using default");
            fallback
        }
    }
}

/// Write a JSON value. Failures are logged and the write is dropped.
pub fn save_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(key, error = %err, "Could not serialize sidebar state");
            return;
        }
    };
    if let Err(err) = store.set_item(key, &raw) {
        warn!(key, error = %err, "Storage write failed; keeping state in memory only");
    }
}

// ── Tests ────────────────────────────────────────────────────────────
