use anyhow::Result;
use log::warn;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::db::migrations::run_migrations;
use crate::db::repository::MetaRepo;

/// Storage keys shared by the tracker components.
pub mod keys {
    pub const PRAYER_STATUS: &str = "prayer_status";
    pub const LAST_DATE: &str = "last_date";
    pub const THEME: &str = "theme";
    pub const CACHED_SCHEDULE: &str = "cached_schedule";
    pub const CACHED_DATE: &str = "cached_date";
    pub const CACHED_LOCATION_NAME: &str = "cached_location_name";
    pub const HISTORY: &str = "prayer_history";
    pub const HISTORY_DETAILS: &str = "prayer_details";
}

/// String key-value persistence that survives restarts.
pub trait PersistedStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Read a key, treating storage errors as absence.
pub fn read(store: &dyn PersistedStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(v) => v,
        Err(e) => {
            warn!("store read failed for {key}: {e:#}");
            None
        }
    }
}

/// Read and decode a JSON value. Malformed payloads count as absent.
pub fn read_json<T: DeserializeOwned>(store: &dyn PersistedStore, key: &str) -> Option<T> {
    let raw = read(store, key)?;
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("ignoring malformed value under {key}: {e}");
            None
        }
    }
}

/// Fire-and-forget write. Failures are logged and dropped.
pub fn write(store: &dyn PersistedStore, key: &str, value: &str) {
    if let Err(e) = store.set(key, value) {
        warn!("store write failed for {key}: {e:#}");
    }
}

pub fn write_json<T: Serialize + ?Sized>(store: &dyn PersistedStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => write(store, key, &raw),
        Err(e) => warn!("could not encode value for {key}: {e}"),
    }
}

// ─── SQLite ──────────────────────────────────────────────────────────────────

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Result<Self> {
        run_migrations(&conn)?;
        Ok(Self { conn })
    }
}

impl PersistedStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        MetaRepo::get(&self.conn, key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        MetaRepo::set(&self.conn, key, value)
    }
}

// ─── In-memory ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    values: std::cell::RefCell<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl PersistedStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
