//! SQLite-backed point store.
//!
//! Persists every captured fix in a single `locations` table. The schema is
//! created lazily on first use so callers never have to initialize the store
//! explicitly; the one-time setup is guarded by a double-checked lock and
//! runs at most once even when the first calls race each other.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use log::{debug, info};
use rusqlite::{params, Connection};

use crate::{LocationRecord, StoreError};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS locations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        captured_at INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_locations_captured_at
        ON locations(captured_at);
"#;

/// Lazily initialized store for captured location fixes.
///
/// All methods take `&self`; the connection is serialized behind a mutex,
/// which is plenty for one sampling loop plus occasional UI actions.
pub struct LocationStore {
    conn: Mutex<Connection>,
    initialized: AtomicBool,
    init_gate: Mutex<()>,
    setup_runs: AtomicU32,
}

impl LocationStore {
    /// Open (or create) the database file at `path`.
    ///
    /// The conventional filename is `locations.db3` inside the app's private
    /// data directory; the store itself is path-agnostic.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        debug!("[LocationStore] Opened {}", path.as_ref().display());
        Ok(Self::from_connection(conn))
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            initialized: AtomicBool::new(false),
            init_gate: Mutex::new(()),
            setup_runs: AtomicU32::new(0),
        }
    }

    /// Run the one-time schema setup if it has not happened yet.
    ///
    /// Fast path: a single atomic load once initialized. Slow path: take the
    /// init gate, re-check the flag, then create the table. Concurrent first
    /// callers serialize on the gate and only one of them executes the DDL.
    fn ensure_initialized(&self) -> Result<(), StoreError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        let _gate = self.init_gate.lock().unwrap();
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        self.conn.lock().unwrap().execute_batch(SCHEMA)?;
        self.setup_runs.fetch_add(1, Ordering::Relaxed);
        self.initialized.store(true, Ordering::Release);
        info!("[LocationStore] Schema initialized");
        Ok(())
    }

    /// Persist one fix and return its store-assigned id.
    pub fn add(
        &self,
        latitude: f64,
        longitude: f64,
        captured_at: i64,
    ) -> Result<i64, StoreError> {
        self.ensure_initialized()?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO locations (latitude, longitude, captured_at) VALUES (?, ?, ?)",
            params![latitude, longitude, captured_at],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Fetch a fresh snapshot of every stored record, newest capture first.
    pub fn list_all(&self) -> Result<Vec<LocationRecord>, StoreError> {
        self.ensure_initialized()?;

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, latitude, longitude, captured_at
             FROM locations
             ORDER BY captured_at DESC, id DESC",
        )?;

        let records = stmt
            .query_map([], |row| {
                Ok(LocationRecord {
                    id: row.get(0)?,
                    latitude: row.get(1)?,
                    longitude: row.get(2)?,
                    captured_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Delete every stored record, returning how many were removed.
    pub fn clear(&self) -> Result<usize, StoreError> {
        self.ensure_initialized()?;

        let removed = self
            .conn
            .lock()
            .unwrap()
            .execute("DELETE FROM locations", [])?;
        info!("[LocationStore] Cleared {} record(s)", removed);
        Ok(removed)
    }
}
