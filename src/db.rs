//! Request-scoped SQLite connections.
//!
//! # Lifecycle
//!
//! ```text
//! App::handle                 Database::context()   → DbContext { conn: None }
//!        ↓
//! handler: req.db()?          DbContext::acquire()  → opens once, then cached
//! handler: req.db()?          DbContext::acquire()  → same connection
//!        ↓
//! handler returns / errors /  Drop for DbContext    → release() → close()
//! panics
//! ```
//!
//! There is no pool and no global "current connection". Each request owns a
//! [`DbContext`]; the connection lives exactly as long as that value.
//!
//! # Row decoding
//!
//! Columns are read by name (`row.get("created")`). `TIMESTAMP` columns hold
//! ISO-8601 text (`2024-05-01 12:30:00` as written by `CURRENT_TIMESTAMP`,
//! or the `T`-separated form) and decode into [`chrono::NaiveDateTime`]
//! through rusqlite's `chrono` support, so handlers never see the raw string.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::error::Error;

/// The static schema script. Drops and recreates every table.
pub const SCHEMA: &str = include_str!("schema.sql");

/// Handle to the storage file. Cheap to clone; mints one [`DbContext`] per
/// request.
#[derive(Clone, Debug)]
pub struct Database {
    path: Arc<PathBuf>,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Arc::new(path.into()) }
    }

    pub fn path(&self) -> &Path { &self.path }

    /// A fresh, empty context. Nothing is opened until [`DbContext::acquire`].
    pub fn context(&self) -> DbContext {
        DbContext { path: Arc::clone(&self.path), conn: None }
    }
}

/// The connection slot of one request context.
///
/// Holds at most one [`Connection`]. Dropping the context closes it.
#[derive(Debug)]
pub struct DbContext {
    path: Arc<PathBuf>,
    conn: Option<Connection>,
}

impl DbContext {
    /// Returns this context's connection, opening it on first use.
    ///
    /// An open failure is returned to the caller and leaves the context
    /// empty, so a later call tries again.
    pub fn acquire(&mut self) -> Result<&Connection, Error> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => open(&self.path)?,
        };
        Ok(self.conn.insert(conn))
    }

    /// Whether a connection is currently held.
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Closes the held connection, if any. Safe to call repeatedly.
    ///
    /// A close failure is logged and otherwise ignored: by the time a context
    /// is torn down its response has already been produced.
    pub fn release(&mut self) {
        let Some(conn) = self.conn.take() else { return };
        match conn.close() {
            Ok(()) => debug!(path = %self.path.display(), "database connection closed"),
            Err((_conn, e)) => {
                warn!(path = %self.path.display(), "closing database connection failed: {e}");
            }
        }
    }
}

impl Drop for DbContext {
    fn drop(&mut self) {
        self.release();
    }
}

fn open(path: &Path) -> Result<Connection, Error> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)
        .map_err(|source| Error::Open { path: path.to_owned(), source })?;
    debug!(path = %path.display(), "database connection opened");
    Ok(conn)
}

/// Recreates every table from [`SCHEMA`]. Existing data is lost.
pub fn init_schema(database: &Database) -> Result<(), Error> {
    let mut ctx = database.context();
    ctx.acquire()?.execute_batch(SCHEMA).map_err(Error::Schema)?;
    info!(path = %database.path().display(), "schema initialized");
    Ok(())
}
