//! Database layer for the task tracker.

pub mod schema;
pub mod tasks;
pub mod update;

use crate::error::{TaskError, TaskResult};
use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Database handle wrapping a SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;",
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection lock poisoned"))?;
        embedded::migrations::runner().run(&mut *conn)?;
        Ok(())
    }

    /// Execute a function with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> TaskResult<T>
    where
        F: FnOnce(&Connection) -> TaskResult<T>,
    {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        f(&conn)
    }

    /// Execute a function with mutable access to the connection (for transactions).
    pub fn with_conn_mut<F, T>(&self, f: F) -> TaskResult<T>
    where
        F: FnOnce(&mut Connection) -> TaskResult<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| poisoned())?;
        f(&mut conn)
    }
}

fn poisoned() -> TaskError {
    TaskError::storage(anyhow::anyhow!("database connection lock poisoned"))
}

/// Storage representation of a timestamp: Unix epoch milliseconds.
pub fn to_millis<Tz: TimeZone>(at: &DateTime<Tz>) -> i64 {
    at.timestamp_millis()
}

fn millis_to_datetime(row: &Row, column: &str, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        let idx = row.as_ref().column_index(column).unwrap_or_default();
        rusqlite::Error::IntegralValueOutOfRange(idx, ms)
    })
}

/// Read a non-null millisecond timestamp column.
pub(crate) fn get_timestamp(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(column)?;
    millis_to_datetime(row, column, ms)
}

/// Read a nullable millisecond timestamp column.
pub(crate) fn get_opt_timestamp(row: &Row, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let ms: Option<i64> = row.get(column)?;
    ms.map(|ms| millis_to_datetime(row, column, ms)).transpose()
}
