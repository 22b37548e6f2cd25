//! [`RowSource`] over a SQLite connection.

use super::query;
use crate::cancel::CancelToken;
use crate::model::Comment;
use crate::source::{RangeQuery, RowSource, SourceError};
use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// SQLite VM steps between cancellation checks.
const PROGRESS_STEPS: i32 = 1_000;

/// SQLite-backed comment store.
///
/// The connection sits behind a mutex, so concurrent reads (including the two
/// sides of a window) are serialized on it. Each read installs a progress
/// handler that interrupts the running statement once the cancel token fires.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and migrate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        super::open_store(path).map(Self::from_connection)
    }

    /// A migrated private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be configured or migrated.
    pub fn open_in_memory() -> Result<Self> {
        super::open_in_memory().map(Self::from_connection)
    }

    /// Wrap an already configured and migrated connection.
    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Borrow the connection, e.g. for the write helpers in [`query`].
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(
        &self,
        cancel: &CancelToken,
        op: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T, SourceError> {
        cancel.check()?;

        let conn = self.conn();
        let token = cancel.clone();
        conn.progress_handler(PROGRESS_STEPS, Some(move || token.is_cancelled()));
        let result = op(&conn);
        conn.progress_handler(PROGRESS_STEPS, None::<fn() -> bool>);

        match result {
            Ok(value) => Ok(value),
            Err(_) if cancel.is_cancelled() => {
                warn!("sqlite read interrupted by cancellation");
                Err(SourceError::Cancelled)
            }
            Err(err) => Err(SourceError::Backend(err)),
        }
    }
}

impl RowSource for SqliteStore {
    type Row = Comment;

    fn query(&self, query: &RangeQuery, cancel: &CancelToken) -> Result<Vec<Comment>, SourceError> {
        self.read(cancel, |conn| query::query_comments(conn, query))
    }

    fn get_by_id(&self, id: i64, cancel: &CancelToken) -> Result<Option<Comment>, SourceError> {
        self.read(cancel, |conn| query::get_comment(conn, id))
    }

    fn scope_exists(&self, post_id: i64, cancel: &CancelToken) -> Result<bool, SourceError> {
        self.read(cancel, |conn| query::post_exists(conn, post_id))
    }
}
