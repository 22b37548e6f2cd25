//! The abstract ordered row source consumed by the pagination engine.
//!
//! A row source only has to understand four things about a query: an
//! equality scope (one post, or the published feed), a visibility filter,
//! ordering by `(created_at, id)` in either direction, and an optional strict
//! range bound on that same tuple. Both [`crate::memory::MemoryStore`] and
//! [`crate::db::store::SqliteStore`] implement it.

use crate::cancel::CancelToken;
use crate::page::{Scope, SortKey, Visibility};
use std::fmt;

/// A paginated record. The engine only ever looks at these accessors.
pub trait Record: Clone + Send {
    /// Total-order key `(created_at, id)`.
    fn sort_key(&self) -> SortKey;

    /// Id of the post this record belongs to.
    fn scope_id(&self) -> i64;

    /// Soft-delete flag, checked against [`Visibility`].
    fn is_deleted(&self) -> bool;
}

/// Ordering direction over the sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (oldest first).
    #[default]
    Asc,
    /// Descending order (newest first).
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("asc"),
            Self::Desc => f.write_str("desc"),
        }
    }
}

/// Strict range bound on the sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Only keys strictly greater than the given key.
    After(SortKey),
    /// Only keys strictly less than the given key.
    Before(SortKey),
}

impl Boundary {
    /// Returns true when `key` lies on the admitted side of the bound.
    #[must_use]
    pub fn admits(&self, key: &SortKey) -> bool {
        match self {
            Self::After(bound) => key > bound,
            Self::Before(bound) => key < bound,
        }
    }
}

/// A single bounded, ordered range read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    pub scope: Scope,
    pub visibility: Visibility,
    pub order: OrderDirection,
    pub boundary: Option<Boundary>,
    /// Maximum number of rows to return.
    pub limit: usize,
}

/// Failure reported by a [`RowSource`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The cancel token fired before the read finished.
    #[error("query cancelled")]
    Cancelled,

    /// The backing store failed.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Ordered row source backing the pagination engine.
///
/// Implementations must return rows of [`RowSource::query`] already ordered by
/// `(created_at, id)` in the requested direction, and must honor `cancel`
/// while waiting on the underlying store.
pub trait RowSource: Send + Sync {
    type Row: Record;

    /// Run a bounded range query.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Cancelled`] when `cancel` fires, or
    /// [`SourceError::Backend`] when the store fails.
    fn query(&self, query: &RangeQuery, cancel: &CancelToken)
    -> Result<Vec<Self::Row>, SourceError>;

    /// Fetch one record by id regardless of visibility.
    ///
    /// # Errors
    ///
    /// Same as [`RowSource::query`].
    fn get_by_id(&self, id: i64, cancel: &CancelToken) -> Result<Option<Self::Row>, SourceError>;

    /// Whether the scoping post exists.
    ///
    /// # Errors
    ///
    /// Same as [`RowSource::query`].
    fn scope_exists(&self, post_id: i64, cancel: &CancelToken) -> Result<bool, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::{Boundary, OrderDirection};
    use crate::page::SortKey;
    use chrono::{TimeZone, Utc};

    fn key(secs: i64, id: i64) -> SortKey {
        SortKey::new(Utc.timestamp_opt(secs, 0).unwrap(), id)
    }

    #[test]
    fn boundaries_are_strict_and_tie_break_on_id() {
        let pivot = key(100, 5);
        let after = Boundary::After(pivot);
        let before = Boundary::Before(pivot);

        assert!(!after.admits(&pivot));
        assert!(!before.admits(&pivot));

        assert!(after.admits(&key(100, 6)));
        assert!(!after.admits(&key(100, 4)));
        assert!(before.admits(&key(100, 4)));
        assert!(before.admits(&key(99, 500)));
        assert!(after.admits(&key(101, 1)));
    }

    #[test]
    fn order_direction_defaults_to_ascending() {
        assert_eq!(OrderDirection::default(), OrderDirection::Asc);
    }
}
