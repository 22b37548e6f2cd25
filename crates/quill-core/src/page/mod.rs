//! Relay-style keyset pagination.
//!
//! These types describe what a page request asks for and what comes back.
//! The algorithms live in the submodules:
//!
//! - [`cursor`] turns a [`SortKey`] into an opaque [`Cursor`] and back
//! - [`planner`] plans forward/backward pages (fetch `N + 1`, trim, infer has-more)
//! - [`window`] resolves a window of rows around an anchor comment
//! - [`connection`] assembles ordered rows into a [`Connection`]
//! - [`engine`] exposes the operations over a [`crate::source::RowSource`]
//!
//! Cursors are only meaningful for the scope and ordering they were issued
//! from. The engine imposes no snapshot isolation: a writer that inserts or
//! deletes between two page fetches can make a later page skip or repeat a
//! boundary row. That is inherent to keyset pagination without snapshots and
//! is accepted here.

pub mod connection;
pub mod cursor;
pub mod engine;
pub mod planner;
pub mod window;

use crate::source::Record;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Total-order key of a paginated record.
///
/// Ordered by `created_at` first, then `id`. Ids are unique, so no two
/// records in one set share a key even when timestamps tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey {
    pub created_at: DateTime<Utc>,
    pub id: i64,
}

impl SortKey {
    #[must_use]
    pub const fn new(created_at: DateTime<Utc>, id: i64) -> Self {
        Self { created_at, id }
    }
}

/// Opaque pagination cursor.
///
/// Produced by [`cursor::encode`]. Callers must hand it back verbatim and
/// never construct or parse one themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Cursor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single row of a page, tagged with its cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge<T> {
    pub cursor: Cursor,
    pub node: T,
}

/// Information about the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether more rows exist after this page.
    pub has_next_page: bool,
    /// Whether more rows exist before this page.
    pub has_previous_page: bool,
    /// Cursor of the first edge, if any.
    pub start_cursor: Option<Cursor>,
    /// Cursor of the last edge, if any.
    pub end_cursor: Option<Cursor>,
}

/// Paginated result: edges in ascending sort-key order plus page info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    /// No edges, both page flags false.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::default(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|edge| &edge.node)
    }
}

/// Optional equality filter: either unconstrained or pinned to one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Filter<T> {
    Any,
    Equals(T),
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Self::Any
    }
}

impl<T: PartialEq> Filter<T> {
    /// Returns true when `value` passes the filter.
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Self::Any => true,
            Self::Equals(expected) => expected == value,
        }
    }
}

/// Secondary visibility predicate applied on top of the scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Visibility {
    /// Soft-delete filter.
    pub deleted: Filter<bool>,
}

impl Visibility {
    /// Every record, deleted or not.
    pub const ALL: Self = Self {
        deleted: Filter::Any,
    };

    /// Only records that are not soft-deleted.
    pub const LIVE: Self = Self {
        deleted: Filter::Equals(false),
    };

    /// Only soft-deleted records.
    pub const DELETED: Self = Self {
        deleted: Filter::Equals(true),
    };

    pub fn admits<R: Record>(&self, record: &R) -> bool {
        self.deleted.admits(&record.is_deleted())
    }
}

/// Partition a paginated set is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Scope {
    /// Comments of a single post.
    Post(i64),
    /// Every comment whose post is published.
    Feed,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post(id) => write!(f, "post:{id}"),
            Self::Feed => f.write_str("feed"),
        }
    }
}

/// Decoded page request: exactly one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    /// `first` rows after the optional `after` key, ascending.
    Forward { first: u32, after: Option<SortKey> },
    /// `last` rows before the optional `before` key, returned ascending.
    Backward { last: u32, before: Option<SortKey> },
}

impl PageDirection {
    /// Requested page size.
    #[must_use]
    pub const fn count(&self) -> u32 {
        match self {
            Self::Forward { first, .. } => *first,
            Self::Backward { last, .. } => *last,
        }
    }
}

/// Raw Relay arguments as received from a client.
///
/// See [`planner::PageQueryPlanner::direction`] for the accepted
/// combinations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageArgs {
    pub first: Option<u32>,
    pub after: Option<String>,
    pub last: Option<u32>,
    pub before: Option<String>,
}

impl PageArgs {
    #[must_use]
    pub fn forward(first: u32, after: Option<&str>) -> Self {
        Self {
            first: Some(first),
            after: after.map(str::to_string),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn backward(last: u32, before: Option<&str>) -> Self {
        Self {
            last: Some(last),
            before: before.map(str::to_string),
            ..Self::default()
        }
    }

    /// No direction at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first.is_none() && self.after.is_none() && self.last.is_none() && self.before.is_none()
    }
}
