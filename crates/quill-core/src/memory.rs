//! In-memory row source.
//!
//! Holds posts and comments behind an [`RwLock`]. Queries scan, filter and
//! sort on every call, which is fine for tests and small fixtures. An
//! optional per-read latency and failure switch make cancellation and error
//! paths reproducible.

use crate::cancel::CancelToken;
use crate::model::{Comment, Post};
use crate::page::Scope;
use crate::source::{OrderDirection, RangeQuery, Record, RowSource, SourceError};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use std::time::{Duration, Instant};

const LATENCY_SLICE: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
struct State {
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    latency: Duration,
    failing: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every read sleeps for `latency`, waking early if cancelled.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Make every read fail with a backend error until switched off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_post(
        &self,
        post_id: i64,
        title: &str,
        is_published: bool,
        created_at: DateTime<Utc>,
    ) -> Post {
        let post = Post {
            post_id,
            title: title.to_string(),
            is_published,
            created_at,
        };
        self.write().posts.insert(post_id, post.clone());
        post
    }

    /// Flip a post's published flag. Returns false when the post is unknown.
    pub fn set_published(&self, post_id: i64, is_published: bool) -> bool {
        self.write()
            .posts
            .get_mut(&post_id)
            .map(|post| post.is_published = is_published)
            .is_some()
    }

    /// Insert or replace a comment with an explicit id.
    pub fn insert_comment(&self, comment: Comment) {
        self.write().comments.insert(comment.comment_id, comment);
    }

    /// Append a live comment with the next free id. Returns `None` once the
    /// highest id is `i64::MAX`.
    pub fn add_comment(
        &self,
        post_id: i64,
        author: &str,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> Option<Comment> {
        let mut state = self.write();
        let comment_id = match state.comments.last_key_value() {
            Some((id, _)) => id.checked_add(1)?,
            None => 1,
        };
        let comment = Comment {
            comment_id,
            post_id,
            author: author.to_string(),
            body: body.to_string(),
            is_deleted: false,
            deleted_at: None,
            created_at,
        };
        state.comments.insert(comment_id, comment.clone());
        Some(comment)
    }

    /// Mark a comment deleted. Returns false when it is unknown.
    pub fn soft_delete(&self, comment_id: i64, at: DateTime<Utc>) -> bool {
        self.write()
            .comments
            .get_mut(&comment_id)
            .map(|comment| {
                comment.is_deleted = true;
                comment.deleted_at = Some(at);
            })
            .is_some()
    }

    fn simulate_read(&self, cancel: &CancelToken) -> Result<(), SourceError> {
        cancel.check()?;
        if !self.latency.is_zero() {
            let started = Instant::now();
            while started.elapsed() < self.latency {
                thread::sleep(LATENCY_SLICE);
                cancel.check()?;
            }
        }
        if self.failing.load(Ordering::Acquire) {
            return Err(anyhow::anyhow!("memory store is failing").into());
        }
        Ok(())
    }
}

impl RowSource for MemoryStore {
    type Row = Comment;

    fn query(&self, query: &RangeQuery, cancel: &CancelToken) -> Result<Vec<Comment>, SourceError> {
        self.simulate_read(cancel)?;

        let state = self.read();
        let in_scope = |comment: &Comment| match query.scope {
            Scope::Post(post_id) => comment.post_id == post_id,
            Scope::Feed => state
                .posts
                .get(&comment.post_id)
                .is_some_and(|post| post.is_published),
        };

        let mut rows: Vec<Comment> = state
            .comments
            .values()
            .filter(|comment| in_scope(comment))
            .filter(|comment| query.visibility.admits(*comment))
            .filter(|comment| {
                query
                    .boundary
                    .is_none_or(|boundary| boundary.admits(&comment.sort_key()))
            })
            .cloned()
            .collect();

        match query.order {
            OrderDirection::Asc => rows.sort_by_key(Record::sort_key),
            OrderDirection::Desc => rows.sort_by_key(|comment| std::cmp::Reverse(comment.sort_key())),
        }
        rows.truncate(query.limit);
        Ok(rows)
    }

    fn get_by_id(&self, id: i64, cancel: &CancelToken) -> Result<Option<Comment>, SourceError> {
        self.simulate_read(cancel)?;
        Ok(self.read().comments.get(&id).cloned())
    }

    fn scope_exists(&self, post_id: i64, cancel: &CancelToken) -> Result<bool, SourceError> {
        self.simulate_read(cancel)?;
        Ok(self.read().posts.contains_key(&post_id))
    }
}
