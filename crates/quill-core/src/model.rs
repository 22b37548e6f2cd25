use crate::page::SortKey;
use crate::source::Record;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A blog post. Comments are scoped to one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub post_id: i64,
    pub title: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// A comment on a post: the record the engine paginates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub comment_id: i64,
    pub post_id: i64,
    pub author: String,
    pub body: String,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Record for Comment {
    fn sort_key(&self) -> SortKey {
        SortKey::new(self.created_at, self.comment_id)
    }

    fn scope_id(&self) -> i64 {
        self.post_id
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }
}
