//! Typed query helpers over the quill schema.
//!
//! Timestamps cross this boundary as [`DateTime<Utc>`] and are stored as
//! microseconds, so anything finer than a microsecond is truncated on write.

use crate::model::{Comment, Post};
use crate::page::{Filter, Scope};
use crate::source::{Boundary, OrderDirection, RangeQuery};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

const COMMENT_COLUMNS: &str = "c.comment_id, c.post_id, c.author, c.body, \
                               c.is_deleted, c.deleted_at_us, c.created_at_us";

/// Microseconds since the Unix epoch.
#[must_use]
pub fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn from_micros(column: usize, micros: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, micros))
}

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    let deleted_at_us: Option<i64> = row.get(5)?;
    Ok(Comment {
        comment_id: row.get(0)?,
        post_id: row.get(1)?,
        author: row.get(2)?,
        body: row.get(3)?,
        is_deleted: row.get(4)?,
        deleted_at: deleted_at_us.map(|us| from_micros(5, us)).transpose()?,
        created_at: from_micros(6, row.get(6)?)?,
    })
}

fn row_to_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        post_id: row.get(0)?,
        title: row.get(1)?,
        is_published: row.get(2)?,
        created_at: from_micros(3, row.get(3)?)?,
    })
}

/// Insert a post and return it with its assigned id.
///
/// # Errors
///
/// Returns an error if the insert fails (e.g. a blank title).
pub fn insert_post(
    conn: &Connection,
    title: &str,
    is_published: bool,
    created_at: DateTime<Utc>,
) -> Result<Post> {
    conn.execute(
        "INSERT INTO posts (title, is_published, created_at_us) VALUES (?1, ?2, ?3)",
        params![title, is_published, to_micros(created_at)],
    )
    .with_context(|| format!("insert post '{title}'"))?;

    let post_id = conn.last_insert_rowid();
    get_post(conn, post_id)?.with_context(|| format!("post {post_id} vanished after insert"))
}

/// Set a post's published flag. Returns false when the post does not exist.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn set_post_published(conn: &Connection, post_id: i64, is_published: bool) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE posts SET is_published = ?2 WHERE post_id = ?1",
            params![post_id, is_published],
        )
        .with_context(|| format!("set published flag on post {post_id}"))?;
    Ok(changed > 0)
}

/// Fetch a post by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_post(conn: &Connection, post_id: i64) -> Result<Option<Post>> {
    conn.query_row(
        "SELECT post_id, title, is_published, created_at_us FROM posts WHERE post_id = ?1",
        params![post_id],
        row_to_post,
    )
    .optional()
    .with_context(|| format!("get_post for {post_id}"))
}

/// All posts, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_posts(conn: &Connection) -> Result<Vec<Post>> {
    let mut stmt = conn
        .prepare(
            "SELECT post_id, title, is_published, created_at_us \
             FROM posts ORDER BY created_at_us, post_id",
        )
        .context("prepare list_posts")?;
    let rows = stmt
        .query_map([], row_to_post)
        .context("execute list_posts")?;

    let mut posts = Vec::new();
    for row in rows {
        posts.push(row.context("read post row")?);
    }
    Ok(posts)
}

/// Whether a post with `post_id` exists.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn post_exists(conn: &Connection, post_id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE post_id = ?1)",
        params![post_id],
        |row| row.get(0),
    )
    .with_context(|| format!("post_exists for {post_id}"))
}

/// Append a live comment to `post_id` and return it with its assigned id.
///
/// # Errors
///
/// Returns an error if the insert fails, including when the post does not
/// exist.
pub fn insert_comment(
    conn: &Connection,
    post_id: i64,
    author: &str,
    body: &str,
    created_at: DateTime<Utc>,
) -> Result<Comment> {
    conn.execute(
        "INSERT INTO comments (post_id, author, body, created_at_us) VALUES (?1, ?2, ?3, ?4)",
        params![post_id, author, body, to_micros(created_at)],
    )
    .with_context(|| format!("insert comment on post {post_id}"))?;

    let comment_id = conn.last_insert_rowid();
    get_comment(conn, comment_id)?
        .with_context(|| format!("comment {comment_id} vanished after insert"))
}

/// Soft-delete a comment. The first deletion time is kept on repeat calls.
/// Returns false when the comment does not exist.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn soft_delete_comment(conn: &Connection, comment_id: i64, at: DateTime<Utc>) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE comments \
             SET is_deleted = 1, deleted_at_us = COALESCE(deleted_at_us, ?2) \
             WHERE comment_id = ?1",
            params![comment_id, to_micros(at)],
        )
        .with_context(|| format!("soft-delete comment {comment_id}"))?;
    Ok(changed > 0)
}

/// Fetch a comment by id, deleted or not.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_comment(conn: &Connection, comment_id: i64) -> Result<Option<Comment>> {
    let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.comment_id = ?1");
    conn.query_row(&sql, params![comment_id], row_to_comment)
        .optional()
        .with_context(|| format!("get_comment for {comment_id}"))
}

/// Run a keyset range read.
///
/// The boundary compares the `(created_at_us, comment_id)` tuple strictly,
/// spelled out as `a > x OR (a = x AND b > y)` so the composite index can
/// serve it. A boundary finer than a microsecond can never tie a stored row,
/// so it compares the timestamp alone against the enclosing microsecond.
/// The feed scope joins published posts.
///
/// # Errors
///
/// Returns an error if the query fails or a stored timestamp is out of
/// range.
pub fn query_comments(conn: &Connection, query: &RangeQuery) -> Result<Vec<Comment>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn ToSql>> = Vec::new();
    let mut joins = String::new();

    match query.scope {
        Scope::Post(post_id) => {
            param_values.push(Box::new(post_id));
            conditions.push(format!("c.post_id = ?{}", param_values.len()));
        }
        Scope::Feed => {
            joins.push_str(" INNER JOIN posts p ON p.post_id = c.post_id AND p.is_published = 1");
        }
    }

    if let Filter::Equals(is_deleted) = query.visibility.deleted {
        param_values.push(Box::new(is_deleted));
        conditions.push(format!("c.is_deleted = ?{}", param_values.len()));
    }

    if let Some(boundary) = query.boundary {
        let (op, key) = match boundary {
            Boundary::After(key) => (">", key),
            Boundary::Before(key) => ("<", key),
        };
        let micros = to_micros(key.created_at);
        if key.created_at.timestamp_subsec_nanos() % 1_000 == 0 {
            param_values.push(Box::new(micros));
            let ts = param_values.len();
            param_values.push(Box::new(key.id));
            let id = param_values.len();
            conditions.push(format!(
                "(c.created_at_us {op} ?{ts} OR (c.created_at_us = ?{ts} AND c.comment_id {op} ?{id}))"
            ));
        } else {
            // micros is the floor: after it means past it, before it means up to it.
            let bound = match boundary {
                Boundary::After(_) => micros,
                Boundary::Before(_) => micros + 1,
            };
            param_values.push(Box::new(bound));
            conditions.push(format!("c.created_at_us {op} ?{}", param_values.len()));
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let order = match query.order {
        OrderDirection::Asc => "ASC",
        OrderDirection::Desc => "DESC",
    };

    let sql = format!(
        "SELECT {COMMENT_COLUMNS} FROM comments c{joins}{where_clause} \
         ORDER BY c.created_at_us {order}, c.comment_id {order} LIMIT {}",
        query.limit
    );

    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("prepare query_comments: {sql}"))?;

    let params_ref: Vec<&dyn ToSql> = param_values.iter().map(AsRef::as_ref).collect();

    let rows = stmt
        .query_map(params_from_iter(params_ref), row_to_comment)
        .context("execute query_comments")?;

    let mut comments = Vec::new();
    for row in rows {
        comments.push(row.context("read comment row")?);
    }
    Ok(comments)
}
