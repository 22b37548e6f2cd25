//! SQLite schema for quill.
//!
//! Timestamps are stored as integer microseconds since the Unix epoch
//! (`*_at_us`). The pagination tuple `(created_at_us, comment_id)` is covered
//! by one index per scope so both the per-post and the feed range reads are
//! index scans.

/// Migration v1: posts, comments, per-post pagination index and store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS posts (
    post_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    is_published INTEGER NOT NULL DEFAULT 0 CHECK (is_published IN (0, 1)),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL REFERENCES posts(post_id) ON DELETE CASCADE,
    author TEXT NOT NULL,
    body TEXT NOT NULL,
    is_deleted INTEGER NOT NULL DEFAULT 0 CHECK (is_deleted IN (0, 1)),
    deleted_at_us INTEGER,
    created_at_us INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_post_created
    ON comments(post_id, created_at_us, comment_id);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
";

/// Migration v2: feed index and published-post lookup.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_comments_created
    ON comments(created_at_us, comment_id);

CREATE INDEX IF NOT EXISTS idx_posts_published
    ON posts(is_published, post_id);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by the pagination query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_comments_post_created",
    "idx_comments_created",
    "idx_posts_published",
];

#[cfg(test)]
mod tests {
    use crate::db::migrations;
    use rusqlite::{Connection, params};

    fn seeded_conn() -> rusqlite::Result<Connection> {
        let mut conn = Connection::open_in_memory()?;
        migrations::migrate(&mut conn)?;

        for post_id in 1..=4_i64 {
            conn.execute(
                "INSERT INTO posts (post_id, title, is_published, created_at_us)
                 VALUES (?1, ?2, ?3, 0)",
                params![post_id, format!("Post {post_id}"), post_id % 2],
            )?;
        }

        for idx in 0..64_i64 {
            conn.execute(
                "INSERT INTO comments (post_id, author, body, created_at_us)
                 VALUES (?1, 'ann', ?2, ?3)",
                params![idx % 4 + 1, format!("comment {idx}"), idx / 3],
            )?;
        }

        Ok(conn)
    }

    fn query_plan_details(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}"))?;
        stmt.query_map([], |row| row.get::<_, String>(3))?
            .collect::<Result<Vec<_>, _>>()
    }

    #[test]
    fn query_plan_uses_post_pagination_index() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let details = query_plan_details(
            &conn,
            "SELECT comment_id
             FROM comments
             WHERE post_id = 2
             ORDER BY created_at_us, comment_id
             LIMIT 21",
        )?;

        assert!(
            details
                .iter()
                .any(|detail| detail.contains("idx_comments_post_created")),
            "expected post pagination index in plan, got: {details:?}"
        );

        Ok(())
    }

    #[test]
    fn comments_require_an_existing_post() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let result = conn.execute(
            "INSERT INTO comments (post_id, author, body, created_at_us)
             VALUES (999, 'ann', 'orphan', 1)",
            [],
        );
        assert!(result.is_err(), "orphan comment should violate the foreign key");
        Ok(())
    }

    #[test]
    fn blank_titles_are_rejected() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let result = conn.execute(
            "INSERT INTO posts (post_id, title, created_at_us) VALUES (50, '   ', 0)",
            [],
        );
        assert!(result.is_err());
        Ok(())
    }
}
