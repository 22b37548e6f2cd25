//! SQLite schema migrations.

use super::schema;
use rusqlite::{Connection, types::Type};

/// One forward-only schema step, applied when `user_version < version`.
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "posts and comments",
        sql: schema::MIGRATION_V1_SQL,
    },
    Migration {
        version: 2,
        name: "feed indexes",
        sql: schema::MIGRATION_V2_SQL,
    },
];

/// Schema version a fully migrated database reports.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

/// `PRAGMA user_version` of `conn`.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read or is negative.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let raw: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(err)))
}

/// Bring `conn` up to [`LATEST_SCHEMA_VERSION`] and return the resulting
/// version. Each pending step commits on its own, so a failure leaves the
/// database at the last completed version.
///
/// # Errors
///
/// Returns an error if a step fails to apply.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let start = current_schema_version(conn)?;

    let pending = MIGRATIONS.iter().filter(|m| m.version > start);
    let mut reached = start;
    for step in pending {
        let version = i64::from(step.version);
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.execute(
            "UPDATE store_meta SET schema_version = ?1 WHERE id = 1",
            [version],
        )?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;

        tracing::debug!(version = step.version, name = step.name, "applied schema migration");
        reached = step.version;
    }

    if reached != start {
        tracing::info!(from = start, to = reached, "store schema migrated");
    }
    Ok(reached)
}

#[cfg(test)]
mod tests {
    use super::{LATEST_SCHEMA_VERSION, current_schema_version, migrate};
    use crate::db::schema;
    use rusqlite::{Connection, params};

    fn has(conn: &Connection, kind: &str, name: &str) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = ?1 AND name = ?2",
            params![kind, name],
            |row| row.get(0),
        )
    }

    #[test]
    fn fresh_database_reaches_latest() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        assert_eq!(current_schema_version(&conn)?, 0);

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        assert_eq!(current_schema_version(&conn)?, LATEST_SCHEMA_VERSION);

        for table in ["posts", "comments", "store_meta"] {
            assert!(has(&conn, "table", table)?, "missing {table}");
        }

        for index in schema::REQUIRED_INDEXES {
            assert!(has(&conn, "index", index)?, "missing index {index}");
        }

        Ok(())
    }

    #[test]
    fn second_run_is_a_no_op() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;
        for _ in 0..2 {
            assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        }

        let meta_rows: i64 =
            conn.query_row("SELECT COUNT(*) FROM store_meta", [], |row| row.get(0))?;
        assert_eq!(meta_rows, 1);

        let recorded: u32 = conn.query_row(
            "SELECT schema_version FROM store_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(recorded, LATEST_SCHEMA_VERSION);

        Ok(())
    }

    #[test]
    fn migrate_upgrades_from_v1_and_keeps_rows() -> rusqlite::Result<()> {
        let mut conn = Connection::open_in_memory()?;

        conn.execute_batch(schema::MIGRATION_V1_SQL)?;
        conn.pragma_update(None, "user_version", 1)?;
        conn.execute(
            "INSERT INTO posts (post_id, title, is_published, created_at_us)
             VALUES (1, 'Hello', 1, 10)",
            [],
        )?;
        conn.execute(
            "INSERT INTO comments (post_id, author, body, created_at_us)
             VALUES (1, 'ann', 'first', 11)",
            [],
        )?;

        assert!(!has(&conn, "index", "idx_comments_created")?);

        assert_eq!(migrate(&mut conn)?, LATEST_SCHEMA_VERSION);
        assert!(has(&conn, "index", "idx_comments_created")?);

        let comments: i64 =
            conn.query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))?;
        assert_eq!(comments, 1);

        Ok(())
    }
}
