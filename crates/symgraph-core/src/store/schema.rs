//! SQLite schema for the persisted graph cache.
//!
//! The cache is disposable: a database reporting any other schema version
//! is wiped and recreated rather than migrated.

use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::SymgraphResult;

pub const SCHEMA_VERSION: i32 = 1;

pub const META_SCHEMA_VERSION: &str = "schema_version";
pub const META_FINGERPRINT: &str = "fingerprint";
pub const META_NODE_COUNT: &str = "node_count";
pub const META_EDGE_COUNT: &str = "edge_count";

/// Executed with `IF NOT EXISTS`, safe to replay.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS graph_meta (
        key TEXT PRIMARY KEY,
        value TEXT
    );",
    "CREATE TABLE IF NOT EXISTS nodes (
        id INTEGER PRIMARY KEY,
        kind TEXT NOT NULL CHECK (kind IN ('symbol', 'file')),
        key TEXT NOT NULL,
        declared INTEGER NOT NULL DEFAULT 0,
        UNIQUE(kind, key)
    );",
    "CREATE TABLE IF NOT EXISTS edges (
        id INTEGER PRIMARY KEY,
        source_id INTEGER NOT NULL REFERENCES nodes(id),
        target_id INTEGER NOT NULL REFERENCES nodes(id),
        label TEXT NOT NULL,
        payload_json TEXT
    );",
    "CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id, label);",
    "CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id, label);",
];

const DROP_STATEMENTS: &[&str] = &[
    "DROP TABLE IF EXISTS edges;",
    "DROP TABLE IF EXISTS nodes;",
    "DROP TABLE IF EXISTS graph_meta;",
];

/// Create the schema, recreating it when an incompatible version is found.
pub fn init_schema(conn: &Connection) -> SymgraphResult<()> {
    if let Some(version) = schema_version(conn)? {
        if version != SCHEMA_VERSION {
            for stmt in DROP_STATEMENTS {
                conn.execute_batch(stmt)?;
            }
        }
    }
    for stmt in SCHEMA_STATEMENTS {
        conn.execute_batch(stmt)?;
    }
    set_meta(conn, META_SCHEMA_VERSION, &SCHEMA_VERSION.to_string())?;
    Ok(())
}

/// Stored schema version; `None` for a database without the meta table or
/// key.
pub fn schema_version(conn: &Connection) -> SymgraphResult<Option<i32>> {
    let has_meta: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'graph_meta');",
        [],
        |row| row.get(0),
    )?;
    if !has_meta {
        return Ok(None);
    }
    Ok(get_meta(conn, META_SCHEMA_VERSION)?.and_then(|v| v.parse::<i32>().ok()))
}

pub fn get_meta(conn: &Connection, key: &str) -> SymgraphResult<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM graph_meta WHERE key = ?1;",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set_meta(conn: &Connection, key: &str, value: &str) -> SymgraphResult<()> {
    conn.execute(
        "INSERT INTO graph_meta(key, value) VALUES(?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), None);
        init_schema(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
                 AND name IN ('graph_meta', 'nodes', 'edges');",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn test_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO nodes(id, kind, key, declared) VALUES (1, 'file', 'a.py', 0);",
            [],
        )
        .unwrap();
        init_schema(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM nodes;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_version_mismatch_recreates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO nodes(id, kind, key, declared) VALUES (1, 'file', 'a.py', 0);",
            [],
        )
        .unwrap();
        set_meta(&conn, META_SCHEMA_VERSION, "0").unwrap();

        init_schema(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM nodes;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_meta_upsert() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        set_meta(&conn, META_FINGERPRINT, "abc").unwrap();
        set_meta(&conn, META_FINGERPRINT, "def").unwrap();
        assert_eq!(get_meta(&conn, META_FINGERPRINT).unwrap().as_deref(), Some("def"));
        assert_eq!(get_meta(&conn, "missing").unwrap(), None);
    }
}
