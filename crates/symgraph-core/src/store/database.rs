//! SQLite-backed cache for a built [`CodeGraph`].
//!
//! A stored graph is only reused when its fingerprint matches the one
//! computed for the current index bytes and build options. Anything else
//! (a missing file, another schema version, a stale fingerprint, a row that
//! does not decode) is reported as [`SymgraphError::Cache`] so the caller
//! can rebuild from the index.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use petgraph::stable_graph::NodeIndex;
use rusqlite::{params, Connection, ErrorCode};
use tracing::{debug, info, warn};

use crate::errors::{SymgraphError, SymgraphResult};
use crate::graph::CodeGraph;
use crate::models::{EdgeLabel, GraphEdge, GraphNode};
use crate::store::schema;
use crate::symbol::Symbol;

const KIND_SYMBOL: &str = "symbol";
const KIND_FILE: &str = "file";

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if text == "~" || text.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            let mut expanded = PathBuf::from(home);
            if text.len() > 2 {
                expanded.push(&text[2..]);
            }
            return expanded;
        }
    }
    path.to_path_buf()
}

#[derive(Debug, Clone)]
pub struct GraphStore {
    db_path: PathBuf,
}

impl GraphStore {
    /// Point a store at `db_path`, creating parent directories as needed.
    /// The database file itself is created on first save.
    pub fn open(db_path: impl AsRef<Path>) -> SymgraphResult<Self> {
        let db_path = expand_tilde(db_path.as_ref());
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn exists(&self) -> bool {
        self.db_path.is_file()
    }

    fn connect(&self) -> SymgraphResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        Ok(conn)
    }

    fn connect_with_schema(&self) -> SymgraphResult<Connection> {
        let conn = self.connect()?;
        schema::init_schema(&conn)?;
        Ok(conn)
    }

    /// Connection for writing. A file that SQLite cannot read as a database
    /// is deleted along with its journal files and created afresh.
    fn connect_for_write(&self) -> SymgraphResult<Connection> {
        match self.connect_with_schema() {
            Err(err) if is_unreadable_database(&err) => {
                warn!(
                    "replacing unreadable graph cache at {}: {err}",
                    self.db_path.display()
                );
                self.remove_files()?;
                self.connect_with_schema()
            }
            other => other,
        }
    }

    fn remove_files(&self) -> SymgraphResult<()> {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.db_path.clone().into_os_string();
            path.push(suffix);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Replace the stored graph with `graph`, tagged with `fingerprint`.
    pub fn save(&self, graph: &CodeGraph, fingerprint: &str) -> SymgraphResult<()> {
        let started = Instant::now();
        let mut conn = self.connect_for_write()?;

        let tx = conn.transaction()?;
        tx.execute_batch("DELETE FROM edges; DELETE FROM nodes;")?;

        let mut ids: HashMap<NodeIndex, i64> = HashMap::with_capacity(graph.node_count());
        {
            let mut insert = tx.prepare(
                "INSERT INTO nodes(id, kind, key, declared) VALUES (?1, ?2, ?3, ?4);",
            )?;
            for (row_id, (idx, node)) in (1_i64..).zip(graph.nodes()) {
                let (kind, key, declared) = match node {
                    GraphNode::Symbol { symbol, declared } => (KIND_SYMBOL, symbol.uri(), *declared),
                    GraphNode::File(path) => (KIND_FILE, path.as_str(), false),
                };
                insert.execute(params![row_id, kind, key, declared])?;
                ids.insert(idx, row_id);
            }
        }
        {
            let mut insert = tx.prepare(
                "INSERT INTO edges(source_id, target_id, label, payload_json) \
                 VALUES (?1, ?2, ?3, ?4);",
            )?;
            for (source, target, edge) in graph.edges() {
                let (Some(source_id), Some(target_id)) = (ids.get(&source), ids.get(&target)) else {
                    return Err(SymgraphError::Invariant(
                        "edge endpoint missing from node table".to_string(),
                    ));
                };
                insert.execute(params![
                    source_id,
                    target_id,
                    edge.label().as_str(),
                    edge.payload_json()?
                ])?;
            }
        }

        schema::set_meta(&tx, schema::META_FINGERPRINT, fingerprint)?;
        schema::set_meta(&tx, schema::META_NODE_COUNT, &graph.node_count().to_string())?;
        schema::set_meta(&tx, schema::META_EDGE_COUNT, &graph.edge_count().to_string())?;
        tx.commit()?;

        info!(
            "saved graph cache to {} ({} nodes, {} edges) in {} ms",
            self.db_path.display(),
            graph.node_count(),
            graph.edge_count(),
            started.elapsed().as_millis()
        );
        Ok(())
    }

    /// Fingerprint of the stored graph, if there is a compatible one.
    pub fn stored_fingerprint(&self) -> SymgraphResult<Option<String>> {
        if !self.exists() {
            return Ok(None);
        }
        let conn = self.connect()?;
        if schema::schema_version(&conn)? != Some(schema::SCHEMA_VERSION) {
            return Ok(None);
        }
        schema::get_meta(&conn, schema::META_FINGERPRINT)
    }

    /// Load the stored graph if it was saved under `expected_fingerprint`.
    pub fn load(&self, expected_fingerprint: &str) -> SymgraphResult<CodeGraph> {
        if !self.exists() {
            return Err(SymgraphError::Cache(format!(
                "no graph cache at {}",
                self.db_path.display()
            )));
        }
        let started = Instant::now();
        let conn = self.connect()?;

        match schema::schema_version(&conn)? {
            Some(schema::SCHEMA_VERSION) => {}
            other => {
                return Err(SymgraphError::Cache(format!(
                    "schema version {other:?} does not match {}",
                    schema::SCHEMA_VERSION
                )))
            }
        }
        match schema::get_meta(&conn, schema::META_FINGERPRINT)? {
            Some(stored) if stored == expected_fingerprint => {}
            Some(_) => return Err(SymgraphError::Cache("fingerprint mismatch".to_string())),
            None => return Err(SymgraphError::Cache("no stored fingerprint".to_string())),
        }

        let mut graph = CodeGraph::new();
        let mut ids: HashMap<i64, NodeIndex> = HashMap::new();
        {
            let mut stmt = conn.prepare("SELECT id, kind, key, declared FROM nodes ORDER BY id;")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            })?;
            for row in rows {
                let (id, kind, key, declared) = row?;
                let idx = match kind.as_str() {
                    KIND_SYMBOL => {
                        let symbol = Symbol::parse(&key).map_err(|err| {
                            SymgraphError::Cache(format!("stored symbol does not parse: {err}"))
                        })?;
                        graph.add_symbol(&symbol, declared)
                    }
                    KIND_FILE => graph.add_file(&key),
                    other => {
                        return Err(SymgraphError::Cache(format!("unknown node kind: {other}")))
                    }
                };
                ids.insert(id, idx);
            }
        }
        {
            let mut stmt = conn.prepare(
                "SELECT source_id, target_id, label, payload_json FROM edges ORDER BY id;",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?;
            for row in rows {
                let (source_id, target_id, label, payload) = row?;
                let (Some(&source), Some(&target)) = (ids.get(&source_id), ids.get(&target_id))
                else {
                    return Err(SymgraphError::Cache(format!(
                        "edge references unknown node ({source_id} -> {target_id})"
                    )));
                };
                let label: EdgeLabel = label.parse()?;
                let edge = GraphEdge::from_stored(label, payload.as_deref())
                    .map_err(|err| SymgraphError::Cache(format!("bad {label} edge payload: {err}")))?;
                graph.add_edge(source, target, edge);
            }
        }

        check_count(&conn, schema::META_NODE_COUNT, graph.node_count())?;
        check_count(&conn, schema::META_EDGE_COUNT, graph.edge_count())?;

        info!(
            "loaded graph cache from {} ({} nodes, {} edges) in {} ms",
            self.db_path.display(),
            graph.node_count(),
            graph.edge_count(),
            started.elapsed().as_millis()
        );
        Ok(graph)
    }
}

fn is_unreadable_database(err: &SymgraphError) -> bool {
    match err {
        SymgraphError::Sqlite(rusqlite::Error::SqliteFailure(failure, _)) => matches!(
            failure.code,
            ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt
        ),
        _ => false,
    }
}

fn check_count(conn: &Connection, key: &str, actual: usize) -> SymgraphResult<()> {
    let stored = schema::get_meta(conn, key)?.and_then(|v| v.parse::<usize>().ok());
    match stored {
        Some(expected) if expected == actual => Ok(()),
        other => {
            debug!("{key}: stored {other:?}, loaded {actual}");
            Err(SymgraphError::Cache(format!(
                "{key} mismatch: stored {other:?}, loaded {actual}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildOptions;
    use crate::indexer::builder::build_graph;
    use crate::testing::*;

    fn built() -> CodeGraph {
        build_graph(&two_document_index(), &BuildOptions::default(), None).unwrap()
    }

    #[test]
    fn test_save_then_load_restores_graph() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path().join("cache/graph.db")).unwrap();
        let graph = built();
        store.save(&graph, "fp-1").unwrap();

        let loaded = store.load("fp-1").unwrap();
        assert_eq!(loaded.node_count(), graph.node_count());
        assert_eq!(loaded.edge_count(), graph.edge_count());
        for label in EdgeLabel::ALL {
            assert_eq!(loaded.edge_count_by_label(label), graph.edge_count_by_label(label));
        }
        assert_eq!(loaded.containing_files(&sym(FOO_BAR)), vec!["pkg/b.py"]);

        let mut declared: Vec<&str> = loaded.declared_symbols().map(|s| s.uri()).collect();
        declared.sort();
        let mut expected: Vec<&str> = graph.declared_symbols().map(|s| s.uri()).collect();
        expected.sort();
        assert_eq!(declared, expected);
    }

    #[test]
    fn test_fingerprint_mismatch_is_cache_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path().join("graph.db")).unwrap();
        store.save(&built(), "fp-1").unwrap();
        assert_eq!(store.stored_fingerprint().unwrap().as_deref(), Some("fp-1"));
        let err = store.load("fp-2").unwrap_err();
        assert!(matches!(err, SymgraphError::Cache(_)));
    }

    #[test]
    fn test_missing_file_is_cache_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path().join("absent.db")).unwrap();
        assert!(!store.exists());
        assert_eq!(store.stored_fingerprint().unwrap(), None);
        assert!(matches!(store.load("fp").unwrap_err(), SymgraphError::Cache(_)));
    }

    #[test]
    fn test_save_overwrites_previous_graph() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path().join("graph.db")).unwrap();
        store.save(&built(), "fp-1").unwrap();

        let mut small = CodeGraph::new();
        small.add_file("only.py");
        store.save(&small, "fp-2").unwrap();

        let loaded = store.load("fp-2").unwrap();
        assert_eq!(loaded.node_count(), 1);
        assert_eq!(loaded.edge_count(), 0);
    }

    #[test]
    fn test_corrupt_rows_are_cache_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path().join("graph.db")).unwrap();
        store.save(&built(), "fp-1").unwrap();

        let conn = store.connect().unwrap();
        conn.execute("UPDATE edges SET label = 'bogus' WHERE id = 1;", [])
            .unwrap();
        assert!(matches!(store.load("fp-1").unwrap_err(), SymgraphError::Cache(_)));
    }

    #[test]
    fn test_save_replaces_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        std::fs::write(&path, b"not a database").unwrap();
        let store = GraphStore::open(&path).unwrap();
        assert!(store.load("fp-1").is_err());

        store.save(&built(), "fp-1").unwrap();
        assert_eq!(store.load("fp-1").unwrap().node_count(), built().node_count());
    }

    #[test]
    fn test_count_mismatch_is_cache_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path().join("graph.db")).unwrap();
        store.save(&built(), "fp-1").unwrap();

        let conn = store.connect().unwrap();
        conn.execute("DELETE FROM edges WHERE id = 1;", []).unwrap();
        assert!(matches!(store.load("fp-1").unwrap_err(), SymgraphError::Cache(_)));
    }
}
