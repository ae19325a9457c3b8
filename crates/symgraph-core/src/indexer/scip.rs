//! SCIP index loading and cache fingerprints.

use std::path::Path;

use protobuf::Message;
use scip::types::{Index, Occurrence};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::config::BuildOptions;
use crate::errors::SymgraphResult;

/// Bumped whenever the graph layout produced by the builder changes, so
/// caches written by an older builder are treated as stale.
pub const GRAPH_FORMAT_VERSION: u32 = 1;

/// Raw bytes of an index file, kept for fingerprinting.
pub fn read_index_bytes(path: &Path) -> SymgraphResult<Vec<u8>> {
    let bytes = std::fs::read(path)?;
    info!("read SCIP index {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

pub fn decode_index(bytes: &[u8]) -> SymgraphResult<Index> {
    let index = Index::parse_from_bytes(bytes)?;
    info!("decoded SCIP index with {} documents", index.documents.len());
    Ok(index)
}

pub fn load_index(path: &Path) -> SymgraphResult<Index> {
    decode_index(&read_index_bytes(path)?)
}

pub fn encode_index(index: &Index) -> SymgraphResult<Vec<u8>> {
    Ok(index.write_to_bytes()?)
}

/// SHA-256 over the index bytes and every option that shapes the graph.
pub fn graph_fingerprint(index_bytes: &[u8], options: &BuildOptions) -> String {
    let mut hasher = Sha256::new();
    hasher.update(GRAPH_FORMAT_VERSION.to_le_bytes());
    hasher.update([
        options.build_references as u8,
        options.build_relationships as u8,
        options.build_caller_relationships as u8,
    ]);
    hasher.update(index_bytes);
    format!("{:x}", hasher.finalize())
}

/// Start line and column of an occurrence.
///
/// SCIP ranges are `[start_line, start_col, end_line, end_col]` or, for
/// single-line spans, `[start_line, start_col, end_col]`. Anything shorter
/// or negative is malformed.
pub fn occurrence_start(occurrence: &Occurrence) -> Option<(u32, u32)> {
    if occurrence.range.len() < 3 {
        return None;
    }
    let line = u32::try_from(occurrence.range[0]).ok()?;
    let column = u32::try_from(occurrence.range[1]).ok()?;
    Some((line, column))
}
