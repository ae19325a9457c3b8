//! Scope-bounded reference queries: which references fall inside a symbol's
//! definition span.

use crate::errors::{SymgraphError, SymgraphResult};
use crate::graph::CodeGraph;
use crate::loader::ModuleLoader;
use crate::models::{BoundingBox, EdgeLabel, GraphEdge};
use crate::symbol::{Symbol, SymbolReference};

/// The single file with a `contains` edge into `symbol`.
///
/// Zero or several containing files is a graph invariant violation and is
/// never recoverable.
pub fn containing_file<'g>(graph: &'g CodeGraph, symbol: &Symbol) -> SymgraphResult<&'g str> {
    let files = graph.containing_files(symbol);
    match files.as_slice() {
        [file] => Ok(*file),
        [] => Err(SymgraphError::Invariant(format!(
            "{symbol} has no containing file"
        ))),
        many => Err(SymgraphError::Invariant(format!(
            "{symbol} is contained by {} files: {}",
            many.len(),
            many.join(", ")
        ))),
    }
}

/// Every reference recorded against `path`, ordered by position then URI.
pub fn references_in_file(graph: &CodeGraph, path: &str) -> Vec<SymbolReference> {
    let Some(file) = graph.file_index(path) else {
        return Vec::new();
    };
    let mut references: Vec<SymbolReference> = graph
        .incoming(file, EdgeLabel::Reference)
        .filter_map(|(_, _, edge)| match edge {
            GraphEdge::Reference(reference) => Some(reference.clone()),
            _ => None,
        })
        .collect();
    references.sort_by(|a, b| {
        (a.line_number, a.column_number, a.symbol.uri()).cmp(&(
            b.line_number,
            b.column_number,
            b.symbol.uri(),
        ))
    });
    references
}

/// References whose start position lies within `bbox`.
pub fn filter_in_box(references: Vec<SymbolReference>, bbox: &BoundingBox) -> Vec<SymbolReference> {
    references
        .into_iter()
        .filter(|r| bbox.contains(r.line_number, r.column_number))
        .collect()
}

/// References inside the textual scope of `symbol`.
///
/// Uses `cached` when given, otherwise resolves the bounding box through
/// `loader`. Resolution failures are recoverable; a broken containment
/// invariant is not.
pub fn references_in_scope(
    graph: &CodeGraph,
    loader: &ModuleLoader,
    symbol: &Symbol,
    cached: Option<&BoundingBox>,
) -> SymgraphResult<Vec<SymbolReference>> {
    let bbox = match cached {
        Some(bbox) => *bbox,
        None => loader.bounding_box(symbol)?,
    };
    let file = containing_file(graph, symbol)?;
    Ok(filter_in_box(references_in_file(graph, file), &bbox))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildOptions;
    use crate::indexer::builder::build_graph;
    use crate::symbol::SymbolRoles;
    use crate::testing::*;

    #[test]
    fn test_references_outside_box_are_excluded() {
        let target = "scip-python python pkg 1.0 `pkg.a`/Target#";
        let inside = "scip-python python pkg 1.0 `pkg.a`/Inside#";
        let outside = "scip-python python pkg 1.0 `pkg.a`/Outside#";
        let fixture = index(vec![document(
            "pkg/a.py",
            vec![information(target), information(inside), information(outside)],
            vec![
                definition(target, 10, 6),
                read(inside, 15, 8),
                read(outside, 25, 0),
            ],
        )]);
        let graph = build_graph(&fixture, &BuildOptions::default(), None).unwrap();
        let bbox = BoundingBox {
            start_line: 10,
            start_column: 0,
            end_line: 20,
            end_column: 0,
        };
        let loader = ModuleLoader::new();
        let refs = references_in_scope(&graph, &loader, &sym(target), Some(&bbox)).unwrap();
        let uris: Vec<&str> = refs.iter().map(|r| r.symbol.uri()).collect();
        assert_eq!(uris, vec![target, inside]);
    }

    #[test]
    fn test_references_in_file_are_ordered() {
        let graph = build_graph(&service_index(), &BuildOptions::default(), None).unwrap();
        let refs = references_in_file(&graph, "pkg/svc.py");
        assert_eq!(refs.len(), 11);
        let positions: Vec<(u32, u32)> = refs.iter().map(|r| (r.line_number, r.column_number)).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
        assert!(refs[0].roles.contains(SymbolRoles::DEFINITION));
        assert!(references_in_file(&graph, "missing.py").is_empty());
    }

    #[test]
    fn test_containing_file_invariant() {
        let mut graph = build_graph(&two_document_index(), &BuildOptions::default(), None).unwrap();
        assert_eq!(containing_file(&graph, &sym(FOO_BAR)).unwrap(), "pkg/b.py");

        let a = graph.file_index("pkg/a.py").unwrap();
        let bar = graph.symbol_index(FOO_BAR).unwrap();
        graph.add_edge(a, bar, GraphEdge::Contains);
        let err = containing_file(&graph, &sym(FOO_BAR)).unwrap_err();
        assert!(matches!(err, SymgraphError::Invariant(_)));
        assert!(!err.is_recoverable());

        let stray = sym("scip-python python pkg 1.0 `pkg.a`/Stray#");
        assert!(matches!(
            containing_file(&graph, &stray),
            Err(SymgraphError::Invariant(_))
        ));
    }

    #[test]
    fn test_scope_resolves_through_loader() {
        let dir = service_tree();
        let loader = service_loader(dir.path());
        let graph = build_graph(&service_index(), &BuildOptions::default(), None).unwrap();
        let refs = references_in_scope(&graph, &loader, &sym(SERVICE_RUN), None).unwrap();
        let uris: Vec<&str> = refs.iter().map(|r| r.symbol.uri()).collect();
        assert_eq!(
            uris,
            vec![SERVICE_RUN, LOCAL_HELPER, HELPER, LOCAL_HELPER, HELPER_GO]
        );
    }
}
