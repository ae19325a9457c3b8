//! Caller/callee edges from method scopes.
//!
//! For every declared method, each reference inside the method's source span
//! that targets a class or another method produces a `caller` edge
//! (referenced -> method) and a `callee` edge (method -> referenced). Any
//! reference counts, not only call expressions, so the result is a superset
//! of the real call graph: returning a class or passing a method as a value
//! also yields an edge.

use indexmap::IndexSet;
use tracing::{debug, info};

use crate::errors::SymgraphResult;
use crate::graph::CodeGraph;
use crate::loader::ModuleLoader;
use crate::models::{CallSite, GraphEdge};
use crate::query::scope;
use crate::symbol::{Symbol, SymbolKind, SymbolReference};

/// A caller/callee pair found in one method's scope.
#[derive(Debug, Clone)]
pub struct CallEdge {
    /// The method whose scope contains the reference.
    pub caller: Symbol,
    pub reference: SymbolReference,
}

fn is_call_target(kind: SymbolKind) -> bool {
    matches!(kind, SymbolKind::Method | SymbolKind::Class)
}

/// Call edges originating in `method`'s scope.
pub fn call_edges_for(
    graph: &CodeGraph,
    loader: &ModuleLoader,
    method: &Symbol,
) -> SymgraphResult<Vec<CallEdge>> {
    let references = scope::references_in_scope(graph, loader, method, None)?;
    Ok(references
        .into_iter()
        .filter(|r| is_call_target(r.symbol.kind()) && &r.symbol != method)
        .map(|reference| CallEdge {
            caller: method.clone(),
            reference,
        })
        .collect())
}

/// Add caller/callee edge pairs for every method in `methods`.
///
/// Methods whose scope cannot be resolved are skipped. Returns the number
/// of edges added (two per pair).
pub fn add_call_edges(
    graph: &mut CodeGraph,
    loader: &ModuleLoader,
    methods: &IndexSet<Symbol>,
) -> SymgraphResult<usize> {
    let mut pending = Vec::new();
    let mut skipped = 0usize;
    for method in methods {
        match call_edges_for(graph, loader, method) {
            Ok(edges) => pending.extend(edges),
            Err(err) if err.is_recoverable() => {
                debug!("no call edges for {method}: {err}");
                skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    for edge in &pending {
        let caller = graph.add_symbol(&edge.caller, false);
        let callee = graph.add_symbol(&edge.reference.symbol, false);
        let site = CallSite::from_reference(&edge.reference);
        graph.add_edge(callee, caller, GraphEdge::Caller(site));
        graph.add_edge(caller, callee, GraphEdge::Callee(site));
    }

    info!(
        "added {} caller/callee pairs from {} methods ({} unresolved)",
        pending.len(),
        methods.len(),
        skipped
    );
    Ok(pending.len() * 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildOptions;
    use crate::indexer::builder::{build_graph, GraphBuilder};
    use crate::models::EdgeLabel;
    use crate::testing::*;

    fn options() -> BuildOptions {
        BuildOptions {
            build_caller_relationships: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_call_edges_for_method_scope() {
        let dir = service_tree();
        let loader = service_loader(dir.path());
        let graph = build_graph(&service_index(), &BuildOptions::default(), None).unwrap();

        let edges = call_edges_for(&graph, &loader, &sym(SERVICE_RUN)).unwrap();
        let targets: Vec<&str> = edges.iter().map(|e| e.reference.symbol.uri()).collect();
        // The local `helper` and the method's own definition are excluded.
        assert_eq!(targets, vec![HELPER, HELPER_GO]);
        assert!(edges.iter().all(|e| e.caller == sym(SERVICE_RUN)));
    }

    #[test]
    fn test_build_adds_paired_edges() {
        let dir = service_tree();
        let loader = service_loader(dir.path());
        let (graph, stats) = GraphBuilder::new(options())
            .with_loader(&loader)
            .build(&service_index())
            .unwrap();

        // run -> {Helper, go}, main -> {Service, run}; go has no targets.
        assert_eq!(graph.edge_count_by_label(EdgeLabel::Caller), 4);
        assert_eq!(graph.edge_count_by_label(EdgeLabel::Callee), 4);
        assert_eq!(stats.call_edges, 8);

        let main = graph.symbol_index(MAIN).unwrap();
        let callees: Vec<&str> = graph
            .outgoing(main, EdgeLabel::Callee)
            .filter_map(|(_, target, _)| graph.node(target)?.as_symbol().map(|s| s.uri()))
            .collect();
        assert_eq!(callees.len(), 2);
        assert!(callees.contains(&SERVICE));
        assert!(callees.contains(&SERVICE_RUN));
    }

    #[test]
    fn test_unresolvable_methods_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        // The module exists but no longer defines `Helper.go`.
        write_source(dir.path(), "pkg/svc.py", "class Service:\n    pass\n");
        let loader = service_loader(dir.path());
        let graph = build_graph(&service_index(), &options(), Some(&loader)).unwrap();
        assert_eq!(graph.edge_count_by_label(EdgeLabel::Caller), 0);
    }
}
