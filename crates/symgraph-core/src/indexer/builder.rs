//! Builds a [`CodeGraph`] from a decoded SCIP index.
//!
//! Documents are processed in index order, each through the vertex,
//! relationship and reference passes. The optional caller/callee pass runs
//! once every document is in the graph, since it needs final containment.

use std::collections::HashMap;
use std::time::Instant;

use indexmap::IndexSet;
use scip::types::{Document, Index};
use tracing::{debug, info};

use crate::config::BuildOptions;
use crate::errors::{SymgraphError, SymgraphResult};
use crate::graph::CodeGraph;
use crate::indexer::callgraph;
use crate::indexer::scip::occurrence_start;
use crate::loader::ModuleLoader;
use crate::models::{GraphEdge, RelationshipMeta};
use crate::symbol::{Symbol, SymbolKind, SymbolReference, SymbolRoles};

/// Counters reported after a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub documents: usize,
    pub declared_symbols: usize,
    pub skipped_symbols: usize,
    pub skipped_occurrences: usize,
    pub relationship_edges: usize,
    pub reference_edges: usize,
    pub containment_corrections: usize,
    pub call_edges: usize,
    pub elapsed_ms: u128,
}

pub struct GraphBuilder<'a> {
    options: BuildOptions,
    loader: Option<&'a ModuleLoader>,
    graph: CodeGraph,
    parsed: HashMap<String, Option<Symbol>>,
    /// Declared methods in declaration order, for the call pass.
    methods: IndexSet<Symbol>,
    stats: BuildStats,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            loader: None,
            graph: CodeGraph::new(),
            parsed: HashMap::new(),
            methods: IndexSet::new(),
            stats: BuildStats::default(),
        }
    }

    /// Loader used by the caller/callee pass to resolve method scopes.
    pub fn with_loader(mut self, loader: &'a ModuleLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn build(mut self, index: &Index) -> SymgraphResult<(CodeGraph, BuildStats)> {
        let started = Instant::now();
        let loader = if self.options.build_caller_relationships {
            match self.loader {
                Some(loader) if loader.is_initialized() => Some(loader),
                _ => {
                    return Err(SymgraphError::NotInitialized(
                        "caller relationships require an initialized module loader".into(),
                    ))
                }
            }
        } else {
            None
        };

        for document in &index.documents {
            self.process_document(document);
        }
        if let Some(loader) = loader {
            let added = callgraph::add_call_edges(&mut self.graph, loader, &self.methods)?;
            self.stats.call_edges = added;
        }

        self.stats.elapsed_ms = started.elapsed().as_millis();
        info!(
            "built symbol graph: {} documents, {} declared symbols, {} nodes, {} edges in {} ms",
            self.stats.documents,
            self.stats.declared_symbols,
            self.graph.node_count(),
            self.graph.edge_count(),
            self.stats.elapsed_ms
        );
        if self.stats.skipped_symbols + self.stats.skipped_occurrences > 0 {
            info!(
                "skipped {} malformed symbols and {} malformed occurrences",
                self.stats.skipped_symbols, self.stats.skipped_occurrences
            );
        }
        Ok((self.graph, self.stats))
    }

    fn process_document(&mut self, document: &Document) {
        self.stats.documents += 1;
        self.add_vertices(document);
        if self.options.build_relationships {
            self.add_relationships(document);
        }
        if self.options.build_references {
            self.add_references(document);
        }
    }

    /// Parse a URI once; failures are logged on first sight and remembered.
    fn resolve(&mut self, uri: &str) -> Option<Symbol> {
        if let Some(cached) = self.parsed.get(uri) {
            return cached.clone();
        }
        let parsed = match Symbol::parse(uri) {
            Ok(symbol) => Some(symbol),
            Err(err) => {
                debug!("skipping unparseable symbol: {err}");
                None
            }
        };
        self.parsed.insert(uri.to_string(), parsed.clone());
        parsed
    }

    fn add_vertices(&mut self, document: &Document) {
        let file = self.graph.add_file(&document.relative_path);
        for info in &document.symbols {
            let Some(symbol) = self.resolve(&info.symbol) else {
                self.stats.skipped_symbols += 1;
                continue;
            };
            let node = self.graph.add_symbol(&symbol, true);
            self.stats.declared_symbols += 1;
            if symbol.kind() == SymbolKind::Method {
                self.methods.insert(symbol.clone());
            }
            // Provisional: a definition occurrence may move it later. An
            // existing containment is never doubled.
            if !self.graph.containing_files(&symbol).is_empty() {
                continue;
            }
            self.graph.add_edge(file, node, GraphEdge::Contains);
        }
    }

    fn add_relationships(&mut self, document: &Document) {
        for info in &document.symbols {
            if info.relationships.is_empty() {
                continue;
            }
            let Some(symbol) = self.resolve(&info.symbol) else {
                continue;
            };
            let source = self.graph.add_symbol(&symbol, true);
            for relationship in &info.relationships {
                let Some(related) = self.resolve(&relationship.symbol) else {
                    self.stats.skipped_symbols += 1;
                    continue;
                };
                let target = self.graph.add_symbol(&related, false);
                let meta = RelationshipMeta {
                    is_reference: relationship.is_reference,
                    is_implementation: relationship.is_implementation,
                    is_type_definition: relationship.is_type_definition,
                    is_definition: relationship.is_definition,
                };
                self.graph.add_edge(source, target, GraphEdge::Relationship(meta));
                self.stats.relationship_edges += 1;
            }
        }
    }

    fn add_references(&mut self, document: &Document) {
        let path = document.relative_path.as_str();
        let file = self.graph.add_file(path);
        for occurrence in &document.occurrences {
            if occurrence.symbol.is_empty() {
                continue;
            }
            let Some(symbol) = self.resolve(&occurrence.symbol) else {
                self.stats.skipped_occurrences += 1;
                continue;
            };
            let Some((line, column)) = occurrence_start(occurrence) else {
                debug!("skipping occurrence of {symbol} in {path} with malformed range");
                self.stats.skipped_occurrences += 1;
                continue;
            };
            let roles = SymbolRoles::from_bits(occurrence.symbol_roles);
            let node = self.graph.add_symbol(&symbol, false);
            let reference = SymbolReference::new(symbol.clone(), line, column, roles);
            self.graph.add_edge(node, file, GraphEdge::Reference(reference));
            self.stats.reference_edges += 1;

            if roles.is_definition() {
                let current = self.graph.containing_files(&symbol);
                if current != [path] {
                    if !current.is_empty() {
                        debug!("moving containment of {symbol} from {current:?} to {path}");
                        self.stats.containment_corrections += 1;
                    }
                    self.graph.set_containing_file(&symbol, path);
                }
            }
        }
    }
}

/// Build a graph with the given passes. `loader` is only consulted by the
/// caller/callee pass.
pub fn build_graph(
    index: &Index,
    options: &BuildOptions,
    loader: Option<&ModuleLoader>,
) -> SymgraphResult<CodeGraph> {
    let mut builder = GraphBuilder::new(*options);
    if let Some(loader) = loader {
        builder = builder.with_loader(loader);
    }
    builder.build(index).map(|(graph, _)| graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EdgeLabel;
    use crate::testing::*;
    use scip::types::Occurrence;

    fn build(index: &Index, options: BuildOptions) -> (CodeGraph, BuildStats) {
        GraphBuilder::new(options).build(index).unwrap()
    }

    #[test]
    fn test_definition_corrects_containment() {
        let (graph, stats) = build(&two_document_index(), BuildOptions::default());
        assert_eq!(graph.containing_files(&sym(FOO_BAR)), vec!["pkg/b.py"]);
        assert_eq!(graph.containing_files(&sym(FOO)), vec!["pkg/a.py"]);
        assert_eq!(stats.containment_corrections, 1);
    }

    #[test]
    fn test_every_declared_symbol_has_one_container() {
        for fixture in [two_document_index(), service_index()] {
            let (graph, _) = build(&fixture, BuildOptions::default());
            for symbol in graph.declared_symbols() {
                assert_eq!(graph.containing_files(symbol).len(), 1, "{symbol}");
            }
        }
    }

    #[test]
    fn test_definition_before_declaration_is_kept() {
        // The defining document comes first; the later declaration must not
        // add a second containment edge.
        let fixture = index(vec![
            document("pkg/b.py", vec![], vec![definition(FOO, 1, 6)]),
            document("pkg/a.py", vec![information(FOO)], vec![]),
        ]);
        let (graph, _) = build(&fixture, BuildOptions::default());
        assert_eq!(graph.containing_files(&sym(FOO)), vec!["pkg/b.py"]);
    }

    #[test]
    fn test_relationship_edges_carry_flags() {
        let (graph, stats) = build(&two_document_index(), BuildOptions::default());
        assert_eq!(stats.relationship_edges, 1);
        let baz = graph.symbol_index(BAZ).unwrap();
        let edges: Vec<_> = graph.outgoing(baz, EdgeLabel::Relationship).collect();
        assert_eq!(edges.len(), 1);
        let (_, target, edge) = edges[0];
        assert_eq!(graph.node(target).and_then(|n| n.as_symbol()), Some(&sym(FOO)));
        match edge {
            GraphEdge::Relationship(meta) => {
                assert!(meta.is_implementation);
                assert!(!meta.is_reference);
            }
            other => panic!("unexpected edge {other:?}"),
        }
    }

    #[test]
    fn test_passes_are_optional() {
        let options = BuildOptions {
            build_references: false,
            build_relationships: false,
            build_caller_relationships: false,
        };
        let (graph, _) = build(&two_document_index(), options);
        assert_eq!(graph.edge_count_by_label(EdgeLabel::Reference), 0);
        assert_eq!(graph.edge_count_by_label(EdgeLabel::Relationship), 0);
        // Without references no correction happens.
        assert_eq!(graph.containing_files(&sym(FOO_BAR)), vec!["pkg/a.py"]);
    }

    #[test]
    fn test_callers_disabled_yield_no_call_edges() {
        let (graph, stats) = build(&service_index(), BuildOptions::default());
        assert_eq!(graph.edge_count_by_label(EdgeLabel::Caller), 0);
        assert_eq!(graph.edge_count_by_label(EdgeLabel::Callee), 0);
        assert_eq!(stats.call_edges, 0);
    }

    #[test]
    fn test_callers_require_initialized_loader() {
        let options = BuildOptions {
            build_caller_relationships: true,
            ..Default::default()
        };
        let err = GraphBuilder::new(options).build(&service_index()).unwrap_err();
        assert!(matches!(err, SymgraphError::NotInitialized(_)));

        let loader = ModuleLoader::new();
        let err = build_graph(&service_index(), &options, Some(&loader)).unwrap_err();
        assert!(matches!(err, SymgraphError::NotInitialized(_)));
    }

    #[test]
    fn test_malformed_symbols_are_skipped() {
        let fixture = index(vec![document(
            "pkg/a.py",
            vec![information("scip-python python pkg 1.0 Foo?"), information(FOO)],
            vec![
                read("not a symbol", 1, 1),
                Occurrence {
                    symbol: FOO.to_string(),
                    range: vec![1],
                    ..Default::default()
                },
                definition(FOO, 0, 6),
            ],
        )]);
        let (graph, stats) = build(&fixture, BuildOptions::default());
        assert_eq!(stats.skipped_symbols, 1);
        assert_eq!(stats.skipped_occurrences, 2);
        assert_eq!(graph.declared_symbols().count(), 1);
        assert_eq!(graph.edge_count_by_label(EdgeLabel::Reference), 1);
    }

    #[test]
    fn test_undeclared_references_are_not_declared() {
        let fixture = index(vec![document(
            "pkg/a.py",
            vec![information(FOO)],
            vec![read("scip-python python python-stdlib 3.11 builtins/str#", 2, 4)],
        )]);
        let (graph, _) = build(&fixture, BuildOptions::default());
        assert_eq!(graph.declared_symbols().count(), 1);
        assert!(graph
            .symbol_index("scip-python python python-stdlib 3.11 builtins/str#")
            .is_some());
    }
}
