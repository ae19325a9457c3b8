//! Read-side queries over a built symbol graph.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{SymgraphError, SymgraphResult};
use crate::graph::CodeGraph;
use crate::indexer::pipeline;
use crate::loader::ModuleLoader;
use crate::models::{BoundingBox, EdgeLabel, GraphEdge, GraphNode};
use crate::query::scope;
use crate::symbol::{Symbol, SymbolReference};

/// Query facade over a [`CodeGraph`].
///
/// Holds the module loader used to resolve symbol scopes and a cache of
/// bounding boxes. The cache is filled on demand per query or in bulk by
/// [`GraphNavigator::precompute_bounding_boxes`].
#[derive(Debug)]
pub struct GraphNavigator {
    graph: CodeGraph,
    loader: Arc<ModuleLoader>,
    bounding_boxes: HashMap<Symbol, BoundingBox>,
}

impl GraphNavigator {
    pub fn new(graph: CodeGraph, loader: Arc<ModuleLoader>) -> Self {
        Self {
            graph,
            loader,
            bounding_boxes: HashMap::new(),
        }
    }

    pub fn graph(&self) -> &CodeGraph {
        &self.graph
    }

    pub fn loader(&self) -> &Arc<ModuleLoader> {
        &self.loader
    }

    // -- symbol universe -----------------------------------------------------

    /// Declared symbols sorted by full dotpath (URI breaks ties).
    pub fn sorted_supported_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.graph.declared_symbols().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Every symbol node, including undeclared reference targets, sorted.
    pub fn all_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self
            .graph
            .nodes()
            .filter_map(|(_, node)| node.as_symbol().cloned())
            .collect();
        symbols.sort();
        symbols
    }

    /// Remove every declared symbol not in `keep`.
    ///
    /// File nodes and undeclared reference targets are left alone.
    pub fn filter_symbols(&mut self, keep: &[Symbol]) -> usize {
        let keep: HashSet<&str> = keep.iter().map(Symbol::uri).collect();
        let doomed: Vec<Symbol> = self
            .graph
            .declared_symbols()
            .filter(|s| !keep.contains(s.uri()))
            .cloned()
            .collect();
        for symbol in &doomed {
            self.graph.remove_symbol(symbol);
            self.bounding_boxes.remove(symbol);
        }
        debug!("filtered {} unsupported symbols from the graph", doomed.len());
        doomed.len()
    }

    // -- edge queries --------------------------------------------------------

    /// Symbols referenced inside `symbol`'s own scope, excluding itself.
    pub fn symbol_dependencies(&self, symbol: &Symbol) -> SymgraphResult<BTreeSet<Symbol>> {
        Ok(self
            .references_in_scope(symbol)?
            .into_iter()
            .map(|r| r.symbol)
            .filter(|s| s != symbol)
            .collect())
    }

    /// Targets of `symbol`'s outgoing relationship edges.
    pub fn symbol_relationships(&self, symbol: &Symbol) -> BTreeSet<Symbol> {
        let Some(idx) = self.graph.symbol_index(symbol.uri()) else {
            return BTreeSet::new();
        };
        self.graph
            .outgoing(idx, EdgeLabel::Relationship)
            .filter_map(|(_, target, _)| self.graph.node(target)?.as_symbol().cloned())
            .collect()
    }

    /// References to `symbol`, grouped by file.
    pub fn references_to_symbol(&self, symbol: &Symbol) -> BTreeMap<String, Vec<SymbolReference>> {
        let mut grouped: BTreeMap<String, Vec<SymbolReference>> = BTreeMap::new();
        let Some(idx) = self.graph.symbol_index(symbol.uri()) else {
            return grouped;
        };
        for (_, target, edge) in self.graph.outgoing(idx, EdgeLabel::Reference) {
            let (Some(GraphNode::File(path)), GraphEdge::Reference(reference)) =
                (self.graph.node(target), edge)
            else {
                continue;
            };
            grouped.entry(path.clone()).or_default().push(reference.clone());
        }
        for references in grouped.values_mut() {
            references.sort_by_key(|r| (r.line_number, r.column_number));
        }
        grouped
    }

    /// Methods whose scope references `symbol`, keyed by the reference site.
    ///
    /// "Potential" because any in-scope reference counts, not only calls.
    pub fn potential_callers(&self, symbol: &Symbol) -> HashMap<SymbolReference, Symbol> {
        let Some(idx) = self.graph.symbol_index(symbol.uri()) else {
            return HashMap::new();
        };
        self.graph
            .incoming(idx, EdgeLabel::Callee)
            .filter_map(|(_, source, edge)| {
                let caller = self.graph.node(source)?.as_symbol()?.clone();
                let GraphEdge::Callee(site) = edge else {
                    return None;
                };
                let reference = SymbolReference::new(
                    caller.clone(),
                    site.line_number,
                    site.column_number,
                    site.roles,
                );
                Some((reference, caller))
            })
            .collect()
    }

    /// Classes and methods referenced in `symbol`'s scope, with the site.
    pub fn potential_callees(&self, symbol: &Symbol) -> HashMap<Symbol, SymbolReference> {
        let Some(idx) = self.graph.symbol_index(symbol.uri()) else {
            return HashMap::new();
        };
        self.graph
            .incoming(idx, EdgeLabel::Caller)
            .filter_map(|(_, source, edge)| {
                let callee = self.graph.node(source)?.as_symbol()?.clone();
                let GraphEdge::Caller(site) = edge else {
                    return None;
                };
                let reference = SymbolReference::new(
                    callee.clone(),
                    site.line_number,
                    site.column_number,
                    site.roles,
                );
                Some((callee, reference))
            })
            .collect()
    }

    // -- scope ---------------------------------------------------------------

    pub fn symbol_containing_file(&self, symbol: &Symbol) -> SymgraphResult<String> {
        scope::containing_file(&self.graph, symbol).map(str::to_string)
    }

    pub fn references_in_file(&self, path: &str) -> Vec<SymbolReference> {
        scope::references_in_file(&self.graph, path)
    }

    pub fn references_in_scope(&self, symbol: &Symbol) -> SymgraphResult<Vec<SymbolReference>> {
        scope::references_in_scope(
            &self.graph,
            &self.loader,
            symbol,
            self.bounding_boxes.get(symbol),
        )
    }

    /// Cached bounding box, or a fresh one from the loader (not cached).
    pub fn bounding_box(&self, symbol: &Symbol) -> SymgraphResult<BoundingBox> {
        match self.bounding_boxes.get(symbol) {
            Some(bbox) => Ok(*bbox),
            None => self.loader.bounding_box(symbol),
        }
    }

    pub fn set_bounding_box(&mut self, symbol: Symbol, bbox: BoundingBox) {
        self.bounding_boxes.insert(symbol, bbox);
    }

    pub fn bounding_box_count(&self) -> usize {
        self.bounding_boxes.len()
    }

    /// Fill the bounding-box cache for `symbols` on a worker pool.
    ///
    /// A non-empty cache short-circuits. Workers rebuild the loader from its
    /// config, so the loader must have been initialized from disk.
    pub fn precompute_bounding_boxes(
        &mut self,
        symbols: &[Symbol],
        max_workers: usize,
    ) -> SymgraphResult<usize> {
        if !self.bounding_boxes.is_empty() {
            debug!(
                "bounding boxes already cached ({}); skipping precompute",
                self.bounding_boxes.len()
            );
            return Ok(self.bounding_boxes.len());
        }
        let config = self.loader.config().ok_or_else(|| {
            SymgraphError::NotInitialized(
                "bounding box precompute requires an initialized module loader".into(),
            )
        })?;
        let report = pipeline::precompute_bounding_boxes(symbols, &config, max_workers);
        self.bounding_boxes.extend(report.boxes);
        info!("bounding box cache holds {} symbols", self.bounding_boxes.len());
        Ok(self.bounding_boxes.len())
    }
}
