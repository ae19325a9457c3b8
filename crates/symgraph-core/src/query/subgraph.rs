//! Dependency subgraph over rankable symbols, the input to ranking.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, info, warn};

use crate::errors::SymgraphResult;
use crate::query::navigator::GraphNavigator;
use crate::symbol::{rankable_symbols, RankableFilter, Symbol};

/// Direction of dependency edges in a rankable subgraph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FlowRank {
    /// symbol -> dependency
    ToDependents,
    /// dependency -> symbol
    FromDependents,
    #[default]
    Bidirectional,
}

/// A directed graph over rankable symbols. Owned and detached from the
/// primary graph, so callers may mutate it freely.
#[derive(Debug, Clone, Default)]
pub struct RankableSubgraph {
    graph: DiGraph<Symbol, ()>,
    index: HashMap<Symbol, NodeIndex>,
}

impl RankableSubgraph {
    fn node(&mut self, symbol: &Symbol) -> NodeIndex {
        if let Some(&idx) = self.index.get(symbol) {
            return idx;
        }
        let idx = self.graph.add_node(symbol.clone());
        self.index.insert(symbol.clone(), idx);
        idx
    }

    fn connect(&mut self, from: &Symbol, to: &Symbol) {
        let a = self.node(from);
        let b = self.node(to);
        self.graph.update_edge(a, b, ());
    }

    pub fn graph(&self) -> &DiGraph<Symbol, ()> {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut DiGraph<Symbol, ()> {
        &mut self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.index.contains_key(symbol)
    }

    pub fn has_edge(&self, from: &Symbol, to: &Symbol) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// Nodes in insertion order, which follows the supported-symbol order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.graph.node_weights()
    }
}

/// Build the dependency subgraph over the rankable supported symbols.
///
/// Only symbols whose module path contains `path_filter` (when given) are
/// expanded, and only dependencies that are themselves rankable supported
/// symbols become edges, so references into undeclared third-party code
/// never add nodes. Symbols whose scope cannot be resolved contribute a node but no
/// edges; a broken containment invariant aborts the build.
pub fn build_rankable_subgraph(
    navigator: &GraphNavigator,
    filter: &RankableFilter,
    flow: FlowRank,
    path_filter: Option<&str>,
) -> SymgraphResult<RankableSubgraph> {
    let candidates = rankable_symbols(&navigator.sorted_supported_symbols(), filter);
    let universe: HashSet<&Symbol> = candidates.iter().collect();
    let mut subgraph = RankableSubgraph::default();
    let mut unresolved = 0usize;

    for symbol in &candidates {
        if let Some(needle) = path_filter {
            if !symbol.module_path().contains(needle) {
                continue;
            }
        }
        subgraph.node(symbol);
        let dependencies = match navigator.symbol_dependencies(symbol) {
            Ok(deps) => deps,
            Err(err) if err.is_recoverable() => {
                debug!("no dependencies for {symbol}: {err}");
                unresolved += 1;
                continue;
            }
            Err(err) => return Err(err),
        };
        for dependency in dependencies.iter().filter(|d| universe.contains(d)) {
            match flow {
                FlowRank::ToDependents => subgraph.connect(symbol, dependency),
                FlowRank::FromDependents => subgraph.connect(dependency, symbol),
                FlowRank::Bidirectional => {
                    subgraph.connect(symbol, dependency);
                    subgraph.connect(dependency, symbol);
                }
            }
        }
    }

    if unresolved > 0 {
        warn!("{unresolved} rankable symbols had no resolvable scope");
    }
    info!(
        "rankable subgraph ({flow:?}): {} nodes, {} edges",
        subgraph.node_count(),
        subgraph.edge_count()
    );
    Ok(subgraph)
}
