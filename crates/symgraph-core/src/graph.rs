//! Labeled directed multigraph over symbols and documents.

use std::collections::HashMap;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::models::{EdgeLabel, GraphEdge, GraphNode};
use crate::symbol::Symbol;

/// Directed multigraph whose nodes are symbols or file paths.
///
/// Backed by a `StableDiGraph` so node removal during synchronization does
/// not invalidate the indices held by the lookup tables.
#[derive(Debug, Default, Clone)]
pub struct CodeGraph {
    graph: StableDiGraph<GraphNode, GraphEdge>,
    symbols: HashMap<Symbol, NodeIndex>,
    files: HashMap<String, NodeIndex>,
}

impl CodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn edge_count_by_label(&self, label: EdgeLabel) -> usize {
        self.graph
            .edge_indices()
            .filter(|&e| self.graph[e].label() == label)
            .count()
    }

    // -- nodes ---------------------------------------------------------------

    pub fn add_file(&mut self, path: &str) -> NodeIndex {
        if let Some(&idx) = self.files.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(GraphNode::File(path.to_string()));
        self.files.insert(path.to_string(), idx);
        idx
    }

    /// Add a symbol node, or upgrade an existing one to declared.
    pub fn add_symbol(&mut self, symbol: &Symbol, declared: bool) -> NodeIndex {
        if let Some(&idx) = self.symbols.get(symbol) {
            if declared {
                if let GraphNode::Symbol { declared: flag, .. } = &mut self.graph[idx] {
                    *flag = true;
                }
            }
            return idx;
        }
        let idx = self.graph.add_node(GraphNode::Symbol {
            symbol: symbol.clone(),
            declared,
        });
        self.symbols.insert(symbol.clone(), idx);
        idx
    }

    pub fn symbol_index(&self, symbol: &str) -> Option<NodeIndex> {
        self.symbols.get(symbol).copied()
    }

    pub fn file_index(&self, path: &str) -> Option<NodeIndex> {
        self.files.get(path).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&GraphNode> {
        self.graph.node_weight(idx)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &GraphNode)> + '_ {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    /// Symbols listed as declarations by some document, in arbitrary order.
    pub fn declared_symbols(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.graph
            .node_indices()
            .filter_map(move |idx| match &self.graph[idx] {
                GraphNode::Symbol {
                    symbol,
                    declared: true,
                } => Some(symbol),
                _ => None,
            })
    }

    pub fn files(&self) -> impl Iterator<Item = &str> + '_ {
        self.files.keys().map(String::as_str)
    }

    /// Remove a symbol node with all of its edges.
    pub fn remove_symbol(&mut self, symbol: &Symbol) -> bool {
        match self.symbols.remove(symbol) {
            Some(idx) => {
                self.graph.remove_node(idx);
                true
            }
            None => false,
        }
    }

    // -- edges ---------------------------------------------------------------

    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, edge: GraphEdge) -> EdgeIndex {
        self.graph.add_edge(source, target, edge)
    }

    pub fn remove_edge(&mut self, edge: EdgeIndex) -> Option<GraphEdge> {
        self.graph.remove_edge(edge)
    }

    /// All edges as `(source, target, payload)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &GraphEdge)> + '_ {
        self.graph.edge_indices().filter_map(move |e| {
            let (source, target) = self.graph.edge_endpoints(e)?;
            Some((source, target, &self.graph[e]))
        })
    }

    /// Edges leaving `idx` with the given label, as `(edge, target, payload)`.
    pub fn outgoing(
        &self,
        idx: NodeIndex,
        label: EdgeLabel,
    ) -> impl Iterator<Item = (EdgeIndex, NodeIndex, &GraphEdge)> + '_ {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(move |e| e.weight().label() == label)
            .map(|e| (e.id(), e.target(), e.weight()))
    }

    /// Edges entering `idx` with the given label, as `(edge, source, payload)`.
    pub fn incoming(
        &self,
        idx: NodeIndex,
        label: EdgeLabel,
    ) -> impl Iterator<Item = (EdgeIndex, NodeIndex, &GraphEdge)> + '_ {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .filter(move |e| e.weight().label() == label)
            .map(|e| (e.id(), e.source(), e.weight()))
    }

    /// Files with a `contains` edge into `symbol`.
    pub fn containing_files(&self, symbol: &Symbol) -> Vec<&str> {
        let Some(idx) = self.symbol_index(symbol.uri()) else {
            return Vec::new();
        };
        self.incoming(idx, EdgeLabel::Contains)
            .filter_map(|(_, source, _)| self.graph[source].as_file())
            .collect()
    }

    /// Point `symbol`'s containment at `path`, dropping every other
    /// `contains` edge into it.
    pub fn set_containing_file(&mut self, symbol: &Symbol, path: &str) {
        let file_idx = self.add_file(path);
        let symbol_idx = self.add_symbol(symbol, false);
        let stale: Vec<EdgeIndex> = self
            .incoming(symbol_idx, EdgeLabel::Contains)
            .map(|(edge, _, _)| edge)
            .collect();
        for edge in stale {
            self.graph.remove_edge(edge);
        }
        self.graph.add_edge(file_idx, symbol_idx, GraphEdge::Contains);
    }
}
