//! Symbol graph core library.
//!
//! Builds a typed graph of symbols, files and their relationships from a
//! SCIP index, answers scope-aware dependency queries against Python
//! sources, produces the rankable dependency subgraph consumed by ranking,
//! and reconciles the symbol universe shared with other providers.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use symgraph_core::{GraphConfig, ModuleLoader, SymbolGraph};
//!
//! # fn main() -> symgraph_core::SymgraphResult<()> {
//! let config = GraphConfig::from_env();
//! let loader = Arc::new(ModuleLoader::new());
//! loader.initialize("/repo".as_ref(), "src".as_ref())?;
//! let mut graph = SymbolGraph::open(&config, loader)?;
//! let subgraph = graph.default_rankable_subgraph()?;
//! println!("{} rankable symbols", subgraph.node_count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod graph;
pub mod indexer;
pub mod loader;
pub mod models;
pub mod query;
pub mod store;
pub mod symbol;
pub mod symbol_graph;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{BuildOptions, GraphConfig};
pub use errors::{SymbolParseError, SymgraphError, SymgraphResult};
pub use graph::CodeGraph;
pub use loader::{LoaderConfig, ModuleLoader};
pub use models::{BoundingBox, EdgeLabel, GraphEdge, GraphNode};
pub use query::{FlowRank, GraphNavigator, RankableSubgraph};
pub use symbol::{RankableFilter, Symbol, SymbolKind, SymbolReference, SymbolRoles};
pub use symbol_graph::{GraphState, SymbolGraph};
pub use sync::{ProviderRegistry, StaticSymbolProvider, SymbolProvider};
