//! The symbol graph facade: build or load a graph, query it, and take part
//! in provider synchronization.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use scip::types::Index;
use tracing::{info, warn};

use crate::config::{default_max_workers, BuildOptions, GraphConfig};
use crate::errors::SymgraphResult;
use crate::graph::CodeGraph;
use crate::indexer::builder::{BuildStats, GraphBuilder};
use crate::indexer::scip as scip_index;
use crate::loader::ModuleLoader;
use crate::models::BoundingBox;
use crate::query::navigator::GraphNavigator;
use crate::query::subgraph::{build_rankable_subgraph, FlowRank, RankableSubgraph};
use crate::store::GraphStore;
use crate::symbol::{rankable_symbols, RankableFilter, Symbol, SymbolReference};
use crate::sync::SymbolProvider;

pub const PROVIDER_NAME: &str = "symbol_graph";

/// Lifecycle of a [`SymbolGraph`]. A graph is built on construction and
/// becomes synchronized once a provider registry narrows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Built,
    Synchronized,
}

#[derive(Debug)]
pub struct SymbolGraph {
    navigator: GraphNavigator,
    rankable_filter: RankableFilter,
    max_workers: usize,
    synchronized: bool,
    /// `None` when the graph came from the cache.
    stats: Option<BuildStats>,
    default_subgraph: Option<RankableSubgraph>,
}

impl SymbolGraph {
    fn from_parts(graph: CodeGraph, loader: Arc<ModuleLoader>, stats: Option<BuildStats>) -> Self {
        Self {
            navigator: GraphNavigator::new(graph, loader),
            rankable_filter: RankableFilter::default(),
            max_workers: default_max_workers(),
            synchronized: false,
            stats,
            default_subgraph: None,
        }
    }

    /// Build from a decoded index.
    pub fn from_index(
        index: &Index,
        loader: Arc<ModuleLoader>,
        options: &BuildOptions,
    ) -> SymgraphResult<Self> {
        let (graph, stats) = GraphBuilder::new(*options)
            .with_loader(loader.as_ref())
            .build(index)?;
        Ok(Self::from_parts(graph, loader, Some(stats)))
    }

    pub fn from_index_file(
        path: &Path,
        loader: Arc<ModuleLoader>,
        options: &BuildOptions,
    ) -> SymgraphResult<Self> {
        let index = scip_index::load_index(path)?;
        Self::from_index(&index, loader, options)
    }

    /// Build per `config`, going through the graph cache when one is
    /// configured.
    ///
    /// With `rebuild_graph` off, a cache saved for the same index bytes and
    /// build options is loaded instead of rebuilding. Any cache failure
    /// falls back to a rebuild. Failing to write the cache is logged and
    /// otherwise ignored.
    pub fn open(config: &GraphConfig, loader: Arc<ModuleLoader>) -> SymgraphResult<Self> {
        let bytes = scip_index::read_index_bytes(&config.index_path)?;
        let fingerprint = scip_index::graph_fingerprint(&bytes, &config.build);
        let store = match &config.cache_path {
            Some(path) => match GraphStore::open(path) {
                Ok(store) => Some(store),
                Err(err) => {
                    warn!("graph cache unavailable at {}: {err}", path.display());
                    None
                }
            },
            None => None,
        };

        let cached = match &store {
            Some(store) if !config.rebuild_graph => match store.load(&fingerprint) {
                Ok(graph) => Some(graph),
                Err(err) => {
                    warn!("graph cache not usable ({err}); rebuilding from index");
                    None
                }
            },
            _ => None,
        };

        let mut symbol_graph = match cached {
            Some(graph) => {
                info!("symbol graph loaded from cache");
                Self::from_parts(graph, loader, None)
            }
            None => {
                let index = scip_index::decode_index(&bytes)?;
                let built = Self::from_index(&index, loader, &config.build)?;
                if let Some(store) = &store {
                    if let Err(err) = store.save(built.graph(), &fingerprint) {
                        warn!("failed to save graph cache: {err}");
                    }
                }
                built
            }
        };
        symbol_graph.rankable_filter = config.rankable_filter();
        symbol_graph.max_workers = config.max_workers;
        Ok(symbol_graph)
    }

    pub fn with_rankable_filter(mut self, filter: RankableFilter) -> Self {
        self.rankable_filter = filter;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn state(&self) -> GraphState {
        if self.synchronized {
            GraphState::Synchronized
        } else {
            GraphState::Built
        }
    }

    pub fn loaded_from_cache(&self) -> bool {
        self.stats.is_none()
    }

    pub fn build_stats(&self) -> Option<&BuildStats> {
        self.stats.as_ref()
    }

    pub fn navigator(&self) -> &GraphNavigator {
        &self.navigator
    }

    pub fn graph(&self) -> &CodeGraph {
        self.navigator.graph()
    }

    pub fn loader(&self) -> &Arc<ModuleLoader> {
        self.navigator.loader()
    }

    pub fn rankable_filter(&self) -> &RankableFilter {
        &self.rankable_filter
    }

    // -- queries -------------------------------------------------------------

    pub fn sorted_supported_symbols(&self) -> Vec<Symbol> {
        SymbolProvider::sorted_supported_symbols(self)
    }

    pub fn all_symbols(&self) -> Vec<Symbol> {
        self.navigator.all_symbols()
    }

    pub fn rankable_symbols(&self) -> Vec<Symbol> {
        rankable_symbols(&self.navigator.sorted_supported_symbols(), &self.rankable_filter)
    }

    pub fn symbol_dependencies(&self, symbol: &Symbol) -> SymgraphResult<BTreeSet<Symbol>> {
        self.navigator.symbol_dependencies(symbol)
    }

    pub fn symbol_relationships(&self, symbol: &Symbol) -> BTreeSet<Symbol> {
        self.navigator.symbol_relationships(symbol)
    }

    pub fn references_to_symbol(&self, symbol: &Symbol) -> BTreeMap<String, Vec<SymbolReference>> {
        self.navigator.references_to_symbol(symbol)
    }

    pub fn potential_callers(&self, symbol: &Symbol) -> HashMap<SymbolReference, Symbol> {
        self.navigator.potential_callers(symbol)
    }

    pub fn potential_callees(&self, symbol: &Symbol) -> HashMap<Symbol, SymbolReference> {
        self.navigator.potential_callees(symbol)
    }

    pub fn symbol_containing_file(&self, symbol: &Symbol) -> SymgraphResult<String> {
        self.navigator.symbol_containing_file(symbol)
    }

    pub fn references_in_file(&self, path: &str) -> Vec<SymbolReference> {
        self.navigator.references_in_file(path)
    }

    pub fn references_in_scope(&self, symbol: &Symbol) -> SymgraphResult<Vec<SymbolReference>> {
        self.navigator.references_in_scope(symbol)
    }

    pub fn bounding_box(&self, symbol: &Symbol) -> SymgraphResult<BoundingBox> {
        self.navigator.bounding_box(symbol)
    }

    pub fn symbol_source(&self, symbol: &Symbol) -> SymgraphResult<String> {
        self.navigator.loader().symbol_source(symbol)
    }

    // -- ranking input -------------------------------------------------------

    /// Cache bounding boxes for every rankable symbol. Returns the cache
    /// size.
    pub fn precompute_bounding_boxes(&mut self) -> SymgraphResult<usize> {
        let symbols = self.rankable_symbols();
        self.navigator
            .precompute_bounding_boxes(&symbols, self.max_workers)
    }

    /// Build a fresh rankable subgraph. Bounding boxes are precomputed first
    /// when the loader can be rebuilt by workers.
    pub fn rankable_subgraph(
        &mut self,
        flow: FlowRank,
        path_filter: Option<&str>,
    ) -> SymgraphResult<RankableSubgraph> {
        if self.navigator.loader().is_initialized() {
            self.precompute_bounding_boxes()?;
        }
        build_rankable_subgraph(&self.navigator, &self.rankable_filter, flow, path_filter)
    }

    /// The bidirectional, unfiltered subgraph, built on first access and
    /// kept for the life of the graph. Later filtering does not rebuild it.
    pub fn default_rankable_subgraph(&mut self) -> SymgraphResult<&RankableSubgraph> {
        let subgraph = match self.default_subgraph.take() {
            Some(subgraph) => subgraph,
            None => self.rankable_subgraph(FlowRank::default(), None)?,
        };
        Ok(self.default_subgraph.insert(subgraph))
    }
}

impl SymbolProvider for SymbolGraph {
    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn unfiltered_sorted_symbols(&self) -> Vec<Symbol> {
        self.navigator.sorted_supported_symbols()
    }

    fn filter_symbols(&mut self, keep: &[Symbol]) {
        let removed = self.navigator.filter_symbols(keep);
        info!("symbol graph narrowed to {} symbols ({removed} removed)", keep.len());
    }

    fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    fn set_synchronized(&mut self, synchronized: bool) {
        self.synchronized = synchronized;
    }
}
