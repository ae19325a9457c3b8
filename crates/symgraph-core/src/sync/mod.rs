//! Reconciling the symbol universes of independent providers.
//!
//! Several sources know about symbols: the structural graph, embedding
//! stores, documentation stores. Joins across them are only sound over the
//! symbols they all have, so each source implements [`SymbolProvider`] and
//! is narrowed to the common set by a [`registry::ProviderRegistry`].

pub mod registry;

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::symbol::{sort_symbols, Symbol};

pub use registry::{ProviderRegistry, SynchronizationContext};

/// A source of supported symbols that can be narrowed to a shared set.
pub trait SymbolProvider: Send + Sync {
    /// Name used in logs and error messages.
    fn provider_name(&self) -> &str;

    /// Every symbol the provider supports, ignoring synchronization, sorted
    /// by full dotpath.
    fn unfiltered_sorted_symbols(&self) -> Vec<Symbol>;

    /// Drop every symbol not in `keep`.
    fn filter_symbols(&mut self, keep: &[Symbol]);

    fn is_synchronized(&self) -> bool;

    fn set_synchronized(&mut self, synchronized: bool);

    /// Supported symbols. Only meaningful once synchronized; before that the
    /// unfiltered universe is returned.
    fn sorted_supported_symbols(&self) -> Vec<Symbol> {
        if !self.is_synchronized() {
            debug!(
                "{} queried for supported symbols before synchronization",
                self.provider_name()
            );
        }
        self.unfiltered_sorted_symbols()
    }
}

pub type SharedProvider = Arc<RwLock<dyn SymbolProvider>>;

/// Wrap a provider for registration.
pub fn shared<P: SymbolProvider + 'static>(provider: P) -> SharedProvider {
    Arc::new(RwLock::new(provider))
}

/// A provider over a fixed symbol list, e.g. the keys of an embedding store.
#[derive(Debug, Clone)]
pub struct StaticSymbolProvider {
    name: String,
    symbols: Vec<Symbol>,
    synchronized: bool,
}

impl StaticSymbolProvider {
    pub fn new(name: impl Into<String>, symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let mut symbols: Vec<Symbol> = symbols.into_iter().collect();
        sort_symbols(&mut symbols);
        symbols.dedup();
        Self {
            name: name.into(),
            symbols,
            synchronized: false,
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolProvider for StaticSymbolProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn unfiltered_sorted_symbols(&self) -> Vec<Symbol> {
        self.symbols.clone()
    }

    fn filter_symbols(&mut self, keep: &[Symbol]) {
        let keep: HashSet<&str> = keep.iter().map(Symbol::uri).collect();
        self.symbols.retain(|s| keep.contains(s.uri()));
    }

    fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    fn set_synchronized(&mut self, synchronized: bool) {
        self.synchronized = synchronized;
    }
}
