//! The registry that narrows every registered provider to the common
//! symbol set.
//!
//! Lifecycle: `reset -> register* -> synchronize`. Use it through
//! [`ProviderRegistry::synchronization_context`], which fails if the caller
//! registers providers and forgets to synchronize them.

use std::cell::Cell;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::errors::{SymgraphError, SymgraphResult};
use crate::symbol::{sort_symbols, Symbol};
use crate::sync::SharedProvider;

#[derive(Default)]
struct RegistryState {
    providers: Vec<SharedProvider>,
    sorted_symbols: Vec<Symbol>,
}

#[derive(Default)]
pub struct ProviderRegistry {
    inner: Mutex<RegistryState>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("ProviderRegistry")
            .field("providers", &state.providers.len())
            .field("sorted_symbols", &state.sorted_symbols.len())
            .finish()
    }
}

static GLOBAL_REGISTRY: OnceLock<ProviderRegistry> = OnceLock::new();

fn provider_names(providers: &[SharedProvider]) -> String {
    providers
        .iter()
        .map(|p| p.read().provider_name().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static ProviderRegistry {
        GLOBAL_REGISTRY.get_or_init(ProviderRegistry::new)
    }

    /// Forget every provider and the canonical symbol list.
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        state.providers.clear();
        state.sorted_symbols.clear();
    }

    /// Add a provider, marking it unsynchronized. Registering the same
    /// provider twice is a no-op.
    pub fn register(&self, provider: SharedProvider) {
        provider.write().set_synchronized(false);
        let mut state = self.inner.lock();
        if state.providers.iter().any(|p| Arc::ptr_eq(p, &provider)) {
            return;
        }
        debug!("registered symbol provider {}", provider.read().provider_name());
        state.providers.push(provider);
    }

    pub fn provider_count(&self) -> usize {
        self.inner.lock().providers.len()
    }

    /// Narrow every provider to the symbols they all support.
    ///
    /// Fails without touching any provider when nothing is registered or
    /// the intersection is empty.
    pub fn synchronize(&self) -> SymgraphResult<Vec<Symbol>> {
        let mut state = self.inner.lock();
        let Some((first, rest)) = state.providers.split_first() else {
            return Err(SymgraphError::Synchronization(
                "no symbol providers registered".to_string(),
            ));
        };

        let mut common: HashSet<Symbol> = first.read().unfiltered_sorted_symbols().into_iter().collect();
        for provider in rest {
            let theirs: HashSet<Symbol> =
                provider.read().unfiltered_sorted_symbols().into_iter().collect();
            common.retain(|s| theirs.contains(s));
        }
        if common.is_empty() {
            return Err(SymgraphError::Synchronization(format!(
                "providers share no symbols: [{}]",
                provider_names(&state.providers)
            )));
        }

        let mut sorted: Vec<Symbol> = common.into_iter().collect();
        sort_symbols(&mut sorted);
        for provider in &state.providers {
            let mut provider = provider.write();
            provider.filter_symbols(&sorted);
            provider.set_synchronized(true);
        }
        info!(
            "synchronized {} providers on {} symbols",
            state.providers.len(),
            sorted.len()
        );
        state.sorted_symbols = sorted.clone();
        Ok(sorted)
    }

    /// The canonical list from the last successful synchronization.
    pub fn sorted_supported_symbols(&self) -> Vec<Symbol> {
        self.inner.lock().sorted_symbols.clone()
    }

    /// Run `body` against a freshly reset registry. The body must call
    /// [`SynchronizationContext::synchronize`]; returning without doing so
    /// is an error.
    pub fn synchronization_context<T>(
        &self,
        body: impl FnOnce(&SynchronizationContext<'_>) -> SymgraphResult<T>,
    ) -> SymgraphResult<T> {
        self.reset();
        let ctx = SynchronizationContext {
            registry: self,
            synchronized: Cell::new(false),
        };
        let value = body(&ctx)?;
        if !ctx.synchronized.get() {
            return Err(SymgraphError::Synchronization(format!(
                "context exited without synchronizing {} providers",
                self.provider_count()
            )));
        }
        Ok(value)
    }
}

/// Handle passed to the body of
/// [`ProviderRegistry::synchronization_context`].
pub struct SynchronizationContext<'r> {
    registry: &'r ProviderRegistry,
    synchronized: Cell<bool>,
}

impl SynchronizationContext<'_> {
    pub fn register(&self, provider: SharedProvider) {
        self.registry.register(provider);
        self.synchronized.set(false);
    }

    pub fn synchronize(&self) -> SymgraphResult<Vec<Symbol>> {
        let symbols = self.registry.synchronize()?;
        self.synchronized.set(true);
        Ok(symbols)
    }
}
