//! Module loader: dotted module paths to parsed source trees.
//!
//! The loader is an explicit context object. Graph builders and navigators
//! receive it by handle, and parallel workers rebuild their own copy from a
//! [`LoaderConfig`] instead of sharing one.

pub mod filesystem;
pub mod parsed;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{SymgraphError, SymgraphResult};
use crate::models::BoundingBox;
use crate::symbol::Symbol;

pub use parsed::ParsedModule;

/// Minimal description of a source tree, enough to re-create a loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub root_path: PathBuf,
    pub relative_source_path: PathBuf,
}

impl LoaderConfig {
    pub fn new(root_path: impl Into<PathBuf>, relative_source_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            relative_source_path: relative_source_path.into(),
        }
    }
}

struct LoaderState {
    config: LoaderConfig,
    files: BTreeMap<String, PathBuf>,
}

/// Lazily parses and caches Python modules under a source root.
#[derive(Default)]
pub struct ModuleLoader {
    state: RwLock<Option<LoaderState>>,
    modules: RwLock<HashMap<String, Arc<ParsedModule>>>,
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("config", &self.config())
            .field("cached_modules", &self.modules.read().len())
            .finish()
    }
}

impl ModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader already initialized from `config`.
    pub fn from_config(config: &LoaderConfig) -> SymgraphResult<Self> {
        let loader = Self::new();
        loader.initialize(&config.root_path, &config.relative_source_path)?;
        Ok(loader)
    }

    /// Scan `root_path/relative_source_path` for modules.
    ///
    /// May be called once; a second call without [`ModuleLoader::reset`] is
    /// an [`SymgraphError::AlreadyInitialized`] error.
    pub fn initialize(&self, root_path: &Path, relative_source_path: &Path) -> SymgraphResult<()> {
        let mut state = self.state.write();
        if let Some(existing) = state.as_ref() {
            return Err(SymgraphError::AlreadyInitialized(format!(
                "module loader already initialized at {}",
                existing.config.root_path.display()
            )));
        }
        let files = filesystem::discover_modules(root_path, relative_source_path)?;
        info!(
            "module loader initialized: {} modules under {}",
            files.len(),
            root_path.join(relative_source_path).display()
        );
        *state = Some(LoaderState {
            config: LoaderConfig::new(root_path, relative_source_path),
            files,
        });
        Ok(())
    }

    /// Drop the source root and every cached module.
    pub fn reset(&self) {
        *self.state.write() = None;
        self.modules.write().clear();
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().is_some()
    }

    pub fn config(&self) -> Option<LoaderConfig> {
        self.state.read().as_ref().map(|s| s.config.clone())
    }

    /// Every known dotpath, discovered or explicitly put, sorted.
    pub fn module_dotpaths(&self) -> Vec<String> {
        let mut dotpaths: Vec<String> = self
            .state
            .read()
            .as_ref()
            .map(|s| s.files.keys().cloned().collect())
            .unwrap_or_default();
        dotpaths.extend(self.modules.read().keys().cloned());
        dotpaths.sort();
        dotpaths.dedup();
        dotpaths
    }

    pub fn fetch_file_path_for_module(&self, dotpath: &str) -> Option<PathBuf> {
        self.state.read().as_ref()?.files.get(dotpath).cloned()
    }

    /// The parsed module for `dotpath`, parsing it on first access.
    ///
    /// Returns `None` when the module is unknown or its file cannot be read
    /// or parsed.
    pub fn fetch_parsed_module(&self, dotpath: &str) -> Option<Arc<ParsedModule>> {
        if let Some(module) = self.modules.read().get(dotpath) {
            return Some(Arc::clone(module));
        }
        let path = self.fetch_file_path_for_module(dotpath)?;
        let parsed = match ParsedModule::from_file(dotpath, &path) {
            Ok(parsed) => Arc::new(parsed),
            Err(err) => {
                debug!("failed to load module {dotpath} from {}: {err}", path.display());
                return None;
            }
        };
        let mut modules = self.modules.write();
        let entry = modules
            .entry(dotpath.to_string())
            .or_insert_with(|| Arc::clone(&parsed));
        Some(Arc::clone(entry))
    }

    /// Register an already-parsed module, replacing any cached one.
    pub fn put_module(&self, dotpath: impl Into<String>, module: ParsedModule) {
        self.modules.write().insert(dotpath.into(), Arc::new(module));
    }

    fn module_for(&self, symbol: &Symbol) -> SymgraphResult<Arc<ParsedModule>> {
        self.fetch_parsed_module(symbol.module_path()).ok_or_else(|| {
            SymgraphError::Resolution(format!(
                "module {} of {} is not loadable",
                symbol.module_path(),
                symbol
            ))
        })
    }

    pub fn bounding_box(&self, symbol: &Symbol) -> SymgraphResult<BoundingBox> {
        self.module_for(symbol)?.bounding_box(symbol)
    }

    /// Source text of the definition of `symbol`.
    pub fn symbol_source(&self, symbol: &Symbol) -> SymgraphResult<String> {
        let module = self.module_for(symbol)?;
        let text = module.source_text(symbol)?;
        Ok(text.to_string())
    }
}
