//! Parallel bounding-box precomputation with Rayon.
//!
//! Workers never share a loader. Each one builds its own [`ModuleLoader`]
//! from the [`LoaderConfig`], parses what it needs, and hands back plain
//! bounding boxes that are merged on the calling thread.

use std::collections::HashMap;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::errors::{SymgraphError, SymgraphResult};
use crate::loader::{LoaderConfig, ModuleLoader};
use crate::models::BoundingBox;
use crate::symbol::Symbol;

/// Outcome of a precompute run.
#[derive(Debug, Default)]
pub struct PrecomputeReport {
    pub boxes: HashMap<Symbol, BoundingBox>,
    pub failed: usize,
    pub elapsed_ms: u128,
}

fn compute_worker(
    loader: &SymgraphResult<ModuleLoader>,
    symbol: &Symbol,
) -> Option<(Symbol, BoundingBox)> {
    let result = match loader {
        Ok(loader) => loader.bounding_box(symbol),
        Err(err) => Err(SymgraphError::NotInitialized(format!(
            "worker loader unavailable: {err}"
        ))),
    };
    match result {
        Ok(bbox) => Some((symbol.clone(), bbox)),
        Err(err) => {
            warn!("bounding box for {symbol} failed: {err}");
            None
        }
    }
}

/// Compute bounding boxes for `symbols` on a pool of `workers` threads.
///
/// A symbol whose box cannot be computed is logged and left out; the call
/// itself never fails because of one symbol. Falls back to a sequential
/// pass when the pool cannot be built.
pub fn precompute_bounding_boxes(
    symbols: &[Symbol],
    config: &LoaderConfig,
    workers: usize,
) -> PrecomputeReport {
    precompute_with(symbols, workers, || ModuleLoader::from_config(config))
}

/// Smallest chunk handed to one rayon job. Chunks of at least
/// `ceil(total / workers)` leave at most `workers` jobs, so each worker
/// builds its loader (a full source walk) about once.
fn min_chunk_len(total: usize, workers: usize) -> usize {
    total.div_ceil(workers.max(1)).max(1)
}

fn precompute_with<F>(symbols: &[Symbol], workers: usize, init: F) -> PrecomputeReport
where
    F: Fn() -> SymgraphResult<ModuleLoader> + Send + Sync,
{
    if symbols.is_empty() {
        return PrecomputeReport::default();
    }
    let started = Instant::now();
    let workers = workers.max(1);

    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build();

    let results: Vec<Option<(Symbol, BoundingBox)>> = match pool {
        Ok(pool) => pool.install(|| {
            symbols
                .par_iter()
                .with_min_len(min_chunk_len(symbols.len(), workers))
                .map_init(&init, |loader, symbol| compute_worker(loader, symbol))
                .collect()
        }),
        Err(err) => {
            warn!("bounding box pool unavailable ({err}); computing sequentially");
            let loader = init();
            symbols.iter().map(|s| compute_worker(&loader, s)).collect()
        }
    };

    let failed = results.iter().filter(|r| r.is_none()).count();
    let boxes: HashMap<Symbol, BoundingBox> = results.into_iter().flatten().collect();
    let elapsed_ms = started.elapsed().as_millis();
    info!(
        "precomputed {} bounding boxes ({} failed) with {} workers in {} ms",
        boxes.len(),
        failed,
        workers,
        elapsed_ms
    );
    PrecomputeReport {
        boxes,
        failed,
        elapsed_ms,
    }
}
