//! Criterion benchmarks for symgraph-core.
//!
//! ## Benchmark groups
//!
//! 1. **symbol_parsing** : URI parsing and unparsing.
//! 2. **graph_build** : Graph construction from synthetic indexes.
//! 3. **graph_cache** : SQLite save/load of a built graph.
//!
//! ## Running
//!
//! ```sh
//! cargo bench --manifest-path crates/symgraph-core/Cargo.toml
//! # Run only the build group:
//! cargo bench --manifest-path crates/symgraph-core/Cargo.toml -- graph_build
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scip::types::{Document, Index, Occurrence, Relationship, SymbolInformation};

use symgraph_core::indexer::build_graph;
use symgraph_core::store::GraphStore;
use symgraph_core::{BuildOptions, Symbol, SymbolRoles};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const URIS: &[&str] = &[
    "scip-python python pkg 1.0 `pkg.mod`/Foo#",
    "scip-python python pkg 1.0 `pkg.mod`/Foo#bar().",
    "scip-python python pkg 1.0 `pkg.mod`/Foo#bar().(self)",
    "scip-python python snapshot-util 0.1 `snapshot_util.deeply.nested`/Klass#method(+1).",
    "local 42",
];

fn occurrence(symbol: &str, line: i32, column: i32, roles: SymbolRoles) -> Occurrence {
    Occurrence {
        symbol: symbol.to_string(),
        range: vec![line, column, column + 4],
        symbol_roles: roles.bits() as i32,
        ..Default::default()
    }
}

/// `documents` modules, each declaring `classes` classes with one method.
/// Every method reads the class declared before it, across module
/// boundaries, and each class implements its predecessor.
fn synthetic_index(documents: usize, classes: usize) -> Index {
    let class_uri = |d: usize, c: usize| format!("scip-python python bench 1.0 `bench.m{d}`/C{c}#");
    let method_uri = |d: usize, c: usize| format!("{}run().", class_uri(d, c));

    let mut previous: Option<String> = None;
    let mut docs = Vec::with_capacity(documents);
    for d in 0..documents {
        let mut symbols = Vec::new();
        let mut occurrences = Vec::new();
        for c in 0..classes {
            let class = class_uri(d, c);
            let method = method_uri(d, c);
            let line = (c * 4) as i32;
            symbols.push(SymbolInformation {
                symbol: class.clone(),
                relationships: previous
                    .iter()
                    .map(|parent| Relationship {
                        symbol: parent.clone(),
                        is_implementation: true,
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            });
            symbols.push(SymbolInformation {
                symbol: method.clone(),
                ..Default::default()
            });
            occurrences.push(occurrence(&class, line, 6, SymbolRoles::DEFINITION));
            occurrences.push(occurrence(&method, line + 1, 8, SymbolRoles::DEFINITION));
            if let Some(parent) = &previous {
                occurrences.push(occurrence(parent, line + 2, 15, SymbolRoles::READ_ACCESS));
            }
            previous = Some(class);
        }
        docs.push(Document {
            relative_path: format!("bench/m{d}.py"),
            symbols,
            occurrences,
            ..Default::default()
        });
    }
    Index {
        documents: docs,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

fn bench_symbol_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("symbol_parsing");

    for (i, uri) in URIS.iter().enumerate() {
        group.bench_with_input(BenchmarkId::new("parse", i), uri, |b, uri| {
            b.iter(|| Symbol::parse(black_box(uri)).unwrap());
        });
    }

    let parsed: Vec<Symbol> = URIS.iter().map(|u| Symbol::parse(u).unwrap()).collect();
    group.bench_function("unparse_all", |b| {
        b.iter(|| {
            for symbol in &parsed {
                black_box(symbol.unparse());
            }
        });
    });
    group.bench_function("parent_chain", |b| {
        b.iter(|| {
            let mut current = Some(parsed[2].clone());
            while let Some(symbol) = current {
                current = black_box(symbol.parent());
            }
        });
    });

    group.finish();
}

fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");

    for &(documents, classes) in &[(10, 10), (50, 20), (200, 20)] {
        let index = synthetic_index(documents, classes);
        group.bench_with_input(
            BenchmarkId::new("full", documents * classes),
            &index,
            |b, index| {
                b.iter(|| build_graph(black_box(index), &BuildOptions::default(), None).unwrap());
            },
        );
        let vertices_only = BuildOptions {
            build_references: false,
            build_relationships: false,
            build_caller_relationships: false,
        };
        group.bench_with_input(
            BenchmarkId::new("vertices_only", documents * classes),
            &index,
            |b, index| {
                b.iter(|| build_graph(black_box(index), &vertices_only, None).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_graph_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_cache");
    group.sample_size(20);

    let dir = tempfile::tempdir().unwrap();
    let store = GraphStore::open(dir.path().join("graph.db")).unwrap();
    let graph = build_graph(&synthetic_index(50, 20), &BuildOptions::default(), None).unwrap();
    store.save(&graph, "bench").unwrap();

    group.bench_function("save_1000_classes", |b| {
        b.iter(|| store.save(black_box(&graph), "bench").unwrap());
    });
    group.bench_function("load_1000_classes", |b| {
        b.iter(|| black_box(store.load("bench").unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_symbol_parsing,
    bench_graph_build,
    bench_graph_cache,
);
criterion_main!(benches);
