//! In-memory SCIP fixtures shared by unit tests.

use std::path::Path;

use scip::types::{Document, Index, Occurrence, Relationship, SymbolInformation};

use crate::loader::{LoaderConfig, ModuleLoader};
use crate::symbol::{Symbol, SymbolRoles};

pub const FOO: &str = "scip-python python pkg 1.0 `pkg.a`/Foo#";
pub const FOO_BAR: &str = "scip-python python pkg 1.0 `pkg.a`/Foo#bar().";
pub const BAZ: &str = "scip-python python pkg 1.0 `pkg.b`/Baz#";

pub const SERVICE: &str = "scip-python python pkg 1.0 `pkg.svc`/Service#";
pub const SERVICE_RUN: &str = "scip-python python pkg 1.0 `pkg.svc`/Service#run().";
pub const HELPER: &str = "scip-python python pkg 1.0 `pkg.svc`/Helper#";
pub const HELPER_GO: &str = "scip-python python pkg 1.0 `pkg.svc`/Helper#go().";
pub const MAIN: &str = "scip-python python pkg 1.0 `pkg.svc`/main().";
pub const LOCAL_HELPER: &str = "local 0";

pub const SERVICE_SOURCE: &str = "class Service:
    def run(self):
        helper = Helper()
        return helper.go()


class Helper:
    def go(self):
        return 1


def main():
    return Service().run()
";

pub fn sym(uri: &str) -> Symbol {
    Symbol::parse(uri).unwrap()
}

pub fn occurrence(uri: &str, line: i32, column: i32, roles: SymbolRoles) -> Occurrence {
    Occurrence {
        symbol: uri.to_string(),
        range: vec![line, column, column + 3],
        symbol_roles: roles.bits() as i32,
        ..Default::default()
    }
}

pub fn definition(uri: &str, line: i32, column: i32) -> Occurrence {
    occurrence(uri, line, column, SymbolRoles::DEFINITION)
}

pub fn read(uri: &str, line: i32, column: i32) -> Occurrence {
    occurrence(uri, line, column, SymbolRoles::READ_ACCESS)
}

pub fn information(uri: &str) -> SymbolInformation {
    SymbolInformation {
        symbol: uri.to_string(),
        ..Default::default()
    }
}

pub fn implementation_of(uri: &str, parent: &str) -> SymbolInformation {
    SymbolInformation {
        symbol: uri.to_string(),
        relationships: vec![Relationship {
            symbol: parent.to_string(),
            is_implementation: true,
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn document(
    path: &str,
    symbols: Vec<SymbolInformation>,
    occurrences: Vec<Occurrence>,
) -> Document {
    Document {
        relative_path: path.to_string(),
        symbols,
        occurrences,
        ..Default::default()
    }
}

pub fn index(documents: Vec<Document>) -> Index {
    Index {
        documents,
        ..Default::default()
    }
}

/// `pkg/a.py` declares `Foo` and `Foo#bar()`, but the definition occurrence
/// of `Foo#bar()` lives in `pkg/b.py`, which also declares `Baz(Foo)`.
pub fn two_document_index() -> Index {
    index(vec![
        document(
            "pkg/a.py",
            vec![information(FOO), information(FOO_BAR)],
            vec![definition(FOO, 0, 6), read(FOO_BAR, 5, 4)],
        ),
        document(
            "pkg/b.py",
            vec![implementation_of(BAZ, FOO)],
            vec![
                definition(BAZ, 0, 6),
                read(FOO, 0, 10),
                definition(FOO_BAR, 2, 8),
            ],
        ),
    ])
}

/// Index matching [`SERVICE_SOURCE`] stored at `pkg/svc.py`.
pub fn service_index() -> Index {
    index(vec![document(
        "pkg/svc.py",
        vec![
            information(SERVICE),
            information(SERVICE_RUN),
            information(HELPER),
            information(HELPER_GO),
            information(MAIN),
        ],
        vec![
            definition(SERVICE, 0, 6),
            definition(SERVICE_RUN, 1, 8),
            definition(LOCAL_HELPER, 2, 8),
            read(HELPER, 2, 17),
            read(LOCAL_HELPER, 3, 15),
            read(HELPER_GO, 3, 22),
            definition(HELPER, 6, 6),
            definition(HELPER_GO, 7, 8),
            definition(MAIN, 11, 4),
            read(SERVICE, 12, 11),
            read(SERVICE_RUN, 12, 21),
        ],
    )])
}

/// Write [`SERVICE_SOURCE`] under a fresh temp dir.
pub fn service_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "pkg/svc.py", SERVICE_SOURCE);
    dir
}

pub fn write_source(root: &Path, relative: &str, source: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, source).unwrap();
}

pub fn service_loader(root: &Path) -> ModuleLoader {
    ModuleLoader::from_config(&LoaderConfig::new(root, "pkg")).unwrap()
}
