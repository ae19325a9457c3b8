//! Source tree discovery: Python files under a source root and their module
//! dotpaths.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::errors::SymgraphResult;

const PYTHON_EXTENSION: &str = "py";
const PACKAGE_INIT: &str = "__init__";

const IMPLICIT_IGNORED_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    "node_modules",
];

/// Convert a root-relative file path to a dotted module name.
///
/// `pkg/sub/mod.py` becomes `pkg.sub.mod`. Returns `None` for paths without
/// a usable component.
pub fn to_module_dotpath(relative: &Path) -> Option<String> {
    let without_ext = relative.with_extension("");
    let parts: Vec<&str> = without_ext
        .components()
        .filter_map(|c| match c {
            Component::Normal(os) => os.to_str(),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("."))
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IMPLICIT_IGNORED_DIRS.contains(&name))
}

fn is_python_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PYTHON_EXTENSION))
}

/// Map every Python module under `root/relative_source_path` to its file.
///
/// Dotpaths are relative to `root`, so `root/pkg/mod.py` is `pkg.mod` no
/// matter which subdirectory was scanned. A package's `__init__.py` is
/// registered under both `pkg.__init__` and `pkg`.
pub fn discover_modules(
    root: &Path,
    relative_source_path: &Path,
) -> SymgraphResult<BTreeMap<String, PathBuf>> {
    let source_root = root.join(relative_source_path);
    // Surface a missing source root as an I/O error instead of an empty map.
    std::fs::metadata(&source_root)?;

    let mut modules = BTreeMap::new();
    let walker = WalkDir::new(&source_root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored_dir(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("skipping unreadable entry under {}: {err}", source_root.display());
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !is_python_file(path) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        let Some(dotpath) = to_module_dotpath(relative) else {
            continue;
        };
        if let Some(package) = dotpath.strip_suffix(&format!(".{PACKAGE_INIT}")) {
            modules.insert(package.to_string(), path.to_path_buf());
        }
        modules.insert(dotpath, path.to_path_buf());
    }

    Ok(modules)
}
