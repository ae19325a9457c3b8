//! Runtime configuration, set programmatically or read from `SYMGRAPH_*`
//! environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::symbol::rankable::DEFAULT_RANKABLE_EXCLUSIONS;
use crate::symbol::RankableFilter;

pub const ENV_INDEX_PATH: &str = "SYMGRAPH_INDEX_PATH";
pub const ENV_GRAPH_CACHE: &str = "SYMGRAPH_GRAPH_CACHE";
pub const ENV_REBUILD_GRAPH: &str = "SYMGRAPH_REBUILD_GRAPH";
pub const ENV_MAX_WORKERS: &str = "SYMGRAPH_MAX_WORKERS";
pub const ENV_BUILD_REFERENCES: &str = "SYMGRAPH_BUILD_REFERENCES";
pub const ENV_BUILD_RELATIONSHIPS: &str = "SYMGRAPH_BUILD_RELATIONSHIPS";
pub const ENV_BUILD_CALLERS: &str = "SYMGRAPH_BUILD_CALLERS";
pub const ENV_RANKABLE_EXCLUDE: &str = "SYMGRAPH_RANKABLE_EXCLUDE";

pub const DEFAULT_INDEX_PATH: &str = "index.scip";
pub const MAX_WORKERS_LIMIT: usize = 256;

/// Which optional passes the graph builder runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    pub build_references: bool,
    pub build_relationships: bool,
    /// Caller/callee edges. Slow: every method's scope is resolved against
    /// source, so this needs an initialized module loader.
    pub build_caller_relationships: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            build_references: true,
            build_relationships: true,
            build_caller_relationships: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    pub index_path: PathBuf,
    pub cache_path: Option<PathBuf>,
    /// When false, a valid cached graph is loaded instead of rebuilding.
    pub rebuild_graph: bool,
    pub max_workers: usize,
    pub build: BuildOptions,
    pub rankable_exclusions: Vec<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            cache_path: None,
            rebuild_graph: true,
            max_workers: default_max_workers(),
            build: BuildOptions::default(),
            rankable_exclusions: DEFAULT_RANKABLE_EXCLUSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl GraphConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source. Unset or malformed
    /// values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| lookup(key).map_or(default, |v| parse_flag(&v, default));

        let index_path = lookup(ENV_INDEX_PATH)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.index_path);
        let cache_path = lookup(ENV_GRAPH_CACHE)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let max_workers = lookup(ENV_MAX_WORKERS)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .map(clamp_workers)
            .unwrap_or(defaults.max_workers);
        let rankable_exclusions = lookup(ENV_RANKABLE_EXCLUDE)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(defaults.rankable_exclusions);

        Self {
            index_path,
            cache_path,
            rebuild_graph: flag(ENV_REBUILD_GRAPH, defaults.rebuild_graph),
            max_workers,
            build: BuildOptions {
                build_references: flag(ENV_BUILD_REFERENCES, defaults.build.build_references),
                build_relationships: flag(
                    ENV_BUILD_RELATIONSHIPS,
                    defaults.build.build_relationships,
                ),
                build_caller_relationships: flag(
                    ENV_BUILD_CALLERS,
                    defaults.build.build_caller_relationships,
                ),
            },
            rankable_exclusions,
        }
    }

    pub fn rankable_filter(&self) -> RankableFilter {
        RankableFilter::new(self.rankable_exclusions.clone())
    }
}

/// Interpret an on/off environment value; anything unrecognized keeps
/// `default`.
pub fn parse_flag(value: &str, default: bool) -> bool {
    let v = value.trim().to_lowercase();
    match v.as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

pub fn clamp_workers(value: usize) -> usize {
    value.clamp(1, MAX_WORKERS_LIMIT)
}

pub fn default_max_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| clamp_workers(n.get()))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = GraphConfig::from_lookup(lookup(&[]));
        assert_eq!(config.index_path, PathBuf::from("index.scip"));
        assert!(config.cache_path.is_none());
        assert!(config.rebuild_graph);
        assert!(config.max_workers >= 1);
        assert_eq!(config.build, BuildOptions::default());
        assert!(!config.build.build_caller_relationships);
        assert_eq!(config.rankable_exclusions, vec!["setup", "stdlib"]);
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = GraphConfig::from_lookup(lookup(&[
            (ENV_INDEX_PATH, " out/index.scip "),
            (ENV_GRAPH_CACHE, "/tmp/graph.db"),
            (ENV_REBUILD_GRAPH, "off"),
            (ENV_MAX_WORKERS, "0"),
            (ENV_BUILD_CALLERS, "YES"),
            (ENV_BUILD_REFERENCES, "0"),
            (ENV_RANKABLE_EXCLUDE, "tests, ,migrations"),
        ]));
        assert_eq!(config.index_path, PathBuf::from("out/index.scip"));
        assert_eq!(config.cache_path, Some(PathBuf::from("/tmp/graph.db")));
        assert!(!config.rebuild_graph);
        assert_eq!(config.max_workers, 1);
        assert!(config.build.build_caller_relationships);
        assert!(!config.build.build_references);
        assert!(config.build.build_relationships);
        assert_eq!(config.rankable_exclusions, vec!["tests", "migrations"]);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("On", false));
        assert!(!parse_flag(" false ", true));
        assert!(parse_flag("maybe", true));
        assert!(!parse_flag("", false));
    }

    #[test]
    fn test_malformed_workers_keep_default() {
        let config = GraphConfig::from_lookup(lookup(&[(ENV_MAX_WORKERS, "many")]));
        assert_eq!(config.max_workers, default_max_workers());
        assert_eq!(clamp_workers(10_000), MAX_WORKERS_LIMIT);
    }
}
