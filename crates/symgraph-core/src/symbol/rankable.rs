//! Selection of the symbols ranking algorithms operate over.

use crate::symbol::{Symbol, SymbolKind};

/// URI substrings excluded from ranking unless configured otherwise.
pub const DEFAULT_RANKABLE_EXCLUSIONS: &[&str] = &["setup", "stdlib"];

/// Kinds that can be ranked.
pub const RANKABLE_KINDS: &[SymbolKind] = &[SymbolKind::Class, SymbolKind::Method];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankableFilter {
    pub excluded_substrings: Vec<String>,
}

impl Default for RankableFilter {
    fn default() -> Self {
        Self {
            excluded_substrings: DEFAULT_RANKABLE_EXCLUSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RankableFilter {
    pub fn new(excluded_substrings: Vec<String>) -> Self {
        Self {
            excluded_substrings,
        }
    }

    pub fn is_rankable(&self, symbol: &Symbol) -> bool {
        if self
            .excluded_substrings
            .iter()
            .any(|needle| !needle.is_empty() && symbol.uri().contains(needle.as_str()))
        {
            return false;
        }
        if symbol.is_local() || symbol.is_meta() || symbol.is_parameter() || symbol.is_protobuf() {
            return false;
        }
        is_rankable_kind(symbol.kind())
    }
}

pub fn is_rankable_kind(kind: SymbolKind) -> bool {
    RANKABLE_KINDS.contains(&kind)
}

/// Keep the rankable symbols of `symbols`, preserving their order.
pub fn rankable_symbols(symbols: &[Symbol], filter: &RankableFilter) -> Vec<Symbol> {
    symbols
        .iter()
        .filter(|symbol| filter.is_rankable(symbol))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(uri: &str) -> Symbol {
        Symbol::parse(uri).unwrap()
    }

    #[test]
    fn test_rankable_symbols_filters_non_rankable() {
        let class = sym("scip-python python pkg 1.0 `pkg.mod`/Foo#");
        let method = sym("scip-python python pkg 1.0 `pkg.mod`/Foo#bar().");
        let local = sym("local 3");
        let proto = sym("scip-python python pkg 1.0 `pkg.api_pb2`/Request#");
        let param = sym("scip-python python pkg 1.0 `pkg.mod`/Foo#bar().(x)");
        let meta = sym("scip-python python pkg 1.0 `pkg.mod`/__init__:");
        let value = sym("scip-python python pkg 1.0 `pkg.mod`/CONSTANT.");

        let all = vec![
            class.clone(),
            local,
            method.clone(),
            proto,
            param,
            meta,
            value,
        ];
        let kept = rankable_symbols(&all, &RankableFilter::default());
        assert_eq!(kept, vec![class, method]);
    }

    #[test]
    fn test_name_exclusions() {
        let setup = sym("scip-python python pkg 1.0 `pkg.setup`/Installer#");
        let stdlib = sym("scip-python python python-stdlib 3.11 builtins/str#");
        let filter = RankableFilter::default();
        assert!(!filter.is_rankable(&setup));
        assert!(!filter.is_rankable(&stdlib));

        let permissive = RankableFilter::new(vec![]);
        assert!(permissive.is_rankable(&setup));
        assert!(permissive.is_rankable(&stdlib));
    }
}
