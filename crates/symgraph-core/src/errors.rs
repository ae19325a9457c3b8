//! Error types for the symbol graph core library.

use std::fmt;

/// A symbol URI that does not match the SCIP symbol grammar.
///
/// Rendered with a caret pointing at the byte where parsing stopped:
///
/// ```text
///     scip-python python pkg 1.0 foo?
///     -------------------------------^ expected a descriptor suffix
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolParseError {
    pub symbol: String,
    pub index: usize,
    pub message: String,
}

impl SymbolParseError {
    pub fn new(symbol: &str, index: usize, message: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            index,
            message: message.into(),
        }
    }
}

impl fmt::Display for SymbolParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let border = "-".repeat(self.index);
        write!(f, "\n\t{}\n\t{}^ {}", self.symbol, border, self.message)
    }
}

impl std::error::Error for SymbolParseError {}

/// Top-level error enum for the symbol graph core library.
#[derive(Debug, thiserror::Error)]
pub enum SymgraphError {
    #[error("Symbol parse error: {0}")]
    Parse(#[from] SymbolParseError),

    #[error("Graph invariant violated: {0}")]
    Invariant(String),

    #[error("Synchronization error: {0}")]
    Synchronization(String),

    #[error("Already initialized: {0}")]
    AlreadyInitialized(String),

    #[error("Not initialized: {0}")]
    NotInitialized(String),

    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SCIP decode error: {0}")]
    Decode(#[from] protobuf::Error),
}

impl SymgraphError {
    /// Errors scoped to a single symbol or occurrence.
    ///
    /// Build passes and the precompute pool log these and move on; anything
    /// else is propagated to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SymgraphError::Parse(_) | SymgraphError::Resolution(_))
    }
}

pub type SymgraphResult<T> = Result<T, SymgraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_renders_caret() {
        let err = SymbolParseError::new("abc def", 4, "expected a descriptor suffix");
        assert_eq!(
            err.to_string(),
            "\n\tabc def\n\t----^ expected a descriptor suffix"
        );
    }

    #[test]
    fn test_recoverable_classification() {
        let parse: SymgraphError = SymbolParseError::new("x", 0, "empty identifier").into();
        assert!(parse.is_recoverable());
        assert!(SymgraphError::Resolution("missing".into()).is_recoverable());
        assert!(!SymgraphError::Invariant("two files".into()).is_recoverable());
        assert!(!SymgraphError::Synchronization("empty".into()).is_recoverable());
    }
}
