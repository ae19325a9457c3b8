//! Node and edge payloads of the symbol graph.
//!
//! Every edge carries a [`GraphEdge`] whose variant is its label, so the
//! fields a label requires are always present.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{SymgraphError, SymgraphResult};
use crate::symbol::{Symbol, SymbolReference, SymbolRoles};

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphNode {
    /// A symbol. `declared` is set once a document lists the symbol among its
    /// declarations; only declared symbols are "supported".
    Symbol { symbol: Symbol, declared: bool },
    /// A document, keyed by its index-relative path.
    File(String),
}

impl GraphNode {
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            GraphNode::Symbol { symbol, .. } => Some(symbol),
            GraphNode::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&str> {
        match self {
            GraphNode::File(path) => Some(path),
            GraphNode::Symbol { .. } => None,
        }
    }

    pub fn is_declared_symbol(&self) -> bool {
        matches!(self, GraphNode::Symbol { declared: true, .. })
    }
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeLabel {
    Contains,
    Reference,
    Relationship,
    Caller,
    Callee,
}

impl EdgeLabel {
    pub const ALL: [EdgeLabel; 5] = [
        EdgeLabel::Contains,
        EdgeLabel::Reference,
        EdgeLabel::Relationship,
        EdgeLabel::Caller,
        EdgeLabel::Callee,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeLabel::Contains => "contains",
            EdgeLabel::Reference => "reference",
            EdgeLabel::Relationship => "relationship",
            EdgeLabel::Caller => "caller",
            EdgeLabel::Callee => "callee",
        }
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeLabel {
    type Err = SymgraphError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        EdgeLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == value)
            .ok_or_else(|| SymgraphError::Cache(format!("unknown edge label: {value}")))
    }
}

/// Relationship flags copied from a SCIP `Relationship`, minus its symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipMeta {
    pub is_reference: bool,
    pub is_implementation: bool,
    pub is_type_definition: bool,
    pub is_definition: bool,
}

/// Location of an in-scope reference that produced a caller/callee pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub line_number: u32,
    pub column_number: u32,
    pub roles: SymbolRoles,
}

impl CallSite {
    pub fn from_reference(reference: &SymbolReference) -> Self {
        Self {
            line_number: reference.line_number,
            column_number: reference.column_number,
            roles: reference.roles,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphEdge {
    /// file -> symbol
    Contains,
    /// symbol -> file
    Reference(SymbolReference),
    /// symbol -> related symbol
    Relationship(RelationshipMeta),
    /// callee -> caller
    Caller(CallSite),
    /// caller -> callee
    Callee(CallSite),
}

impl GraphEdge {
    pub fn label(&self) -> EdgeLabel {
        match self {
            GraphEdge::Contains => EdgeLabel::Contains,
            GraphEdge::Reference(_) => EdgeLabel::Reference,
            GraphEdge::Relationship(_) => EdgeLabel::Relationship,
            GraphEdge::Caller(_) => EdgeLabel::Caller,
            GraphEdge::Callee(_) => EdgeLabel::Callee,
        }
    }

    /// JSON payload for persistence; `None` for payload-free labels.
    pub fn payload_json(&self) -> SymgraphResult<Option<String>> {
        let payload = match self {
            GraphEdge::Contains => None,
            GraphEdge::Reference(reference) => Some(serde_json::to_string(reference)?),
            GraphEdge::Relationship(meta) => Some(serde_json::to_string(meta)?),
            GraphEdge::Caller(site) | GraphEdge::Callee(site) => Some(serde_json::to_string(site)?),
        };
        Ok(payload)
    }

    /// Inverse of [`GraphEdge::label`] plus [`GraphEdge::payload_json`].
    pub fn from_stored(label: EdgeLabel, payload: Option<&str>) -> SymgraphResult<Self> {
        let require =
            || payload.ok_or_else(|| SymgraphError::Cache(format!("missing payload for {label} edge")));
        Ok(match label {
            EdgeLabel::Contains => GraphEdge::Contains,
            EdgeLabel::Reference => GraphEdge::Reference(serde_json::from_str(require()?)?),
            EdgeLabel::Relationship => {
                GraphEdge::Relationship(serde_json::from_str(require()?)?)
            }
            EdgeLabel::Caller => GraphEdge::Caller(serde_json::from_str(require()?)?),
            EdgeLabel::Callee => GraphEdge::Callee(serde_json::from_str(require()?)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Bounding boxes
// ---------------------------------------------------------------------------

/// Source span of a symbol's definition. Lines and columns are 0-based, the
/// same convention as SCIP occurrence ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl BoundingBox {
    /// Whether a position falls inside the span. Only the start is column
    /// sensitive; the end is bounded by line.
    pub fn contains(&self, line: u32, column: u32) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        line > self.start_line || column >= self.start_column
    }
}
