//! Located symbol occurrences and their SCIP role flags.

use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::symbol::Symbol;

/// SCIP `SymbolRole` bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolRoles(u32);

impl SymbolRoles {
    pub const DEFINITION: SymbolRoles = SymbolRoles(0x1);
    pub const IMPORT: SymbolRoles = SymbolRoles(0x2);
    pub const WRITE_ACCESS: SymbolRoles = SymbolRoles(0x4);
    pub const READ_ACCESS: SymbolRoles = SymbolRoles(0x8);
    pub const GENERATED: SymbolRoles = SymbolRoles(0x10);
    pub const TEST: SymbolRoles = SymbolRoles(0x20);
    pub const FORWARD_DEFINITION: SymbolRoles = SymbolRoles(0x40);

    const NAMED: [(&'static str, SymbolRoles); 7] = [
        ("Definition", Self::DEFINITION),
        ("Import", Self::IMPORT),
        ("WriteAccess", Self::WRITE_ACCESS),
        ("ReadAccess", Self::READ_ACCESS),
        ("Generated", Self::GENERATED),
        ("Test", Self::TEST),
        ("ForwardDefinition", Self::FORWARD_DEFINITION),
    ];

    pub fn from_bits(bits: i32) -> Self {
        SymbolRoles(bits as u32)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: SymbolRoles) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn is_definition(self) -> bool {
        self.contains(Self::DEFINITION)
    }

    /// Role name -> flag, in SCIP declaration order.
    pub fn as_map(self) -> IndexMap<&'static str, bool> {
        Self::NAMED
            .iter()
            .map(|(name, role)| (*name, self.contains(*role)))
            .collect()
    }
}

impl std::ops::BitOr for SymbolRoles {
    type Output = SymbolRoles;

    fn bitor(self, rhs: SymbolRoles) -> SymbolRoles {
        SymbolRoles(self.0 | rhs.0)
    }
}

/// An occurrence of a symbol at a line/column inside some file.
///
/// Equality and hashing use `(symbol, line_number, column_number)` only.
/// Two references at the same location with different `roles` therefore
/// collapse into one entry of any set or map keyed on references. Whether
/// that merge is intended deduplication or a latent bug is unresolved; the
/// behavior is kept as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolReference {
    pub symbol: Symbol,
    pub line_number: u32,
    pub column_number: u32,
    pub roles: SymbolRoles,
}

impl SymbolReference {
    pub fn new(symbol: Symbol, line_number: u32, column_number: u32, roles: SymbolRoles) -> Self {
        Self {
            symbol,
            line_number,
            column_number,
            roles,
        }
    }
}

impl PartialEq for SymbolReference {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
            && self.line_number == other.line_number
            && self.column_number == other.column_number
    }
}

impl Eq for SymbolReference {}

impl Hash for SymbolReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
        self.line_number.hash(state);
        self.column_number.hash(state);
    }
}
