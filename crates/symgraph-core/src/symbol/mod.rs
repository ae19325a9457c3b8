//! Typed symbol model for SCIP symbol URIs.
//!
//! A [`Symbol`] is an immutable value identified by its URI string. Equality
//! and hashing go through the URI only, so a `HashMap<Symbol, _>` can be
//! queried with a plain `&str`.

pub mod parser;
pub mod rankable;
pub mod reference;

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::SymbolParseError;

pub use parser::parse_symbol;
pub use rankable::{rankable_symbols, RankableFilter};
pub use reference::{SymbolReference, SymbolRoles};

/// Scheme used by SCIP for document-local symbols.
pub const LOCAL_SCHEME: &str = "local";

// ---------------------------------------------------------------------------
// Descriptor suffixes and kinds
// ---------------------------------------------------------------------------

/// The suffix marker that terminates a descriptor in a symbol URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorSuffix {
    Local,
    Namespace,
    Type,
    Term,
    Meta,
    Method,
    Parameter,
    TypeParameter,
    Macro,
}

/// Language-level classification of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Local,
    Module,
    Class,
    Method,
    Value,
    Meta,
    Macro,
    Parameter,
    TypeParameter,
}

impl DescriptorSuffix {
    pub fn kind(self) -> SymbolKind {
        match self {
            DescriptorSuffix::Local => SymbolKind::Local,
            DescriptorSuffix::Namespace => SymbolKind::Module,
            DescriptorSuffix::Type => SymbolKind::Class,
            DescriptorSuffix::Term => SymbolKind::Value,
            DescriptorSuffix::Meta => SymbolKind::Meta,
            DescriptorSuffix::Method => SymbolKind::Method,
            DescriptorSuffix::Parameter => SymbolKind::Parameter,
            DescriptorSuffix::TypeParameter => SymbolKind::TypeParameter,
            DescriptorSuffix::Macro => SymbolKind::Macro,
        }
    }
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Local => "Local",
            SymbolKind::Module => "Module",
            SymbolKind::Class => "Class",
            SymbolKind::Method => "Method",
            SymbolKind::Value => "Value",
            SymbolKind::Meta => "Meta",
            SymbolKind::Macro => "Macro",
            SymbolKind::Parameter => "Parameter",
            SymbolKind::TypeParameter => "TypeParameter",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SymbolDescriptor
// ---------------------------------------------------------------------------

/// One path segment of a symbol (module, class, method, parameter, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolDescriptor {
    pub name: String,
    pub suffix: DescriptorSuffix,
    /// Overload disambiguator, only ever set on methods.
    pub disambiguator: Option<String>,
}

impl SymbolDescriptor {
    pub fn new(name: impl Into<String>, suffix: DescriptorSuffix) -> Self {
        Self {
            name: name.into(),
            suffix,
            disambiguator: None,
        }
    }

    pub fn method(name: impl Into<String>, disambiguator: Option<String>) -> Self {
        Self {
            name: name.into(),
            suffix: DescriptorSuffix::Method,
            disambiguator: disambiguator.filter(|d| !d.is_empty()),
        }
    }

    pub fn kind(&self) -> SymbolKind {
        self.suffix.kind()
    }

    /// Format the descriptor back into URI syntax.
    pub fn unparse(&self) -> String {
        let name = parser::escape_descriptor_name(&self.name);
        match self.suffix {
            DescriptorSuffix::Local => self.name.clone(),
            DescriptorSuffix::Namespace => format!("{name}/"),
            DescriptorSuffix::Type => format!("{name}#"),
            DescriptorSuffix::Term => format!("{name}."),
            DescriptorSuffix::Meta => format!("{name}:"),
            DescriptorSuffix::Macro => format!("{name}!"),
            DescriptorSuffix::Method => {
                // An empty method name would read back as a parameter.
                let name = if self.name.is_empty() {
                    "``".into()
                } else {
                    name
                };
                let disambiguator = self
                    .disambiguator
                    .as_deref()
                    .map(parser::escape_descriptor_name)
                    .unwrap_or_default();
                format!("{name}({disambiguator}).")
            }
            DescriptorSuffix::Parameter => format!("({name})"),
            DescriptorSuffix::TypeParameter => format!("[{name}]"),
        }
    }
}

// ---------------------------------------------------------------------------
// SymbolPackage
// ---------------------------------------------------------------------------

/// Package triple of a symbol. Empty fields stand for the `.` placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SymbolPackage {
    pub manager: String,
    pub name: String,
    pub version: String,
}

impl SymbolPackage {
    pub fn new(
        manager: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            manager: manager.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// URI form of the package, with `.` for empty fields and spaces escaped.
    pub fn unparse(&self) -> String {
        [&self.manager, &self.name, &self.version]
            .iter()
            .map(|field| {
                if field.is_empty() {
                    ".".to_string()
                } else {
                    parser::escape_space_identifier(field)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for SymbolPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.manager, self.name, self.version)
    }
}

// ---------------------------------------------------------------------------
// Symbol
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SymbolData {
    uri: String,
    scheme: String,
    package: SymbolPackage,
    descriptors: Vec<SymbolDescriptor>,
    full_dotpath: String,
}

/// A parsed SCIP symbol. Cheap to clone.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(Arc<SymbolData>);

impl Symbol {
    /// Parse a symbol URI.
    pub fn parse(uri: &str) -> Result<Self, SymbolParseError> {
        parse_symbol(uri)
    }

    /// Assemble a symbol from already-parsed parts. `descriptors` must not be
    /// empty.
    pub(crate) fn from_parts(
        uri: String,
        scheme: String,
        package: SymbolPackage,
        descriptors: Vec<SymbolDescriptor>,
    ) -> Self {
        debug_assert!(!descriptors.is_empty());
        let full_dotpath = descriptors
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(".");
        Symbol(Arc::new(SymbolData {
            uri,
            scheme,
            package,
            descriptors,
            full_dotpath,
        }))
    }

    pub fn uri(&self) -> &str {
        &self.0.uri
    }

    pub fn scheme(&self) -> &str {
        &self.0.scheme
    }

    pub fn package(&self) -> &SymbolPackage {
        &self.0.package
    }

    pub fn descriptors(&self) -> &[SymbolDescriptor] {
        &self.0.descriptors
    }

    fn last_descriptor(&self) -> &SymbolDescriptor {
        // Non-empty by construction.
        &self.0.descriptors[self.0.descriptors.len() - 1]
    }

    /// Name of the innermost descriptor.
    pub fn name(&self) -> &str {
        &self.last_descriptor().name
    }

    /// Classification derived from the last descriptor's suffix.
    pub fn kind(&self) -> SymbolKind {
        self.last_descriptor().kind()
    }

    /// Dot-joined descriptor names, e.g. `pkg.mod.Foo.bar`.
    pub fn full_dotpath(&self) -> &str {
        &self.0.full_dotpath
    }

    /// Name of the first descriptor (the module for scip-python symbols).
    pub fn module_path(&self) -> &str {
        &self.0.descriptors[0].name
    }

    pub fn is_local(&self) -> bool {
        self.0.scheme == LOCAL_SCHEME || self.0.descriptors[0].suffix == DescriptorSuffix::Local
    }

    pub fn is_meta(&self) -> bool {
        self.last_descriptor().suffix == DescriptorSuffix::Meta
    }

    pub fn is_parameter(&self) -> bool {
        self.last_descriptor().suffix == DescriptorSuffix::Parameter
    }

    /// Generated protobuf modules (`*_pb2`).
    pub fn is_protobuf(&self) -> bool {
        self.module_path().ends_with("pb2")
    }

    /// The enclosing symbol, or `None` for single-descriptor symbols.
    pub fn parent(&self) -> Option<Symbol> {
        let descriptors = self.descriptors();
        if descriptors.len() < 2 || self.is_local() {
            return None;
        }
        let parent_descriptors = descriptors[..descriptors.len() - 1].to_vec();
        let uri = format_uri(self.scheme(), self.package(), &parent_descriptors);
        Some(Symbol::from_parts(
            uri,
            self.scheme().to_string(),
            self.package().clone(),
            parent_descriptors,
        ))
    }

    /// Re-format the symbol from its parsed parts.
    ///
    /// For every URI the parser accepts from canonical SCIP output this is
    /// identical to [`Symbol::uri`].
    pub fn unparse(&self) -> String {
        format_uri(self.scheme(), self.package(), self.descriptors())
    }
}

fn format_uri(scheme: &str, package: &SymbolPackage, descriptors: &[SymbolDescriptor]) -> String {
    if scheme == LOCAL_SCHEME {
        let name = descriptors.first().map(|d| d.name.as_str()).unwrap_or("");
        return format!("{LOCAL_SCHEME} {name}");
    }
    let mut uri = format!(
        "{} {} ",
        parser::escape_space_identifier(scheme),
        package.unparse()
    );
    for descriptor in descriptors {
        uri.push_str(&descriptor.unparse());
    }
    uri
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.0.uri == other.0.uri
    }
}

impl Eq for Symbol {}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        self.0.uri == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.0.uri == *other
    }
}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.uri.as_str().hash(state);
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0.uri
    }
}

/// Symbols sort by `full_dotpath`, ties broken by URI so the order stays
/// total and agrees with `Eq`.
impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.full_dotpath()
            .cmp(other.full_dotpath())
            .then_with(|| self.uri().cmp(other.uri()))
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.uri())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolParseError;

    fn try_from(uri: String) -> Result<Self, Self::Error> {
        parse_symbol(&uri)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> String {
        symbol.uri().to_string()
    }
}

/// Sort symbols into the canonical `full_dotpath` order used by every
/// consumer of the supported-symbol list.
pub fn sort_symbols(symbols: &mut [Symbol]) {
    symbols.sort();
}
