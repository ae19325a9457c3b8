//! Parsed Python modules and symbol-to-node resolution.

use std::fmt;
use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser, Tree};

use crate::errors::{SymgraphError, SymgraphResult};
use crate::models::BoundingBox;
use crate::symbol::{DescriptorSuffix, Symbol, SymbolDescriptor};

const CLASS_DEFINITION: &str = "class_definition";
const FUNCTION_DEFINITION: &str = "function_definition";
const DECORATED_DEFINITION: &str = "decorated_definition";

/// Statements whose children still belong to the enclosing scope.
const TRANSPARENT_BLOCKS: &[&str] = &[
    "block",
    "if_statement",
    "elif_clause",
    "else_clause",
    "try_statement",
    "except_clause",
    "finally_clause",
    "with_statement",
    "for_statement",
    "while_statement",
];

/// A Python source file together with its tree-sitter syntax tree.
pub struct ParsedModule {
    pub dotpath: String,
    pub path: Option<PathBuf>,
    pub source: String,
    pub tree: Tree,
}

impl fmt::Debug for ParsedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedModule")
            .field("dotpath", &self.dotpath)
            .field("path", &self.path)
            .field("bytes", &self.source.len())
            .finish()
    }
}

impl ParsedModule {
    pub fn parse(
        dotpath: impl Into<String>,
        path: Option<PathBuf>,
        source: String,
    ) -> SymgraphResult<Self> {
        let dotpath = dotpath.into();
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| SymgraphError::Resolution(format!("python grammar unavailable: {e}")))?;
        let tree = parser
            .parse(source.as_bytes(), None)
            .ok_or_else(|| SymgraphError::Resolution(format!("failed to parse module {dotpath}")))?;
        Ok(Self {
            dotpath,
            path,
            source,
            tree,
        })
    }

    pub fn from_file(dotpath: impl Into<String>, path: &Path) -> SymgraphResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(dotpath, Some(path.to_path_buf()), source)
    }

    /// Locate the definition node of `symbol` inside this module.
    ///
    /// Walks the descriptors after the module descriptor. Types and methods
    /// resolve to class and function definitions, terms to a definition or
    /// an assignment. Decorators are not part of the returned node. A symbol
    /// naming the module itself resolves to the root node.
    pub fn definition_node(&self, symbol: &Symbol) -> SymgraphResult<Node<'_>> {
        let mut node = self.tree.root_node();
        for descriptor in symbol.descriptors().iter().skip(1) {
            node = self.resolve_descriptor(node, descriptor)?.ok_or_else(|| {
                SymgraphError::Resolution(format!(
                    "no definition for `{}` of {} in module {}",
                    descriptor.name, symbol, self.dotpath
                ))
            })?;
        }
        Ok(node)
    }

    fn resolve_descriptor<'a>(
        &'a self,
        scope: Node<'a>,
        descriptor: &SymbolDescriptor,
    ) -> SymgraphResult<Option<Node<'a>>> {
        let Some(body) = scope_body(scope) else {
            return Ok(None);
        };
        let name = descriptor.name.as_str();
        let found = match descriptor.suffix {
            DescriptorSuffix::Type => {
                self.find_in_scope(body, &|n| self.is_named(n, CLASS_DEFINITION, name))
            }
            DescriptorSuffix::Method => {
                self.find_in_scope(body, &|n| self.is_named(n, FUNCTION_DEFINITION, name))
            }
            DescriptorSuffix::Term => self
                .find_in_scope(body, &|n| {
                    self.is_named(n, FUNCTION_DEFINITION, name)
                        || self.is_named(n, CLASS_DEFINITION, name)
                })
                .or_else(|| self.find_in_scope(body, &|n| self.is_assignment_to(n, name))),
            other => {
                return Err(SymgraphError::Resolution(format!(
                    "cannot resolve {other:?} descriptor `{name}` to source"
                )))
            }
        };
        Ok(found)
    }

    fn find_in_scope<'a>(
        &self,
        scope: Node<'a>,
        matches: &dyn Fn(Node<'a>) -> bool,
    ) -> Option<Node<'a>> {
        let mut cursor = scope.walk();
        for child in scope.named_children(&mut cursor) {
            let candidate = if child.kind() == DECORATED_DEFINITION {
                child.child_by_field_name("definition").unwrap_or(child)
            } else {
                child
            };
            if matches(candidate) {
                return Some(candidate);
            }
            if TRANSPARENT_BLOCKS.contains(&child.kind()) {
                if let Some(found) = self.find_in_scope(child, matches) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn is_named(&self, node: Node<'_>, kind: &str, name: &str) -> bool {
        node.kind() == kind
            && node
                .child_by_field_name("name")
                .and_then(|n| n.utf8_text(self.source.as_bytes()).ok())
                == Some(name)
    }

    fn is_assignment_to(&self, node: Node<'_>, name: &str) -> bool {
        if node.kind() != "expression_statement" {
            return false;
        }
        let Some(assignment) = node.named_child(0).filter(|n| n.kind() == "assignment") else {
            return false;
        };
        assignment
            .child_by_field_name("left")
            .and_then(|n| n.utf8_text(self.source.as_bytes()).ok())
            == Some(name)
    }

    pub fn bounding_box(&self, symbol: &Symbol) -> SymgraphResult<BoundingBox> {
        let node = self.definition_node(symbol)?;
        let start = node.start_position();
        let end = node.end_position();
        Ok(BoundingBox {
            start_line: start.row as u32,
            start_column: start.column as u32,
            end_line: end.row as u32,
            end_column: end.column as u32,
        })
    }

    /// Source text of `symbol`'s definition.
    pub fn source_text(&self, symbol: &Symbol) -> SymgraphResult<&str> {
        let node = self.definition_node(symbol)?;
        node.utf8_text(self.source.as_bytes())
            .map_err(|e| SymgraphError::Resolution(format!("non-utf8 source for {symbol}: {e}")))
    }
}

/// The node whose children are the members of `scope`.
fn scope_body(scope: Node<'_>) -> Option<Node<'_>> {
    match scope.kind() {
        CLASS_DEFINITION | FUNCTION_DEFINITION => scope.child_by_field_name("body"),
        _ => Some(scope),
    }
}
