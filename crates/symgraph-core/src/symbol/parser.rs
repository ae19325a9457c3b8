//! Cursor-based parser for the SCIP symbol grammar.
//!
//! ```text
//! <symbol>     ::= 'local ' <id> | <scheme> ' ' <package> ' ' <descriptor>+
//! <package>    ::= <manager> ' ' <name> ' ' <version>
//! <descriptor> ::= <name> '/' | <name> '#' | <name> '.' | <name> ':' | <name> '!'
//!                | <name> '(' <disambiguator>? ').' | '(' <name> ')' | '[' <name> ']'
//! ```
//!
//! Scheme and package fields are space-escaped (`"  "` is a literal space);
//! descriptor names outside `[A-Za-z0-9_+\-$]` are wrapped in backticks with
//! doubled backticks inside.

use crate::errors::SymbolParseError;
use crate::symbol::{DescriptorSuffix, Symbol, SymbolDescriptor, SymbolPackage, LOCAL_SCHEME};

struct SymbolParser<'a> {
    symbol: &'a str,
    chars: Vec<char>,
    index: usize,
}

type ParseResult<T> = Result<T, SymbolParseError>;

impl<'a> SymbolParser<'a> {
    fn new(symbol: &'a str) -> Self {
        Self {
            symbol,
            chars: symbol.chars().collect(),
            index: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> SymbolParseError {
        SymbolParseError::new(self.symbol, self.index, message)
    }

    fn at_end(&self) -> bool {
        self.index >= self.chars.len()
    }

    fn current(&self, what: &str) -> ParseResult<char> {
        self.chars
            .get(self.index)
            .copied()
            .ok_or_else(|| self.error(format!("reached end of symbol while parsing <{what}>")))
    }

    fn rest(&self) -> String {
        self.chars[self.index.min(self.chars.len())..].iter().collect()
    }

    fn parse_descriptors(&mut self) -> ParseResult<Vec<SymbolDescriptor>> {
        let mut descriptors = Vec::new();
        while !self.at_end() {
            descriptors.push(self.parse_descriptor()?);
        }
        if descriptors.is_empty() {
            return Err(self.error("expected at least one descriptor"));
        }
        Ok(descriptors)
    }

    fn parse_descriptor(&mut self) -> ParseResult<SymbolDescriptor> {
        match self.current("descriptor")? {
            '(' => {
                self.index += 1;
                let name = self.accept_identifier("parameter name")?;
                if name.is_empty() {
                    return Err(self.error("empty parameter name"));
                }
                self.accept_character(')', "closing parameter name")?;
                Ok(SymbolDescriptor::new(name, DescriptorSuffix::Parameter))
            }
            '[' => {
                self.index += 1;
                let name = self.accept_identifier("type parameter name")?;
                if name.is_empty() {
                    return Err(self.error("empty type parameter name"));
                }
                self.accept_character(']', "closing type parameter name")?;
                Ok(SymbolDescriptor::new(name, DescriptorSuffix::TypeParameter))
            }
            _ => {
                let name = self.accept_identifier("descriptor name")?;
                let suffix = self.current("descriptor suffix")?;
                self.index += 1;
                let suffix = match suffix {
                    '(' => {
                        let disambiguator = if self.current("method disambiguator")? != ')' {
                            Some(self.accept_identifier("method disambiguator")?)
                        } else {
                            None
                        };
                        self.accept_character(')', "closing method")?;
                        self.accept_character('.', "closing method")?;
                        return Ok(SymbolDescriptor::method(name, disambiguator));
                    }
                    '/' => DescriptorSuffix::Namespace,
                    '.' => DescriptorSuffix::Term,
                    '#' => DescriptorSuffix::Type,
                    ':' => DescriptorSuffix::Meta,
                    '!' => DescriptorSuffix::Macro,
                    other => {
                        self.index -= 1;
                        return Err(
                            self.error(format!("expected a descriptor suffix, obtained '{other}'"))
                        );
                    }
                };
                Ok(SymbolDescriptor::new(name, suffix))
            }
        }
    }

    /// Plain identifiers may be empty; callers decide whether that is legal.
    fn accept_identifier(&mut self, what: &str) -> ParseResult<String> {
        if self.current(what)? == '`' {
            self.index += 1;
            return self.accept_escaped_identifier(what, '`');
        }
        let start = self.index;
        while !self.at_end() && is_identifier_character(self.chars[self.index]) {
            self.index += 1;
        }
        Ok(self.chars[start..self.index].iter().collect())
    }

    fn accept_space_escaped_identifier(&mut self, what: &str) -> ParseResult<String> {
        self.accept_escaped_identifier(what, ' ')
    }

    fn accept_escaped_identifier(&mut self, what: &str, escape: char) -> ParseResult<String> {
        let mut builder = String::new();
        while !self.at_end() {
            let ch = self.chars[self.index];
            if ch == escape {
                self.index += 1;
                if self.at_end() {
                    break;
                }
                if self.chars[self.index] == escape {
                    builder.push(escape);
                } else {
                    return Ok(builder);
                }
            } else {
                builder.push(ch);
            }
            self.index += 1;
        }
        Err(self.error(format!(
            "reached end of symbol while parsing <{what}>, expected a '{escape}' character"
        )))
    }

    fn accept_character(&mut self, expected: char, what: &str) -> ParseResult<()> {
        let found = self.current(what)?;
        if found == expected {
            self.index += 1;
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{expected}', obtained '{found}', while parsing {what}"
            )))
        }
    }
}

fn is_identifier_character(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '+' | '$' | '_')
}

/// `.` is the placeholder for an empty package field.
fn normalize_package_field(field: String) -> String {
    if field == "." {
        String::new()
    } else {
        field
    }
}

/// Parse a SCIP symbol URI into a [`Symbol`].
pub fn parse_symbol(uri: &str) -> Result<Symbol, SymbolParseError> {
    let mut parser = SymbolParser::new(uri);
    let scheme = parser.accept_space_escaped_identifier("scheme")?;

    if scheme == LOCAL_SCHEME {
        let name = parser.rest();
        if name.is_empty() {
            return Err(parser.error("empty local symbol name"));
        }
        return Ok(Symbol::from_parts(
            uri.to_string(),
            scheme,
            SymbolPackage::default(),
            vec![SymbolDescriptor::new(name, DescriptorSuffix::Local)],
        ));
    }

    let manager = normalize_package_field(parser.accept_space_escaped_identifier("package manager")?);
    let name = normalize_package_field(parser.accept_space_escaped_identifier("package name")?);
    let version = normalize_package_field(parser.accept_space_escaped_identifier("package version")?);
    let descriptors = parser.parse_descriptors()?;

    Ok(Symbol::from_parts(
        uri.to_string(),
        scheme,
        SymbolPackage::new(manager, name, version),
        descriptors,
    ))
}

/// Escape a descriptor name with backticks when it is not a plain identifier.
pub fn escape_descriptor_name(name: &str) -> String {
    if name.is_empty() || name.chars().all(is_identifier_character) {
        return name.to_string();
    }
    format!("`{}`", name.replace('`', "``"))
}

/// Double every space so the value reads back as one space-delimited field.
pub fn escape_space_identifier(value: &str) -> String {
    value.replace(' ', "  ")
}
