//! XML Attribute Parsing
//!
//! Parses the raw attribute string a `TagOpen` token carries. Parsing is
//! deferred to the caller so tokens that never need attributes never pay for
//! it.

use super::scanner::{is_whitespace_char, Scanner};
use std::collections::HashMap;
use thiserror::Error;

/// Attribute name → verbatim value, both borrowed from the raw string
///
/// Entities in values are not expanded; run them through
/// [`parse_entities`](super::entities::parse_entities) when needed.
pub type Attributes<'a> = HashMap<&'a str, &'a str>;

/// Reasons an attribute string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("Expected a value for attribute {name}")]
    MissingValue { name: String },
    #[error("Invalid attribute name: {name}")]
    InvalidName { name: String },
    #[error("Attribute values should be quoted: {name}")]
    UnquotedValue { name: String },
    #[error("Unclosed attribute value: {name}")]
    UnclosedValue { name: String },
}

impl AttributeError {
    /// Stable snake_case identifier, used as the error atom by host bindings
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeError::MissingValue { .. } => "missing_value",
            AttributeError::InvalidName { .. } => "invalid_name",
            AttributeError::UnquotedValue { .. } => "unquoted_value",
            AttributeError::UnclosedValue { .. } => "unclosed_value",
        }
    }
}

/// Parse attributes from raw tag content (after the element name)
///
/// Input should be the content between element name and '>' or '/>'.
/// Surrounding whitespace is ignored. A duplicated name keeps its last value.
pub fn parse_attrs(input: &str) -> Result<Attributes<'_>, AttributeError> {
    let mut attrs = Attributes::new();
    let mut scanner = Scanner::new(input);

    loop {
        scanner.skip_whitespace();
        if scanner.is_eof() {
            break;
        }

        // A name runs to the first '=', whitespace or end of input
        let name_start = scanner.position();
        let name_end = scanner
            .remaining()
            .find(|c: char| c == '=' || is_whitespace_char(c))
            .map_or(input.len(), |i| name_start + i);
        let name = scanner.slice(name_start, name_end);

        let eq = match scanner.byte_at(name_end) {
            Some(b'=') => name_end,
            None => {
                return Err(AttributeError::MissingValue {
                    name: name.to_string(),
                })
            }
            Some(_) => {
                // Whitespace after a name: either trailing, or a second
                // token follows with no '=' in between
                scanner.set_position(name_end);
                scanner.skip_whitespace();
                return Err(if scanner.is_eof() {
                    AttributeError::MissingValue {
                        name: name.to_string(),
                    }
                } else {
                    AttributeError::InvalidName {
                        name: name.to_string(),
                    }
                });
            }
        };

        if name.is_empty() {
            return Err(AttributeError::InvalidName { name: String::new() });
        }

        let value_start = eq + 1;
        let quote = match scanner.byte_at(value_start) {
            Some(q @ (b'"' | b'\'')) => q,
            _ => {
                return Err(AttributeError::UnquotedValue {
                    name: name.to_string(),
                })
            }
        };

        // Only the opening quote character can close the value
        let Some(value_end) = scanner.find_byte_from(value_start + 1, quote) else {
            return Err(AttributeError::UnclosedValue {
                name: name.to_string(),
            });
        };

        attrs.insert(name, scanner.slice(value_start + 1, value_end));
        scanner.set_position(value_end + 1);
    }

    Ok(attrs)
}
