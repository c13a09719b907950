//! Identifier handling utilities for SQL Server object names.
//!
//! Names handed to the engine may arrive delimiter-quoted (`[Sales]` or
//! `"Sales"`). Catalog lookups need the bare name, and generated DDL needs
//! names re-quoted with brackets.
//!
//! # Examples
//!
//! ```
//! use sql_unbind::identifier::{normalize_identifier, quote_identifier};
//!
//! assert_eq!(normalize_identifier("[Orders]"), "Orders");
//! assert_eq!(normalize_identifier("\"Orders\""), "Orders");
//! assert_eq!(quote_identifier("Order]Lines"), "[Order]]Lines]");
//! ```

/// Strips one layer of bracket `[]` or double quote `""` delimiters.
///
/// Escaped closing delimiters inside the name (`]]`, `""`) are unescaped.
/// Unquoted names are only trimmed.
pub fn normalize_identifier(ident: &str) -> String {
    let trimmed = ident.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('[') && trimmed.ends_with(']') {
        trimmed[1..trimmed.len() - 1].replace("]]", "]")
    } else if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].replace("\"\"", "\"")
    } else {
        trimmed.to_string()
    }
}

/// Wraps a bare identifier in brackets, escaping any `]` it contains.
pub fn quote_identifier(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

/// Formats a bare two-part name as `[schema].[name]`.
pub fn qualified_name(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(name))
}

/// Splits a possibly quoted multi-part name on the periods that sit outside
/// delimiters, returning each part still in its original (quoted) form.
pub fn split_name_parts(name: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut closing: Option<char> = None;
    let mut chars = name.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match closing {
            Some(close) if c == close => {
                // A doubled closing delimiter is an escape, not the end
                if chars.peek().map(|&(_, next)| next) == Some(close) {
                    chars.next();
                } else {
                    closing = None;
                }
            }
            Some(_) => {}
            None => match c {
                '[' => closing = Some(']'),
                '"' => closing = Some('"'),
                '.' => {
                    parts.push(&name[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&name[start..]);
    parts
}

/// Splits `[schema].[name]` into bare `(schema, name)`.
///
/// A one-part name is placed in `default_schema`. Returns `None` when the
/// name has more than two parts or an empty part.
pub fn split_qualified_name(name: &str, default_schema: &str) -> Option<(String, String)> {
    let parts = split_name_parts(name.trim());
    let (schema, object) = match parts.as_slice() {
        [object] => (default_schema.to_string(), normalize_identifier(object)),
        [schema, object] => (normalize_identifier(schema), normalize_identifier(object)),
        _ => return None,
    };
    if schema.is_empty() || object.is_empty() {
        return None;
    }
    Some((schema, object))
}
