//! Definition rewriting: `CREATE` → `ALTER` and SCHEMABINDING removal
//!
//! Only the first occurrence of each marker is touched. Occurrences are
//! located on the T-SQL token stream, so text inside comments, string
//! literals and bracketed identifiers is never matched. Every byte outside
//! the substituted range is preserved.
//!
//! If the definition cannot be tokenized (e.g. an unterminated comment), a
//! plain case-insensitive search is used instead.
//!
//! ```
//! use sql_unbind::rewrite::rewrite_definition;
//!
//! let out = rewrite_definition("CREATE VIEW dbo.v WITH SCHEMABINDING AS SELECT 1 AS x");
//! assert_eq!(out.text, "ALTER VIEW dbo.v  AS SELECT 1 AS x");
//! ```

mod dialect;
mod scanner;

use std::sync::LazyLock;

use regex::Regex;

use crate::util::{contains_ci, splice};

pub use dialect::TsqlDialect;
pub use scanner::{ScannedToken, TokenScanner};

// =============================================================================
// Plain-text fallback patterns
// =============================================================================

/// CREATE keyword, optionally followed by OR ALTER
static CREATE_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bCREATE\b(?:\s+OR\s+ALTER\b)?").unwrap());

/// `WITH SCHEMABINDING[,]` or `, SCHEMABINDING`
static SCHEMABINDING_CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<with>\bWITH\s+)SCHEMABINDING\b(?P<more>\s*,\s*)?|,\s*SCHEMABINDING\b")
        .unwrap()
});

const SCHEMABINDING: &str = "SCHEMABINDING";

/// Result of rewriting one module definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenDefinition {
    pub text: String,
    /// A CREATE header was found and turned into ALTER
    pub create_replaced: bool,
    /// A SCHEMABINDING option was found and removed
    pub binding_removed: bool,
}

/// Check whether a definition still carries the SCHEMABINDING option.
pub fn has_schema_binding(definition: &str) -> bool {
    match TokenScanner::new(definition) {
        Some(scanner) => scanner.find_word(SCHEMABINDING).is_some(),
        None => contains_ci(definition, SCHEMABINDING),
    }
}

/// Turn a module's CREATE definition into an ALTER without SCHEMABINDING.
pub fn rewrite_definition(definition: &str) -> RewrittenDefinition {
    let (altered, create_replaced) = match replace_create_keyword(definition) {
        Some(text) => (text, true),
        None => (definition.to_string(), false),
    };
    let (text, binding_removed) = match remove_schema_binding(&altered) {
        Some(text) => (text, true),
        None => (altered, false),
    };

    RewrittenDefinition {
        text,
        create_replaced,
        binding_removed,
    }
}

/// Replace the first CREATE (or CREATE OR ALTER) header with ALTER.
///
/// Returns `None` if the definition has no CREATE keyword.
pub fn replace_create_keyword(definition: &str) -> Option<String> {
    if let Some(scanner) = TokenScanner::new(definition) {
        let create = scanner.find_word("CREATE")?;
        let start = scanner.get(create)?.start;
        let mut end = scanner.get(create)?.end;

        // CREATE OR ALTER collapses to a single ALTER
        if let Some(or) = scanner.next_significant(create).filter(|&i| scanner.is_word(i, "OR")) {
            if let Some(alter) = scanner
                .next_significant(or)
                .filter(|&i| scanner.is_word(i, "ALTER"))
            {
                end = scanner.get(alter)?.end;
            }
        }
        return Some(splice(definition, start, end, "ALTER"));
    }

    let found = CREATE_HEADER_RE.find(definition)?;
    Some(splice(definition, found.start(), found.end(), "ALTER"))
}

/// Remove the first SCHEMABINDING option from a module definition.
///
/// `WITH SCHEMABINDING` disappears entirely; inside an option list only the
/// SCHEMABINDING item and its separating comma go, keeping the other options.
/// Returns `None` if the definition has no SCHEMABINDING option.
pub fn remove_schema_binding(definition: &str) -> Option<String> {
    if let Some(scanner) = TokenScanner::new(definition) {
        let (start, end) = schema_binding_range(&scanner)?;
        return Some(splice(definition, start, end, ""));
    }

    let caps = SCHEMABINDING_CLAUSE_RE.captures(definition)?;
    let whole = caps.get(0)?;
    let replacement = match (caps.name("with"), caps.name("more")) {
        (Some(with), Some(_)) => with.as_str(),
        _ => "",
    };
    Some(splice(definition, whole.start(), whole.end(), replacement))
}

/// Byte range to delete for the first SCHEMABINDING token.
fn schema_binding_range(scanner: &TokenScanner) -> Option<(usize, usize)> {
    let binding = scanner.find_word(SCHEMABINDING)?;
    let binding_token = scanner.get(binding)?;
    let prev = scanner.prev_significant(binding);
    let next = scanner.next_significant(binding);

    match prev {
        Some(with) if scanner.is_word(with, "WITH") => match next {
            // WITH SCHEMABINDING, ENCRYPTION -> WITH ENCRYPTION
            Some(comma) if scanner.is_comma(comma) => {
                let resume = scanner
                    .next_significant(comma)
                    .and_then(|i| scanner.get(i))
                    .map(|t| t.start)
                    .unwrap_or(scanner.get(comma)?.end);
                Some((binding_token.start, resume))
            }
            _ => Some((scanner.get(with)?.start, binding_token.end)),
        },
        // WITH ENCRYPTION, SCHEMABINDING -> WITH ENCRYPTION
        Some(comma) if scanner.is_comma(comma) => {
            Some((scanner.get(comma)?.start, binding_token.end))
        }
        _ => Some((binding_token.start, binding_token.end)),
    }
}
