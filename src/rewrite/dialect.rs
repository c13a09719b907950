//! T-SQL tokenizer dialect
//!
//! `MsSqlDialect` closes a block comment at the first `*/`, but SQL Server
//! nests them: `/* a /* b */ still a comment */`. This dialect delegates to
//! `MsSqlDialect` and turns nesting on.

use std::any::TypeId;

use sqlparser::dialect::{Dialect, MsSqlDialect};

/// `MsSqlDialect` with nested block comments
#[derive(Debug)]
pub struct TsqlDialect {
    base: MsSqlDialect,
}

impl Default for TsqlDialect {
    fn default() -> Self {
        Self {
            base: MsSqlDialect {},
        }
    }
}

impl Dialect for TsqlDialect {
    // Report as MsSqlDialect so the tokenizer's dialect_of!() checks still match
    fn dialect(&self) -> TypeId {
        TypeId::of::<MsSqlDialect>()
    }

    fn is_identifier_start(&self, ch: char) -> bool {
        self.base.is_identifier_start(ch)
    }

    fn is_identifier_part(&self, ch: char) -> bool {
        self.base.is_identifier_part(ch)
    }

    fn is_delimited_identifier_start(&self, ch: char) -> bool {
        self.base.is_delimited_identifier_start(ch)
    }

    fn supports_nested_comments(&self) -> bool {
        true
    }
}
