//! DDL statements and the sink that executes them
//!
//! [`StatementExecutor`] is deliberately narrow: one validated statement in,
//! success or failure out. [`DryRun`] wraps any session, forwards catalog
//! reads, and records statements instead of executing them.

use std::fmt;

use tracing::info;

use crate::catalog::{Catalog, ClusteredIndexRef, ObjectId, SchemaBoundObject, TargetRelation};
use crate::error::{Result, UnbindError};
use crate::identifier::{qualified_name, quote_identifier};

/// Error returned by an executor; the orchestrator attaches run context
pub type ExecError = Box<dyn std::error::Error + Send + Sync>;

/// What a generated statement does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    DropIndex,
    AlterModule,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::DropIndex => f.write_str("DROP INDEX"),
            StatementKind::AlterModule => f.write_str("ALTER"),
        }
    }
}

/// A generated DDL statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlStatement {
    pub kind: StatementKind,
    /// Object the statement acts on, e.g. `[Sales].[vOrderTotals]`
    pub object: String,
    text: String,
}

impl DdlStatement {
    /// Create a statement, rejecting empty text.
    pub fn new(kind: StatementKind, object: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        let object = object.into();
        let text = text.into();
        if text.trim().is_empty() {
            return Err(UnbindError::InvalidStatement {
                message: format!("empty {} statement for {}", kind, object),
            });
        }
        Ok(Self { kind, object, text })
    }

    /// `DROP INDEX [ix] ON [schema].[object]`
    pub fn drop_index(index: &ClusteredIndexRef) -> Self {
        Self {
            kind: StatementKind::DropIndex,
            object: qualified_name(&index.owner_schema, &index.owner_name),
            text: format!(
                "DROP INDEX {} ON {}",
                quote_identifier(&index.index_name),
                qualified_name(&index.owner_schema, &index.owner_name)
            ),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for DdlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Sink that applies DDL to the live catalog
pub trait StatementExecutor {
    fn execute(&mut self, statement: &DdlStatement) -> std::result::Result<(), ExecError>;
}

impl<E: StatementExecutor + ?Sized> StatementExecutor for &mut E {
    fn execute(&mut self, statement: &DdlStatement) -> std::result::Result<(), ExecError> {
        (**self).execute(statement)
    }
}

/// Session wrapper that reads from `inner` but only records statements
pub struct DryRun<S> {
    inner: S,
    recorded: Vec<DdlStatement>,
}

impl<S> DryRun<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            recorded: Vec::new(),
        }
    }

    /// Statements that would have been executed, in order
    pub fn recorded(&self) -> &[DdlStatement] {
        &self.recorded
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> StatementExecutor for DryRun<S> {
    fn execute(&mut self, statement: &DdlStatement) -> std::result::Result<(), ExecError> {
        info!(object = %statement.object, kind = %statement.kind, "dry run: statement not executed");
        self.recorded.push(statement.clone());
        Ok(())
    }
}

impl<S: Catalog> Catalog for DryRun<S> {
    fn resolve_relation(&mut self, target: &TargetRelation) -> Result<ObjectId> {
        self.inner.resolve_relation(target)
    }

    fn get_dependents_of(&mut self, object_id: ObjectId) -> Result<Vec<SchemaBoundObject>> {
        self.inner.get_dependents_of(object_id)
    }

    fn get_definition(&mut self, object_id: ObjectId) -> Result<Option<String>> {
        self.inner.get_definition(object_id)
    }

    fn get_clustered_indexes(&mut self, object_id: ObjectId) -> Result<Vec<ClusteredIndexRef>> {
        self.inner.get_clustered_indexes(object_id)
    }
}
