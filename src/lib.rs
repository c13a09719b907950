//! sql-unbind: removes SCHEMABINDING from everything that depends on a relation
//!
//! Before a relation can be dropped or swapped for a test double, every view,
//! function and procedure bound to it with SCHEMABINDING has to be released.
//! This library discovers that dependency closure in the SQL Server catalog,
//! drops clustered indexes that would block the change, and re-applies each
//! module as an `ALTER` without the binding, deepest dependents first.
//!
//! The engine does not open a transaction and has no inverse operation. The
//! report returned by [`unbind`] carries each original definition so a
//! caller can restore the bindings.

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod identifier;
pub mod report;
pub mod rewrite;
pub mod sqlserver;
pub mod suspend;
pub mod util;
pub mod working_set;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span};
use uuid::Uuid;

pub use catalog::{Catalog, ObjectKind, TargetRelation};
pub use config::{SqlServerConfig, UnbindOptions};
pub use error::{Result, UnbindError};
pub use executor::{DdlStatement, DryRun, StatementExecutor};
pub use report::{ProcessedEntry, UnbindReport};
pub use sqlserver::SqlServerSession;

use executor::StatementKind;
use graph::build_dependency_graph;
use rewrite::{has_schema_binding, rewrite_definition};
use suspend::plan_index_drops;
use working_set::WorkingSet;

/// Unbind every schema-bound dependent of `schema.relation`.
///
/// Both names may be bracket- or double-quoted. The first failure aborts the
/// run; statements already applied are not rolled back.
pub fn unbind<S>(
    session: &mut S,
    schema: &str,
    relation: &str,
    options: &UnbindOptions,
) -> Result<UnbindReport>
where
    S: Catalog + StatementExecutor,
{
    unbind_with_cancel(session, schema, relation, options, &CancellationToken::new())
}

/// Like [`unbind`], taking a one- or two-part name such as `[Sales].[Orders]`.
///
/// A one-part name resolves in `dbo`. Names with more than two parts, or an
/// empty part, fail with `InvalidName`.
pub fn unbind_qualified<S>(
    session: &mut S,
    name: &str,
    options: &UnbindOptions,
) -> Result<UnbindReport>
where
    S: Catalog + StatementExecutor,
{
    let (schema, relation) =
        identifier::split_qualified_name(name, "dbo").ok_or_else(|| UnbindError::InvalidName {
            name: name.to_string(),
        })?;
    unbind(session, &schema, &relation, options)
}

/// Like [`unbind`], stopping cleanly when `cancel` fires.
///
/// Cancellation is checked before indexes are dropped and between working-set
/// entries, never in the middle of a statement.
pub fn unbind_with_cancel<S>(
    session: &mut S,
    schema: &str,
    relation: &str,
    options: &UnbindOptions,
    cancel: &CancellationToken,
) -> Result<UnbindReport>
where
    S: Catalog + StatementExecutor,
{
    let target = TargetRelation::new(schema, relation);
    if options.dry_run {
        let mut dry = DryRun::new(&mut *session);
        run(&mut dry, &target, options, cancel)
    } else {
        run(session, &target, options, cancel)
    }
}

fn run<S>(
    session: &mut S,
    target: &TargetRelation,
    options: &UnbindOptions,
    cancel: &CancellationToken,
) -> Result<UnbindReport>
where
    S: Catalog + StatementExecutor,
{
    let run_id = Uuid::new_v4();
    let span = info_span!(
        "unbind",
        %run_id,
        schema = %target.schema,
        relation = %target.name
    );
    let _guard = span.enter();
    let started_at = Utc::now();

    // Step 1: Discover the schema-bound closure
    let graph = build_dependency_graph(session, target, options.max_depth)?;

    // Step 2: Order it deepest-first, keeping only still-bound objects
    let working_set = WorkingSet::from_graph(graph);
    info!(objects = working_set.len(), "working set built");

    if cancel.is_cancelled() {
        return Err(UnbindError::Cancelled {
            completed: 0,
            remaining: working_set.len(),
        });
    }

    // Step 3: Drop every blocking clustered index before any rewrite
    let drops = plan_index_drops(session, &working_set)?;
    let mut statements = Vec::with_capacity(drops.len() + working_set.len());
    for planned in &drops {
        apply(session, &planned.statement, 0)?;
        statements.push(planned.statement.clone());
    }

    // Step 4: Rewrite and apply each definition in order
    let mut entries: Vec<ProcessedEntry> = Vec::with_capacity(working_set.len());
    for entry in &working_set {
        if cancel.is_cancelled() {
            info!(completed = entries.len(), "unbind cancelled");
            return Err(UnbindError::Cancelled {
                completed: entries.len(),
                remaining: working_set.len() - entries.len(),
            });
        }

        let name = entry.object.full_name();
        let rewritten = rewrite_definition(&entry.original_definition);
        if options.verbose {
            info!(
                sequence = entry.sequence_id,
                object = %name,
                level = entry.object.level,
                create_replaced = rewritten.create_replaced,
                binding_removed = rewritten.binding_removed,
                "rewrote definition"
            );
        } else {
            debug!(sequence = entry.sequence_id, object = %name, "rewrote definition");
        }

        let statement =
            DdlStatement::new(StatementKind::AlterModule, name.clone(), rewritten.text.clone())?;
        apply(session, &statement, entries.len())?;
        statements.push(statement);

        if options.verify && !options.dry_run {
            verify_unbound(session, entry.object.object_id, &name)?;
        }

        entries.push(ProcessedEntry {
            sequence_id: entry.sequence_id,
            object_id: entry.object.object_id,
            name,
            kind: entry.object.kind,
            level: entry.object.level,
            original_definition: entry.original_definition.clone(),
            applied_definition: rewritten.text,
        });
    }

    let report = UnbindReport {
        run_id,
        target: target.clone(),
        processed_count: entries.len(),
        entries,
        dropped_indexes: drops.into_iter().map(|d| d.index).collect(),
        statements,
        dry_run: options.dry_run,
        started_at,
        finished_at: Utc::now(),
    };
    info!(
        processed = report.processed_count,
        indexes = report.dropped_indexes.len(),
        "unbind finished"
    );
    Ok(report)
}

/// Execute one statement, attaching run context to any failure.
fn apply<S: StatementExecutor + ?Sized>(
    session: &mut S,
    statement: &DdlStatement,
    succeeded: usize,
) -> Result<()> {
    info!(object = %statement.object, kind = %statement.kind, "executing statement");
    session.execute(statement).map_err(|e| {
        error!(object = %statement.object, error = %e, "statement failed");
        UnbindError::StatementExecutionFailed {
            statement: statement.text().to_string(),
            failed_entry: statement.object.clone(),
            succeeded,
            message: e.to_string(),
        }
    })
}

fn verify_unbound<C: Catalog + ?Sized>(
    catalog: &mut C,
    object_id: catalog::ObjectId,
    name: &str,
) -> Result<()> {
    let definition = catalog.get_definition(object_id).map_err(|e| {
        error!(object = %name, error = %e, "could not re-read definition");
        match e {
            UnbindError::CatalogUnavailable { message, .. } => UnbindError::VerificationUnavailable {
                object: name.to_string(),
                message,
            },
            other => other,
        }
    })?;
    match definition {
        Some(definition) if has_schema_binding(&definition) => {
            error!(object = %name, "definition still schema-bound after rewrite");
            Err(UnbindError::VerificationFailed {
                object: name.to_string(),
            })
        }
        _ => Ok(()),
    }
}
