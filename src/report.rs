//! Outcome of an unbind run

use std::fmt::Write;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::catalog::{ClusteredIndexRef, ObjectId, ObjectKind, TargetRelation};
use crate::executor::DdlStatement;

/// One working-set entry after its rewrite was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedEntry {
    pub sequence_id: usize,
    pub object_id: ObjectId,
    /// Full name, e.g. `[Sales].[vOrderTotals]`
    pub name: String,
    pub kind: ObjectKind,
    pub level: usize,
    /// Definition before the run; re-applying it restores the binding
    pub original_definition: String,
    pub applied_definition: String,
}

/// Report of a completed unbind run
#[derive(Debug, Clone)]
pub struct UnbindReport {
    pub run_id: Uuid,
    pub target: TargetRelation,
    pub processed_count: usize,
    /// Entries in processing order
    pub entries: Vec<ProcessedEntry>,
    pub dropped_indexes: Vec<ClusteredIndexRef>,
    /// Every statement issued (or recorded, for a dry run), in order
    pub statements: Vec<DdlStatement>,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl UnbindReport {
    /// Human-readable multi-line summary
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let mode = if self.dry_run { " (dry run)" } else { "" };
        let _ = writeln!(
            out,
            "Unbind {}{}: {} object(s), {} clustered index(es) dropped",
            self.target.full_name(),
            mode,
            self.processed_count,
            self.dropped_indexes.len()
        );
        for index in &self.dropped_indexes {
            let _ = writeln!(
                out,
                "  dropped index [{}] on [{}].[{}]",
                index.index_name, index.owner_schema, index.owner_name
            );
        }
        for entry in &self.entries {
            let _ = writeln!(
                out,
                "  {:>3}. {} ({}, level {})",
                entry.sequence_id, entry.name, entry.kind, entry.level
            );
        }
        let elapsed = self.finished_at - self.started_at;
        let _ = write!(out, "Completed in {} ms", elapsed.num_milliseconds());
        out
    }
}
