//! Clustered index suspension
//!
//! A schema-bound view with a clustered index cannot lose SCHEMABINDING
//! while the index exists. Every drop is planned up front, for the whole
//! working set, so no rewrite can be blocked by an index on a sibling that
//! has not been processed yet.

use tracing::debug;

use crate::catalog::{Catalog, ClusteredIndexRef};
use crate::error::Result;
use crate::executor::DdlStatement;
use crate::working_set::WorkingSet;

/// A planned index drop and the working-set entry that owns the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDrop {
    pub sequence_id: usize,
    pub index: ClusteredIndexRef,
    pub statement: DdlStatement,
}

/// Look up clustered indexes for every entry and build one drop per index.
///
/// Entries without a clustered index contribute nothing.
pub fn plan_index_drops<C: Catalog + ?Sized>(
    catalog: &mut C,
    working_set: &WorkingSet,
) -> Result<Vec<IndexDrop>> {
    let mut drops: Vec<IndexDrop> = Vec::new();

    for entry in working_set {
        for index in catalog.get_clustered_indexes(entry.object.object_id)? {
            if drops.iter().any(|d| d.index == index) {
                continue;
            }
            debug!(
                index = %index.index_name,
                object = %entry.object.full_name(),
                "clustered index blocks unbinding"
            );
            drops.push(IndexDrop {
                sequence_id: entry.sequence_id,
                statement: DdlStatement::drop_index(&index),
                index,
            });
        }
    }

    Ok(drops)
}
