//! Ordered unit of work for a single unbind run

use crate::catalog::SchemaBoundObject;
use crate::graph::DependencyGraph;
use crate::rewrite::has_schema_binding;

/// One object scheduled for unbinding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingSetEntry {
    /// 1-based position in processing order
    pub sequence_id: usize,
    pub object: SchemaBoundObject,
    /// Definition as read from the catalog, before any rewrite
    pub original_definition: String,
}

/// Objects still carrying SCHEMABINDING, deepest level first
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    entries: Vec<WorkingSetEntry>,
}

impl WorkingSet {
    /// Materialize the graph, dropping objects that are no longer schema-bound.
    ///
    /// Ties within a level are broken by schema, name and object id so the
    /// order is stable across runs.
    pub fn from_graph(graph: DependencyGraph) -> Self {
        let mut objects: Vec<SchemaBoundObject> = graph
            .into_objects()
            .into_iter()
            .filter(|o| has_schema_binding(&o.definition))
            .collect();

        objects.sort_by(|a, b| {
            b.level
                .cmp(&a.level)
                .then_with(|| a.schema.cmp(&b.schema))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.object_id.cmp(&b.object_id))
        });

        let entries = objects
            .into_iter()
            .enumerate()
            .map(|(i, object)| WorkingSetEntry {
                sequence_id: i + 1,
                original_definition: object.definition.clone(),
                object,
            })
            .collect();

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WorkingSetEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a WorkingSet {
    type Item = &'a WorkingSetEntry;
    type IntoIter = std::slice::Iter<'a, WorkingSetEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
