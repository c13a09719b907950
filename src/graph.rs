//! Dependency graph discovery
//!
//! Walks the catalog breadth-first from the target relation's direct
//! schema-bound referrers. Levels are relaxed to the longest path seen, so an
//! object reachable along several paths ends up at its deepest position. A
//! referrer's level is therefore always strictly greater than the level of
//! every object it depends on inside the closure.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::catalog::{Catalog, ObjectId, SchemaBoundObject, TargetRelation};
use crate::error::{Result, UnbindError};

/// De-duplicated set of schema-bound objects with their levels
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<ObjectId, SchemaBoundObject>,
    /// Directed edges `(referencing, referenced)` inside the closure
    edges: Vec<(ObjectId, ObjectId)>,
    seen_edges: HashSet<(ObjectId, ObjectId)>,
}

impl DependencyGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, object_id: ObjectId) -> Option<&SchemaBoundObject> {
        self.nodes.get(&object_id)
    }

    /// Objects in object id order
    pub fn objects(&self) -> impl Iterator<Item = &SchemaBoundObject> {
        self.nodes.values()
    }

    /// Edges discovered between members of the closure
    pub fn edges(&self) -> &[(ObjectId, ObjectId)] {
        &self.edges
    }

    /// Deepest level recorded, or `None` for an empty graph
    pub fn max_level(&self) -> Option<usize> {
        self.nodes.values().map(|o| o.level).max()
    }

    pub fn into_objects(self) -> Vec<SchemaBoundObject> {
        self.nodes.into_values().collect()
    }

    /// Record `object` at `level`, keeping the deeper of old and new levels.
    fn record(&mut self, mut object: SchemaBoundObject, level: usize) {
        match self.nodes.get_mut(&object.object_id) {
            Some(existing) => existing.level = existing.level.max(level),
            None => {
                object.level = level;
                self.nodes.insert(object.object_id, object);
            }
        }
    }

    fn add_edge(&mut self, referencing: ObjectId, referenced: ObjectId) {
        if self.seen_edges.insert((referencing, referenced)) {
            self.edges.push((referencing, referenced));
        }
    }
}

/// Discover every schema-bound module that transitively references `target`.
///
/// Fails with `DependencyDepthExceeded` if a level beyond `max_depth` would
/// be needed; this happens on cyclic metadata or pathologically deep chains.
pub fn build_dependency_graph<C: Catalog + ?Sized>(
    catalog: &mut C,
    target: &TargetRelation,
    max_depth: usize,
) -> Result<DependencyGraph> {
    let mut graph = DependencyGraph::default();
    // Each object's referrers are fetched once even if it is revisited deeper
    let mut referrers: HashMap<ObjectId, Vec<SchemaBoundObject>> = HashMap::new();

    let mut frontier: Vec<SchemaBoundObject> = catalog.get_direct_dependents(target)?;
    let mut level = 0;

    while !frontier.is_empty() {
        if level > max_depth {
            return Err(UnbindError::DependencyDepthExceeded {
                max_depth,
                partial: Box::new(graph),
            });
        }

        debug!(
            target = %target.full_name(),
            level,
            objects = frontier.len(),
            "expanding dependency level"
        );

        let mut next: BTreeMap<ObjectId, SchemaBoundObject> = BTreeMap::new();
        for object in frontier {
            let object_id = object.object_id;
            graph.record(object, level);

            if !referrers.contains_key(&object_id) {
                let found = catalog.get_dependents_of(object_id)?;
                referrers.insert(object_id, found);
            }
            for referrer in &referrers[&object_id] {
                graph.add_edge(referrer.object_id, object_id);
                next.entry(referrer.object_id)
                    .or_insert_with(|| referrer.clone());
            }
        }

        frontier = next.into_values().collect();
        level += 1;
    }

    Ok(graph)
}
