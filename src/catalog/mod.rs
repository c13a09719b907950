//! Read-only view of the SQL Server system catalog
//!
//! The [`Catalog`] trait is the seam between the unbind engine and a live
//! database. [`crate::sqlserver::SqlServerSession`] implements it over
//! tiberius; tests implement it in memory.

pub mod queries;

use std::fmt;

use crate::error::Result;
use crate::identifier::{normalize_identifier, qualified_name};

/// SQL Server `object_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub i32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kinds of module that can hold a schema-bound reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    ScalarFunction,
    InlineTableFunction,
    TableFunction,
    View,
    Procedure,
}

impl ObjectKind {
    /// All kinds the dependency traversal follows
    pub const ALL: [ObjectKind; 5] = [
        ObjectKind::ScalarFunction,
        ObjectKind::InlineTableFunction,
        ObjectKind::TableFunction,
        ObjectKind::View,
        ObjectKind::Procedure,
    ];

    /// Map a `sys.objects.type` code (`FN`, `IF`, `TF`, `V`, `P`)
    pub fn from_type_code(code: &str) -> Option<Self> {
        match code.trim() {
            "FN" => Some(ObjectKind::ScalarFunction),
            "IF" => Some(ObjectKind::InlineTableFunction),
            "TF" => Some(ObjectKind::TableFunction),
            "V" => Some(ObjectKind::View),
            "P" => Some(ObjectKind::Procedure),
            _ => None,
        }
    }

    pub fn type_code(&self) -> &'static str {
        match self {
            ObjectKind::ScalarFunction => "FN",
            ObjectKind::InlineTableFunction => "IF",
            ObjectKind::TableFunction => "TF",
            ObjectKind::View => "V",
            ObjectKind::Procedure => "P",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ObjectKind::ScalarFunction => "scalar function",
            ObjectKind::InlineTableFunction => "inline table-valued function",
            ObjectKind::TableFunction => "table-valued function",
            ObjectKind::View => "view",
            ObjectKind::Procedure => "procedure",
        };
        f.write_str(label)
    }
}

/// The relation whose dependents are unbound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRelation {
    pub schema: String,
    pub name: String,
}

impl TargetRelation {
    /// Build a target from possibly delimiter-quoted parts
    pub fn new(schema: &str, name: &str) -> Self {
        Self {
            schema: normalize_identifier(schema),
            name: normalize_identifier(name),
        }
    }

    /// Get the full name (e.g., [Sales].[Orders])
    pub fn full_name(&self) -> String {
        qualified_name(&self.schema, &self.name)
    }
}

/// A module holding a schema-bound reference into the dependency closure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaBoundObject {
    pub object_id: ObjectId,
    pub schema: String,
    pub name: String,
    pub kind: ObjectKind,
    /// Module text as stored in `sys.sql_modules`
    pub definition: String,
    /// Distance from the target: 0 for direct dependents
    pub level: usize,
}

impl SchemaBoundObject {
    pub fn full_name(&self) -> String {
        qualified_name(&self.schema, &self.name)
    }
}

/// A clustered index that must go before its owner can be redefined
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusteredIndexRef {
    pub index_name: String,
    pub owner_schema: String,
    pub owner_name: String,
}

/// Read-only catalog queries used by the engine
pub trait Catalog {
    /// Resolve a relation to its object id, failing with `ObjectNotFound`.
    fn resolve_relation(&mut self, target: &TargetRelation) -> Result<ObjectId>;

    /// Modules referencing `object_id` through a schema-bound reference.
    ///
    /// Only kinds in [`ObjectKind::ALL`] are returned, each once.
    fn get_dependents_of(&mut self, object_id: ObjectId) -> Result<Vec<SchemaBoundObject>>;

    /// Current module text, or `None` if the object has no SQL definition.
    fn get_definition(&mut self, object_id: ObjectId) -> Result<Option<String>>;

    /// Clustered indexes defined on `object_id`.
    fn get_clustered_indexes(&mut self, object_id: ObjectId) -> Result<Vec<ClusteredIndexRef>>;

    /// Modules directly schema-bound to the target relation.
    fn get_direct_dependents(&mut self, target: &TargetRelation) -> Result<Vec<SchemaBoundObject>> {
        let object_id = self.resolve_relation(target)?;
        self.get_dependents_of(object_id)
    }
}

impl<C: Catalog + ?Sized> Catalog for &mut C {
    fn resolve_relation(&mut self, target: &TargetRelation) -> Result<ObjectId> {
        (**self).resolve_relation(target)
    }

    fn get_dependents_of(&mut self, object_id: ObjectId) -> Result<Vec<SchemaBoundObject>> {
        (**self).get_dependents_of(object_id)
    }

    fn get_definition(&mut self, object_id: ObjectId) -> Result<Option<String>> {
        (**self).get_definition(object_id)
    }

    fn get_clustered_indexes(&mut self, object_id: ObjectId) -> Result<Vec<ClusteredIndexRef>> {
        (**self).get_clustered_indexes(object_id)
    }
}
