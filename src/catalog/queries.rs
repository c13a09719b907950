//! Catalog query text
//!
//! Parameters are positional (`@P1`, `@P2`) as tiberius expects.

/// Resolve `schema.name` to an object id.
pub const RESOLVE_OBJECT: &str = "\
SELECT o.object_id
FROM sys.objects AS o
JOIN sys.schemas AS s ON s.schema_id = o.schema_id
WHERE s.name = @P1 AND o.name = @P2";

/// Modules holding a schema-bound reference to `@P1`.
///
/// `referencing_class = 1` restricts to object-level (module body) references.
pub const SCHEMA_BOUND_DEPENDENTS: &str = "\
SELECT
    o.object_id,
    s.name AS schema_name,
    o.name AS object_name,
    o.type AS type_code,
    m.definition
FROM sys.objects AS o
JOIN sys.schemas AS s ON s.schema_id = o.schema_id
JOIN sys.sql_modules AS m ON m.object_id = o.object_id
WHERE o.type IN ('FN', 'IF', 'TF', 'V', 'P')
  AND EXISTS (
      SELECT 1
      FROM sys.sql_expression_dependencies AS d
      WHERE d.referencing_id = o.object_id
        AND d.referenced_id = @P1
        AND d.referencing_class = 1
        AND d.is_schema_bound_reference = 1
  )
ORDER BY o.object_id";

/// Module text of `@P1`.
pub const OBJECT_DEFINITION: &str = "\
SELECT m.definition
FROM sys.sql_modules AS m
WHERE m.object_id = @P1";

/// Clustered indexes on `@P1`.
pub const CLUSTERED_INDEXES: &str = "\
SELECT i.name AS index_name, s.name AS schema_name, o.name AS object_name
FROM sys.indexes AS i
JOIN sys.objects AS o ON o.object_id = i.object_id
JOIN sys.schemas AS s ON s.schema_id = o.schema_id
WHERE i.object_id = @P1
  AND i.type = 1
  AND i.name IS NOT NULL";
