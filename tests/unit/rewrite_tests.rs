//! Definition rewriting on realistic module bodies

use pretty_assertions::assert_eq;

use sql_unbind::rewrite::{has_schema_binding, rewrite_definition};

#[test]
fn test_procedure_with_string_mentioning_binding() {
    let sql = "CREATE PROCEDURE dbo.uspAudit WITH SCHEMABINDING AS SELECT 'WITH SCHEMABINDING' AS Note";
    let out = rewrite_definition(sql);
    assert_eq!(
        out.text,
        "ALTER PROCEDURE dbo.uspAudit  AS SELECT 'WITH SCHEMABINDING' AS Note"
    );
    assert!(!has_schema_binding(&out.text));
}

#[test]
fn test_bracketed_name_is_not_the_option() {
    let sql = "CREATE VIEW dbo.[SchemaBinding] WITH SCHEMABINDING AS SELECT 1 AS x";
    let out = rewrite_definition(sql);
    assert_eq!(out.text, "ALTER VIEW dbo.[SchemaBinding]  AS SELECT 1 AS x");
    assert!(out.binding_removed);
}

#[test]
fn test_block_comment_before_header() {
    let sql = "/* CREATE VIEW dbo.vOld WITH SCHEMABINDING */\nCREATE VIEW dbo.vNew\nWITH SCHEMABINDING\nAS SELECT 1 AS x";
    let out = rewrite_definition(sql);
    assert_eq!(
        out.text,
        "/* CREATE VIEW dbo.vOld WITH SCHEMABINDING */\nALTER VIEW dbo.vNew\n\nAS SELECT 1 AS x"
    );
}

#[test]
fn test_crlf_line_endings_preserved() {
    let sql = "CREATE VIEW v\r\nWITH SCHEMABINDING\r\nAS SELECT 1 AS x";
    assert_eq!(
        rewrite_definition(sql).text,
        "ALTER VIEW v\r\n\r\nAS SELECT 1 AS x"
    );
}

#[test]
fn test_lowercase_keywords_keep_body_case() {
    let sql = "create view dbo.v with schemabinding as select o.Id from dbo.Orders as o";
    assert_eq!(
        rewrite_definition(sql).text,
        "ALTER view dbo.v  as select o.Id from dbo.Orders as o"
    );
}

#[test]
fn test_multi_statement_function() {
    let sql = "CREATE FUNCTION dbo.fnRecent(@Days INT)\nRETURNS @Result TABLE (Id INT NOT NULL)\nWITH SCHEMABINDING, ENCRYPTION\nAS\nBEGIN\n    INSERT INTO @Result SELECT o.Id FROM dbo.Orders AS o;\n    RETURN;\nEND";
    let out = rewrite_definition(sql);
    assert_eq!(
        out.text,
        "ALTER FUNCTION dbo.fnRecent(@Days INT)\nRETURNS @Result TABLE (Id INT NOT NULL)\nWITH ENCRYPTION\nAS\nBEGIN\n    INSERT INTO @Result SELECT o.Id FROM dbo.Orders AS o;\n    RETURN;\nEND"
    );
}

#[test]
fn test_only_first_binding_is_removed() {
    let sql = "CREATE VIEW v WITH SCHEMABINDING AS SELECT 1 AS SCHEMABINDING";
    let out = rewrite_definition(sql);
    assert_eq!(out.text, "ALTER VIEW v  AS SELECT 1 AS SCHEMABINDING");
}

#[test]
fn test_rewritten_text_is_stable() {
    let sql = "CREATE OR ALTER VIEW dbo.v WITH SCHEMABINDING AS SELECT 1 AS x";
    let once = rewrite_definition(sql);
    assert_eq!(once.text, "ALTER VIEW dbo.v  AS SELECT 1 AS x");

    let twice = rewrite_definition(&once.text);
    assert_eq!(twice.text, once.text);
    assert!(!twice.create_replaced);
    assert!(!twice.binding_removed);
}

#[test]
fn test_definition_without_create() {
    // Unusual but possible if a definition was stored with a leading ALTER
    let out = rewrite_definition("ALTER VIEW v WITH SCHEMABINDING AS SELECT 1 AS x");
    assert!(!out.create_replaced);
    assert!(out.binding_removed);
    assert_eq!(out.text, "ALTER VIEW v  AS SELECT 1 AS x");
}
