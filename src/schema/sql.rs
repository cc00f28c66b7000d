//! DDL rendering for declarative tables
//!
//! Produces the SQLite statements used by schema recreation. Tables are
//! validated before any statement is rendered, so a malformed definition never
//! reaches the database.

use std::collections::HashSet;

use serde_json::Value;

use crate::codegen::GENERATED_NAMES;
use crate::error::SchemaError;
use crate::schema::types::{ColumnDef, ColumnDefault, IndexDef, TableSchema};

/// Name of the implicit primary key added to tables without one
pub const IMPLICIT_PRIMARY_KEY: &str = "_id";

/// Words that cannot name a binding in strict-mode module code
const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue",
    "debugger", "default", "delete", "do", "else", "enum", "eval", "export", "extends",
    "false", "finally", "for", "function", "if", "implements", "import", "in",
    "instanceof", "interface", "let", "new", "null", "package", "private", "protected",
    "public", "return", "static", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with", "yield",
];

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Quote an identifier
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn drop_table(table: &TableSchema) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(&table.name))
}

pub fn create_table(table: &TableSchema) -> String {
    let mut defs = Vec::with_capacity(table.columns.len() + table.foreign_keys.len() + 1);

    if !table.has_primary_key() {
        defs.push(format!(
            "{} integer PRIMARY KEY",
            quote_ident(IMPLICIT_PRIMARY_KEY)
        ));
    }

    defs.extend(table.columns.iter().map(column_def));

    for fk in &table.foreign_keys {
        defs.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            ident_list(&fk.columns),
            quote_ident(&fk.references_table),
            ident_list(&fk.references_columns)
        ));
    }

    format!("CREATE TABLE {} ({})", quote_ident(&table.name), defs.join(", "))
}

pub fn create_index(table: &TableSchema, index: &IndexDef) -> String {
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        quote_ident(&index.resolved_name(&table.name)),
        quote_ident(&table.name),
        ident_list(&index.on)
    )
}

fn column_def(column: &ColumnDef) -> String {
    let mut def = format!("{} {}", quote_ident(&column.name), column.kind.sql_type());

    if column.primary_key {
        def.push_str(" PRIMARY KEY");
    } else if !column.optional {
        def.push_str(" NOT NULL");
    }

    if column.unique {
        def.push_str(" UNIQUE");
    }

    if let Some(default) = &column.default {
        def.push_str(" DEFAULT ");
        def.push_str(&default_sql(default));
    }

    if let Some(reference) = &column.references {
        def.push_str(&format!(
            " REFERENCES {} ({})",
            quote_ident(&reference.table),
            quote_ident(&reference.column)
        ));
    }

    def
}

fn default_sql(default: &ColumnDefault) -> String {
    match default {
        ColumnDefault::Sql { sql } => format!("({})", sql),
        ColumnDefault::Value(value) => match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => "0".to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => quote_literal(s),
            Value::Array(_) | Value::Object(_) => quote_literal(&value.to_string()),
        },
    }
}

fn ident_list(idents: &[String]) -> String {
    idents
        .iter()
        .map(|i| quote_ident(i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check a table definition for structural errors
pub fn validate_table(table: &TableSchema) -> Result<(), SchemaError> {
    if table.name.trim().is_empty() {
        return Err(SchemaError::invalid(&table.name, "table name is empty"));
    }

    // Table names double as export names in generated modules
    if !is_identifier(&table.name) {
        return Err(SchemaError::invalid(
            &table.name,
            "table name must be a valid identifier (letters, digits, `_` or `$`)",
        ));
    }
    if GENERATED_NAMES.contains(&table.name.as_str()) {
        return Err(SchemaError::invalid(
            &table.name,
            "table name collides with a name the generated module declares",
        ));
    }
    if RESERVED_WORDS.contains(&table.name.as_str()) {
        return Err(SchemaError::invalid(
            &table.name,
            "table name is a reserved word and cannot be exported",
        ));
    }

    let mut seen = HashSet::new();
    for column in &table.columns {
        if column.name.trim().is_empty() {
            return Err(SchemaError::invalid(&table.name, "column name is empty"));
        }
        if !seen.insert(column.name.as_str()) {
            return Err(SchemaError::invalid(
                &table.name,
                format!("column `{}` is declared more than once", column.name),
            ));
        }
    }

    if !table.has_primary_key() && seen.contains(IMPLICIT_PRIMARY_KEY) {
        return Err(SchemaError::invalid(
            &table.name,
            format!(
                "column `{}` is reserved for tables without a primary key",
                IMPLICIT_PRIMARY_KEY
            ),
        ));
    }

    for index in &table.indexes {
        if index.on.is_empty() {
            return Err(SchemaError::invalid(&table.name, "index has no columns"));
        }
        if let Some(missing) = index.on.iter().find(|c| !seen.contains(c.as_str())) {
            return Err(SchemaError::invalid(
                &table.name,
                format!("index references unknown column `{}`", missing),
            ));
        }
    }

    for fk in &table.foreign_keys {
        if fk.columns.is_empty() || fk.columns.len() != fk.references_columns.len() {
            return Err(SchemaError::invalid(
                &table.name,
                format!(
                    "foreign key to `{}` has {} local and {} referenced columns",
                    fk.references_table,
                    fk.columns.len(),
                    fk.references_columns.len()
                ),
            ));
        }
        if let Some(missing) = fk.columns.iter().find(|c| !seen.contains(c.as_str())) {
            return Err(SchemaError::invalid(
                &table.name,
                format!("foreign key references unknown column `{}`", missing),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{ColumnKind, ForeignKeyDef};
    use serde_json::json;

    fn posts() -> TableSchema {
        TableSchema::new(
            "posts",
            vec![
                ColumnDef::new("id", ColumnKind::Number).primary_key(),
                ColumnDef::new("title", ColumnKind::Text),
                ColumnDef::new("body", ColumnKind::Text).optional(),
                ColumnDef::new("published", ColumnKind::Boolean)
                    .default_value(ColumnDefault::Value(json!(false))),
                ColumnDef::new("created_at", ColumnKind::Date).default_value(ColumnDefault::Sql {
                    sql: "CURRENT_TIMESTAMP".to_string(),
                }),
            ],
        )
    }

    #[test]
    fn test_create_table() {
        assert_eq!(
            create_table(&posts()),
            "CREATE TABLE \"posts\" (\"id\" integer PRIMARY KEY, \"title\" text NOT NULL, \
             \"body\" text, \"published\" integer NOT NULL DEFAULT 0, \
             \"created_at\" text NOT NULL DEFAULT (CURRENT_TIMESTAMP))"
        );
    }

    #[test]
    fn test_implicit_primary_key() {
        let table = TableSchema::new("tags", vec![ColumnDef::new("name", ColumnKind::Text)]);
        assert_eq!(
            create_table(&table),
            "CREATE TABLE \"tags\" (\"_id\" integer PRIMARY KEY, \"name\" text NOT NULL)"
        );
    }

    #[test]
    fn test_references_and_foreign_keys() {
        let table = TableSchema::new(
            "comments",
            vec![
                ColumnDef::new("post_id", ColumnKind::Number).references("posts", "id"),
                ColumnDef::new("author", ColumnKind::Text).unique(),
            ],
        )
        .with_foreign_key(ForeignKeyDef {
            columns: vec!["author".to_string()],
            references_table: "authors".to_string(),
            references_columns: vec!["name".to_string()],
        });

        assert_eq!(
            create_table(&table),
            "CREATE TABLE \"comments\" (\"_id\" integer PRIMARY KEY, \
             \"post_id\" integer NOT NULL REFERENCES \"posts\" (\"id\"), \
             \"author\" text NOT NULL UNIQUE, \
             FOREIGN KEY (\"author\") REFERENCES \"authors\" (\"name\"))"
        );
    }

    #[test]
    fn test_create_index() {
        let table = posts();
        let unnamed = IndexDef {
            name: None,
            on: vec!["title".to_string(), "published".to_string()],
            unique: false,
        };
        let named = IndexDef {
            name: Some("posts_title_unique".to_string()),
            on: vec!["title".to_string()],
            unique: true,
        };

        assert_eq!(
            create_index(&table, &unnamed),
            "CREATE INDEX \"posts_title_published_idx\" ON \"posts\" (\"title\", \"published\")"
        );
        assert_eq!(
            create_index(&table, &named),
            "CREATE UNIQUE INDEX \"posts_title_unique\" ON \"posts\" (\"title\")"
        );
    }

    #[test]
    fn test_literal_defaults() {
        assert_eq!(default_sql(&ColumnDefault::Value(json!("it's"))), "'it''s'");
        assert_eq!(default_sql(&ColumnDefault::Value(json!(42))), "42");
        assert_eq!(default_sql(&ColumnDefault::Value(json!(null))), "NULL");
        assert_eq!(
            default_sql(&ColumnDefault::Value(json!({"a": 1}))),
            "'{\"a\":1}'"
        );
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_validate_rejects_generated_names() {
        for name in GENERATED_NAMES.iter().chain(["class", "default", "delete"].iter()) {
            let table = TableSchema::new(*name, vec![ColumnDef::new("id", ColumnKind::Number)]);
            assert!(
                matches!(validate_table(&table), Err(SchemaError::InvalidTable { .. })),
                "{} should be rejected",
                name
            );
        }

        for name in ["dbUrl", "asTable", "createLocalDatabaseClient", "normalizeDatabaseUrl"] {
            assert!(GENERATED_NAMES.contains(&name));
        }

        let table = TableSchema::new("classes", vec![ColumnDef::new("id", ColumnKind::Number)]);
        assert!(validate_table(&table).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_tables() {
        let dup = TableSchema::new(
            "t",
            vec![
                ColumnDef::new("a", ColumnKind::Text),
                ColumnDef::new("a", ColumnKind::Text),
            ],
        );
        assert!(validate_table(&dup).is_err());

        let bad_index = posts().with_index(IndexDef {
            name: None,
            on: vec!["missing".to_string()],
            unique: false,
        });
        assert!(validate_table(&bad_index).is_err());

        let bad_fk = posts().with_foreign_key(ForeignKeyDef {
            columns: vec!["title".to_string()],
            references_table: "other".to_string(),
            references_columns: vec![],
        });
        assert!(validate_table(&bad_fk).is_err());

        let reserved = TableSchema::new("t", vec![ColumnDef::new("_id", ColumnKind::Text)]);
        assert!(validate_table(&reserved).is_err());

        let not_ident = TableSchema::new("my-posts", vec![ColumnDef::new("a", ColumnKind::Text)]);
        assert!(validate_table(&not_ident).is_err());

        let clash = TableSchema::new("db", vec![ColumnDef::new("a", ColumnKind::Text)]);
        assert!(validate_table(&clash).is_err());

        assert!(validate_table(&posts()).is_ok());
    }
}
