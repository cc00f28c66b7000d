//! Declarative schema
//!
//! - `types`: table, column, index and foreign key definitions
//! - `sql`: DDL rendering and validation
//! - `sync`: [`SchemaSynchronizer`], the atomic drop/create/index rebuild
//!
//! Tables are collected into a [`TableSet`], which preserves declaration order
//! and guarantees unique names.

pub mod sql;
mod sync;
mod types;

pub use sync::{SchemaSynchronizer, DEFER_FOREIGN_KEYS};
pub use types::{
    ColumnDef, ColumnDefault, ColumnKind, ColumnRef, ForeignKeyDef, IndexDef, TableSchema,
};

use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::error::SchemaError;

/// Ordered collection of uniquely named tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet {
    tables: Vec<TableSchema>,
}

#[derive(Debug, Deserialize)]
struct TablesFile {
    #[serde(default)]
    tables: Vec<TableSchema>,
}

impl TableSet {
    /// Build a table set, validating every table and rejecting duplicate names
    pub fn new(tables: Vec<TableSchema>) -> Result<Self, SchemaError> {
        let mut names = HashSet::new();
        for table in &tables {
            sql::validate_table(table)?;
            if !names.insert(table.name.as_str()) {
                return Err(SchemaError::DuplicateTable {
                    name: table.name.clone(),
                });
            }
        }
        Ok(Self { tables })
    }

    /// Load table definitions from a TOML or JSON file
    ///
    /// The file holds a `tables` array; a missing file yields an empty set.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(|e| anyhow!("Failed to read table definitions '{}': {}", path.display(), e))?;

        let file = settings
            .try_deserialize::<TablesFile>()
            .map_err(|e| anyhow!("Invalid table definitions in '{}': {}", path.display(), e))?;

        Ok(Self::new(file.tables)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.iter()
    }

    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_table_names() {
        let err = TableSet::new(vec![
            TableSchema::new("posts", vec![ColumnDef::new("title", ColumnKind::Text)]),
            TableSchema::new("posts", vec![ColumnDef::new("body", ColumnKind::Text)]),
        ])
        .unwrap_err();

        assert!(matches!(err, SchemaError::DuplicateTable { name } if name == "posts"));
    }

    #[test]
    fn test_preserves_declaration_order() {
        let set = TableSet::new(vec![
            TableSchema::new("zeta", vec![ColumnDef::new("a", ColumnKind::Text)]),
            TableSchema::new("alpha", vec![ColumnDef::new("a", ColumnKind::Text)]),
        ])
        .unwrap();

        assert_eq!(set.names(), vec!["zeta", "alpha"]);
        assert!(set.get("alpha").is_some());
        assert!(set.get("beta").is_none());
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[[tables]]
name = "posts"

[[tables.columns]]
name = "id"
kind = "number"
primary_key = true

[[tables.columns]]
name = "title"
kind = "text"

[[tables.indexes]]
on = ["title"]
unique = true

[[tables]]
name = "tags"

[[tables.columns]]
name = "name"
kind = "text"
default = "untagged"
"#,
        )
        .unwrap();

        let set = TableSet::load(&path).unwrap();
        assert_eq!(set.names(), vec!["posts", "tags"]);

        let posts = set.get("posts").unwrap();
        assert!(posts.column("id").unwrap().primary_key);
        assert_eq!(posts.indexes.len(), 1);
        assert!(posts.indexes[0].unique);

        let tags = set.get("tags").unwrap();
        assert_eq!(
            tags.column("name").unwrap().default,
            Some(ColumnDefault::Value(serde_json::json!("untagged")))
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let set = TableSet::load(&dir.path().join("config.toml")).unwrap();
        assert!(set.is_empty());
    }
}
