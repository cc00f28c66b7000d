//! Schema recreation
//!
//! Rebuilds every declared table from scratch in a single atomic batch. This is
//! not a migration: all existing rows are discarded.

use tracing::info;

use crate::database::{DatabaseClient, SqlStatement};
use crate::error::SchemaError;
use crate::schema::sql;
use crate::schema::TableSet;

/// Pragma heading every recreate batch so tables with forward or circular
/// references can be dropped and created in declaration order
pub const DEFER_FOREIGN_KEYS: &str = "PRAGMA defer_foreign_keys = true";

/// Drops and recreates all declared tables against a database client
pub struct SchemaSynchronizer<'a> {
    client: &'a dyn DatabaseClient,
}

impl<'a> SchemaSynchronizer<'a> {
    /// Create a new synchronizer for the given client
    pub fn new(client: &'a dyn DatabaseClient) -> Self {
        Self { client }
    }

    /// Statements of one recreate batch, in execution order
    ///
    /// For each table: `DROP TABLE IF EXISTS`, `CREATE TABLE`, then one
    /// `CREATE INDEX` per declared index.
    pub fn statements(tables: &TableSet) -> Vec<SqlStatement> {
        let mut statements = vec![SqlStatement::raw(DEFER_FOREIGN_KEYS)];
        for table in tables.iter() {
            statements.push(SqlStatement::raw(sql::drop_table(table)));
            statements.push(SqlStatement::raw(sql::create_table(table)));
            statements.extend(
                table
                    .indexes
                    .iter()
                    .map(|index| SqlStatement::raw(sql::create_index(table, index))),
            );
        }
        statements
    }

    /// Recreate the schema
    ///
    /// All statements are submitted as one batch; if any fails, none is applied.
    pub async fn recreate(&self, tables: &TableSet) -> Result<(), SchemaError> {
        let statements = Self::statements(tables);
        self.client
            .batch(&statements)
            .await
            .map_err(|source| SchemaError::Batch { source })?;

        info!(
            "Recreated {} tables ({} statements)",
            tables.len(),
            statements.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::LocalDatabase;
    use crate::error::ClientError;
    use crate::schema::{ColumnDef, ColumnKind, ForeignKeyDef, IndexDef, TableSchema};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn blog_tables() -> TableSet {
        TableSet::new(vec![
            TableSchema::new(
                "posts",
                vec![
                    ColumnDef::new("id", ColumnKind::Number).primary_key(),
                    ColumnDef::new("title", ColumnKind::Text),
                ],
            ),
            TableSchema::new(
                "tags",
                vec![
                    ColumnDef::new("id", ColumnKind::Number).primary_key(),
                    ColumnDef::new("name", ColumnKind::Text),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_statement_order() {
        let tables = TableSet::new(vec![TableSchema::new(
            "posts",
            vec![
                ColumnDef::new("id", ColumnKind::Number).primary_key(),
                ColumnDef::new("title", ColumnKind::Text),
            ],
        )
        .with_index(IndexDef {
            name: None,
            on: vec!["title".to_string()],
            unique: false,
        })])
        .unwrap();

        let statements: Vec<String> = SchemaSynchronizer::statements(&tables)
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(statements.len(), 4);
        assert_eq!(statements[0], DEFER_FOREIGN_KEYS);
        assert!(statements[1].starts_with("DROP TABLE IF EXISTS \"posts\""));
        assert!(statements[2].starts_with("CREATE TABLE \"posts\""));
        assert!(statements[3].starts_with("CREATE INDEX \"posts_title_idx\""));
    }

    #[tokio::test]
    async fn test_recreate_blog_scenario() {
        let db = LocalDatabase::open_in_memory().unwrap();
        let tables = blog_tables();

        SchemaSynchronizer::new(&db).recreate(&tables).await.unwrap();

        assert_eq!(
            db.table_names().unwrap(),
            vec!["posts".to_string(), "tags".to_string()]
        );
        assert_eq!(db.table_count("posts").unwrap(), 0);
        assert_eq!(db.table_count("tags").unwrap(), 0);
        assert!(db.index_names("posts").unwrap().is_empty());
        assert!(db.index_names("tags").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recreate_is_idempotent() {
        let db = LocalDatabase::open_in_memory().unwrap();
        let tables = blog_tables();
        let sync = SchemaSynchronizer::new(&db);

        sync.recreate(&tables).await.unwrap();
        db.run(&SqlStatement::raw(
            "INSERT INTO posts (id, title) VALUES (1, 'hello')",
        ))
        .await
        .unwrap();
        assert_eq!(db.table_count("posts").unwrap(), 1);

        sync.recreate(&tables).await.unwrap();
        assert_eq!(db.table_count("posts").unwrap(), 0);
        assert_eq!(db.table_count("tags").unwrap(), 0);

        sync.recreate(&tables).await.unwrap();
        assert_eq!(db.table_count("posts").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recreate_with_circular_references() {
        let db = LocalDatabase::open_in_memory().unwrap();
        let tables = TableSet::new(vec![
            TableSchema::new(
                "authors",
                vec![
                    ColumnDef::new("id", ColumnKind::Number).primary_key(),
                    ColumnDef::new("favorite_post", ColumnKind::Number).optional(),
                ],
            )
            .with_foreign_key(ForeignKeyDef {
                columns: vec!["favorite_post".to_string()],
                references_table: "posts".to_string(),
                references_columns: vec!["id".to_string()],
            }),
            TableSchema::new(
                "posts",
                vec![
                    ColumnDef::new("id", ColumnKind::Number).primary_key(),
                    ColumnDef::new("author_id", ColumnKind::Number).references("authors", "id"),
                ],
            ),
        ])
        .unwrap();
        let sync = SchemaSynchronizer::new(&db);

        sync.recreate(&tables).await.unwrap();
        db.batch(&[
            SqlStatement::raw(DEFER_FOREIGN_KEYS),
            SqlStatement::raw("INSERT INTO authors (id, favorite_post) VALUES (1, 10)"),
            SqlStatement::raw("INSERT INTO posts (id, author_id) VALUES (10, 1)"),
        ])
        .await
        .unwrap();

        // Populated tables referencing each other are dropped in declaration order
        sync.recreate(&tables).await.unwrap();
        assert_eq!(db.table_count("authors").unwrap(), 0);
        assert_eq!(db.table_count("posts").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_keeps_previous_schema() {
        let db = LocalDatabase::open_in_memory().unwrap();
        let sync = SchemaSynchronizer::new(&db);
        sync.recreate(&blog_tables()).await.unwrap();
        db.run(&SqlStatement::raw(
            "INSERT INTO posts (id, title) VALUES (1, 'kept')",
        ))
        .await
        .unwrap();

        // The default expression is only rejected by SQLite, after `posts` was dropped
        let broken = TableSet::new(vec![
            TableSchema::new(
                "posts",
                vec![ColumnDef::new("id", ColumnKind::Number).primary_key()],
            ),
            TableSchema::new(
                "broken",
                vec![ColumnDef::new("x", ColumnKind::Text).default_value(
                    crate::schema::ColumnDefault::Sql {
                        sql: "not valid sql (".to_string(),
                    },
                )],
            ),
        ])
        .unwrap();

        let err = sync.recreate(&broken).await.unwrap_err();
        assert!(matches!(err, SchemaError::Batch { .. }));
        assert_eq!(db.table_count("posts").unwrap(), 1);
        assert!(!db.table_exists("broken").unwrap());
    }

    struct RecordingClient {
        batches: Mutex<Vec<Vec<SqlStatement>>>,
    }

    #[async_trait]
    impl DatabaseClient for RecordingClient {
        async fn run(&self, _statement: &SqlStatement) -> Result<(), ClientError> {
            Err(ClientError::Rejected("recreate must only batch".to_string()))
        }

        async fn batch(&self, statements: &[SqlStatement]) -> Result<(), ClientError> {
            self.batches.lock().unwrap().push(statements.to_vec());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_recreate_submits_single_batch() {
        let client = RecordingClient {
            batches: Mutex::new(Vec::new()),
        };
        SchemaSynchronizer::new(&client)
            .recreate(&blog_tables())
            .await
            .unwrap();

        let batches = client.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 5);
    }
}
