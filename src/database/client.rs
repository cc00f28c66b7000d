//! Database client seam
//!
//! The engine never talks to a database directly. It hands raw SQL statements to
//! a [`DatabaseClient`], which is either the bundled [`LocalDatabase`] or a host
//! supplied implementation.
//!
//! [`LocalDatabase`]: crate::database::LocalDatabase

use std::fmt;

use async_trait::async_trait;

use crate::error::ClientError;

/// A raw SQL statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    sql: String,
}

impl SqlStatement {
    pub fn raw(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.sql
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Minimal client interface consumed by schema recreation and SQL seeding
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Execute a single statement
    async fn run(&self, statement: &SqlStatement) -> Result<(), ClientError>;

    /// Execute all statements atomically: either every statement applies or none does
    async fn batch(&self, statements: &[SqlStatement]) -> Result<(), ClientError>;
}
