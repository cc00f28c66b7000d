//! Database module
//!
//! This module provides the database seam the engine works against:
//!
//! - **client**: the [`DatabaseClient`] trait (`run` and `batch`) and raw SQL statements
//! - **connection**: [`LocalDatabase`], the embedded SQLite implementation, plus
//!   database URL helpers
//!
//! # Usage
//!
//! ```rust,ignore
//! use virtdb::database::{DatabaseClient, LocalDatabase, SqlStatement};
//!
//! let db = LocalDatabase::open_url("file:///srv/site/.virtdb/content.db")?;
//! db.batch(&[
//!     SqlStatement::raw("CREATE TABLE posts (id integer PRIMARY KEY)"),
//!     SqlStatement::raw("INSERT INTO posts (id) VALUES (1)"),
//! ])
//! .await?;
//! ```

mod client;
mod connection;

pub use client::{DatabaseClient, SqlStatement};
pub use connection::{database_path_from_url, file_url, LocalDatabase};
