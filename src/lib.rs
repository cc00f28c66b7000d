#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! virtdb - Virtual-module database engine for build pipelines
//!
//! virtdb lets site code import a database client from a virtual module. Behind
//! that import it recreates the declared schema, runs seed scripts once per
//! session and generates the module source for the current build mode. It can be
//! used as a library by a plugin host or through the `virtdb` command-line tool.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `cli` | `virtdb` binary (default) | `clap`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only
//! virtdb = { version = "0.3", default-features = false }
//! ```
//!
//! # Architecture
//!
//! - **[`schema`]**: table definitions, DDL rendering and [`SchemaSynchronizer`]
//! - **[`seed`]**: seed sources, [`SeedRunner`] and the session [`SeedGuard`]
//! - **[`codegen`]**: typed module IR, the token matrix and type declarations
//! - **[`plugin`]**: [`VirtualModuleRegistry`], the host-facing hooks
//! - **[`content`]**: [`ContentSyncPipeline`], collection type generation
//! - **[`database`]**: the [`DatabaseClient`] seam and the embedded SQLite client
//! - **[`config`]**: project configuration
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use virtdb::{
//!     Collaborators, Command, LocalDatabase, ResolvedConfig, SqlScriptExecutor,
//!     VirtdbConfig, VirtualModuleRegistry, PUBLIC_MODULE_ID,
//! };
//!
//! let config = VirtdbConfig::new(Path::new("."))?;
//! let db = Arc::new(LocalDatabase::open(Some(&config.sqlite_path()))?);
//! let registry = VirtualModuleRegistry::new(
//!     config.registry_settings(config.load_tables()?),
//!     Collaborators {
//!         client: Some(db.clone()),
//!         seed_executor: Arc::new(SqlScriptExecutor::new(db)),
//!         host: Arc::new(my_host),
//!     },
//! )?;
//!
//! registry.config_resolved(ResolvedConfig { command: Command::Serve, sourcemap: false });
//! if let Some(id) = registry.resolve_id(PUBLIC_MODULE_ID) {
//!     let module = registry.load(id).await?;
//! }
//! ```

pub mod codegen;
pub mod config;
pub mod content;
pub mod database;
pub mod error;
pub mod plugin;
pub mod schema;
pub mod seed;

// =============================================================================
// Configuration and errors
// =============================================================================

pub use config::VirtdbConfig;
pub use error::{
    ClientError, Error, ErrorLocation, Result, SchemaError, SeedError, SyncError,
    UserConfigError, UserErrorKind,
};

// =============================================================================
// Engine
// =============================================================================

pub use codegen::{Backend, BuildMode, GenerationTarget, OutputMode, SecretRef};
pub use content::{ContentSyncPipeline, FsEvaluatorFactory, SyncSettings, TypesGeneratedInfo};
pub use database::{DatabaseClient, LocalDatabase, SqlStatement};
pub use plugin::{
    BackendSettings, Collaborators, Command, LoadOutput, ModuleIdentity, PluginHost,
    RegistrySettings, ResolvedConfig, VirtualModuleRegistry, PUBLIC_MODULE_ID,
};
pub use schema::{SchemaSynchronizer, TableSchema, TableSet};
pub use seed::{SeedExecutor, SeedGuard, SeedReport, SeedRunner, SeedSource, SqlScriptExecutor};
