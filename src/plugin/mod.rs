//! Virtual module registry
//!
//! This is the plugin-host facing side of the engine. The host forwards its
//! `config_resolved`, `resolve_id` and `load` hooks here; the registry answers
//! with generated module source.
//!
//! # Resolution
//!
//! Importer code writes the public id [`PUBLIC_MODULE_ID`]. It resolves to one
//! of three internal ids:
//!
//! | state                | resolves to          | load does                      |
//! |----------------------|----------------------|--------------------------------|
//! | local backend        | [`ModuleIdentity::LocalImpl`]  | recreate, seed once, render local |
//! | remote backend       | [`ModuleIdentity::RemoteImpl`] | render remote                  |
//! | seed in progress     | [`ModuleIdentity::SeededImpl`] | render local, no recreate/seed |
//!
//! The seeded identity breaks the cycle created by seed scripts that import the
//! public module themselves.

use std::path::Path;
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::codegen::{self, Backend, BuildMode, GenerationTarget, OutputMode, SecretRef};
use crate::database::DatabaseClient;
use crate::error::{Error, Result};
use crate::schema::{SchemaSynchronizer, TableSet};
use crate::seed::{SeedExecutor, SeedGuard, SeedRunner, SeedSource};

/// Module id importer code writes
pub const PUBLIC_MODULE_ID: &str = "virtdb:db";

const LOCAL_IMPL_ID: &str = "\0virtdb:db";
const REMOTE_IMPL_ID: &str = "\0virtdb:db/remote";
const SEEDED_IMPL_ID: &str = "\0virtdb:db/seed";

/// Empty v3 source map returned when the host has source maps enabled
pub const EMPTY_SOURCE_MAP: &str = r#"{"version":3,"sources":[],"names":[],"mappings":""}"#;

/// Identity a module id resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleIdentity {
    Public,
    LocalImpl,
    RemoteImpl,
    SeededImpl,
}

impl ModuleIdentity {
    pub fn id(&self) -> &'static str {
        match self {
            ModuleIdentity::Public => PUBLIC_MODULE_ID,
            ModuleIdentity::LocalImpl => LOCAL_IMPL_ID,
            ModuleIdentity::RemoteImpl => REMOTE_IMPL_ID,
            ModuleIdentity::SeededImpl => SEEDED_IMPL_ID,
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            PUBLIC_MODULE_ID => Some(ModuleIdentity::Public),
            LOCAL_IMPL_ID => Some(ModuleIdentity::LocalImpl),
            REMOTE_IMPL_ID => Some(ModuleIdentity::RemoteImpl),
            SEEDED_IMPL_ID => Some(ModuleIdentity::SeededImpl),
            _ => None,
        }
    }
}

/// Services the plugin host provides to the engine
pub trait PluginHost: Send + Sync {
    /// Watch a file; a change invalidates the virtual module
    fn add_watch_file(&self, path: &Path);

    /// Surface an informational message to the user
    fn log_info(&self, message: &str) {
        info!("{}", message);
    }
}

/// Host command the session runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Build,
    Serve,
}

/// Values read from the host's resolved configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub command: Command,
    pub sourcemap: bool,
}

impl ResolvedConfig {
    pub fn build_mode(&self) -> BuildMode {
        match self.command {
            Command::Build => BuildMode::Build,
            Command::Serve => BuildMode::Dev,
        }
    }
}

/// Result of a successful load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutput {
    pub code: String,
    pub map: Option<String>,
}

/// Backend selection, fixed for the lifetime of the registry
#[derive(Debug, Clone)]
pub enum BackendSettings {
    Local {
        /// Default `file://` URL of the local database
        database_url: String,
    },
    Remote {
        default_url: String,
        app_token: Option<SecretRef>,
    },
}

/// Session settings
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub backend: BackendSettings,
    pub output_mode: OutputMode,
    pub tables: TableSet,
    pub seeds: Vec<SeedSource>,
}

/// Collaborators the registry drives
pub struct Collaborators {
    /// Client for the local database; unused with the remote backend
    pub client: Option<Arc<dyn DatabaseClient>>,
    pub seed_executor: Arc<dyn SeedExecutor>,
    pub host: Arc<dyn PluginHost>,
}

#[derive(Debug, Default)]
struct SessionState {
    materialized: bool,
}

/// Resolves and loads the virtual database module for one build or dev session
pub struct VirtualModuleRegistry {
    backend: Backend,
    primary: ModuleIdentity,
    local_database_url: Option<String>,
    output_mode: OutputMode,
    tables: TableSet,
    seeds: Vec<SeedSource>,
    collaborators: Collaborators,
    guard: SeedGuard,
    resolved: RwLock<Option<ResolvedConfig>>,
    session: Mutex<SessionState>,
}

impl VirtualModuleRegistry {
    /// Create a registry
    ///
    /// The remote backend requires an app token.
    pub fn new(settings: RegistrySettings, collaborators: Collaborators) -> Result<Self> {
        let (backend, primary, local_database_url) = match settings.backend {
            BackendSettings::Local { database_url } => (
                Backend::Local {
                    database_url: database_url.clone(),
                },
                ModuleIdentity::LocalImpl,
                Some(database_url),
            ),
            BackendSettings::Remote {
                default_url,
                app_token,
            } => {
                let app_token = app_token.ok_or_else(|| {
                    Error::Config(format!(
                        "the remote backend needs an app token; set {}",
                        codegen::APP_TOKEN_ENV
                    ))
                })?;
                (
                    Backend::Remote {
                        default_url,
                        app_token,
                    },
                    ModuleIdentity::RemoteImpl,
                    None,
                )
            }
        };

        Ok(Self {
            backend,
            primary,
            local_database_url,
            output_mode: settings.output_mode,
            tables: settings.tables,
            seeds: settings.seeds,
            collaborators,
            guard: SeedGuard::new(),
            resolved: RwLock::new(None),
            session: Mutex::new(SessionState::default()),
        })
    }

    /// Reentrancy guard of this session
    pub fn seed_guard(&self) -> &SeedGuard {
        &self.guard
    }

    /// `configResolved` hook
    pub fn config_resolved(&self, config: ResolvedConfig) {
        debug!("Resolved host config: {:?}", config);
        if let Ok(mut resolved) = self.resolved.write() {
            *resolved = Some(config);
        }
    }

    fn resolved_config(&self) -> Result<ResolvedConfig> {
        self.resolved
            .read()
            .ok()
            .and_then(|r| *r)
            .ok_or_else(|| Error::internal("module loaded before the host configuration was resolved"))
    }

    /// `resolveId` hook
    ///
    /// Ids other than the public one are declined.
    pub fn resolve_id(&self, source: &str) -> Option<&'static str> {
        if source != PUBLIC_MODULE_ID {
            return None;
        }
        let identity = if self.guard.is_in_progress() {
            ModuleIdentity::SeededImpl
        } else {
            self.primary
        };
        Some(identity.id())
    }

    /// `load` hook
    ///
    /// Returns `Ok(None)` for ids this registry does not own.
    pub async fn load(&self, id: &str) -> Result<Option<LoadOutput>> {
        let identity = match ModuleIdentity::from_id(id) {
            Some(ModuleIdentity::Public) | None => return Ok(None),
            Some(identity) => identity,
        };
        let config = self.resolved_config()?;

        let code = match identity {
            ModuleIdentity::RemoteImpl => self.render(&self.backend, config),
            // Re-entered from a running seed: bindings only
            ModuleIdentity::SeededImpl => self.render(&self.local_backend()?, config),
            ModuleIdentity::LocalImpl => {
                self.materialize().await?;
                self.render(&self.local_backend()?, config)
            }
            ModuleIdentity::Public => return Ok(None),
        };

        Ok(Some(LoadOutput {
            code,
            map: config.sourcemap.then(|| EMPTY_SOURCE_MAP.to_string()),
        }))
    }

    fn local_backend(&self) -> Result<Backend> {
        self.local_database_url
            .as_ref()
            .map(|database_url| Backend::Local {
                database_url: database_url.clone(),
            })
            .ok_or_else(|| Error::internal("local module requested for a remote session"))
    }

    fn render(&self, backend: &Backend, config: ResolvedConfig) -> String {
        codegen::render(
            &self.tables,
            &GenerationTarget {
                backend: backend.clone(),
                build_mode: config.build_mode(),
                output_mode: self.output_mode,
            },
        )
    }

    /// Recreate and seed once per session
    ///
    /// Holds the session lock for the whole sequence so concurrent loads wait for
    /// the first one. Seed scripts re-entering the registry resolve to the seeded
    /// identity, whose load never takes this lock.
    async fn materialize(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.materialized {
            return Ok(());
        }

        let client = self
            .collaborators
            .client
            .as_deref()
            .ok_or_else(|| Error::internal("local database client was not configured"))?;

        SchemaSynchronizer::new(client).recreate(&self.tables).await?;
        SeedRunner::new(
            self.collaborators.seed_executor.as_ref(),
            self.collaborators.host.as_ref(),
        )
        .run_all(&self.seeds, &self.guard)
        .await?;

        session.materialized = true;
        Ok(())
    }

    /// Whether the current session has recreated and seeded the schema
    pub async fn is_materialized(&self) -> bool {
        self.session.lock().await.materialized
    }

    /// A watched file changed: the next load restarts from a fresh schema
    pub async fn invalidate(&self, changed: Option<&Path>) {
        if let Some(path) = changed {
            info!("{} changed, database will be recreated", path.display());
        }
        self.session.lock().await.materialized = false;
    }

    /// Build finished: drop all cached session state
    pub async fn build_end(&self) {
        *self.session.lock().await = SessionState::default();
        if let Ok(mut resolved) = self.resolved.write() {
            *resolved = None;
        }
    }
}
