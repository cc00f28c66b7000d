use anyhow::{anyhow, Result};
use config::Config;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::codegen::{OutputMode, SecretRef};
use crate::content::SyncSettings;
use crate::database::file_url;
use crate::plugin::{BackendSettings, RegistrySettings};
use crate::schema::TableSet;
use crate::seed::{session_seeds, SeedSource};

/// Project configuration file name, relative to the project root
pub const CONFIG_FILE: &str = "virtdb.toml";

/// Local database file, relative to the project root
pub const LOCAL_DATABASE_FILE: &str = ".virtdb/content.db";

/// Table definition file names under the data directory, in lookup order
pub const TABLES_FILES: &[&str] = &["config.toml", "config.json"];

const DEFAULT_DB_DIR: &str = "db";
const DEFAULT_REMOTE_URL: &str = "https://db.virtdb.dev";

#[derive(Clone)]
pub struct VirtdbConfig {
    /// Project root all other paths are relative to
    pub root: PathBuf,

    /// Data directory holding table definitions and seed files
    pub db_dir: String,

    /// Bind the generated module to the hosted database
    pub remote: bool,

    /// Hosted database URL used when no runtime override is set
    pub remote_url: String,

    /// Output mode of the site build
    pub output: OutputMode,

    /// Token for the hosted database
    pub app_token: Option<String>,

    /// Seed files registered by integrations, relative to the root
    pub integration_seeds: Vec<PathBuf>,
}

const EMPTY_CONFIG: &str = r#"### virtdb configuration file

### directory holding config.toml (table definitions) and seed files
# db_dir = "db"

### use the hosted database instead of .virtdb/content.db
# remote = false
# remote_url = "https://db.virtdb.dev"

### "static" (prerendered) or "server" (rendered per request)
# output = "static"

### seed files registered by integrations, run before db/seed.*
# integration_seeds = []

### the app token is read from VIRTDB_APP_TOKEN; do not commit it here
"#;

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    db_dir: Option<String>,
    remote: Option<bool>,
    remote_url: Option<String>,
    output: Option<OutputMode>,
    app_token: Option<String>,
    #[serde(default)]
    integration_seeds: Vec<PathBuf>,
}

impl Default for VirtdbConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            db_dir: DEFAULT_DB_DIR.to_string(),
            remote: false,
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            output: OutputMode::default(),
            app_token: None,
            integration_seeds: Vec::new(),
        }
    }
}

impl VirtdbConfig {
    /// Load the configuration of the project at `root`
    ///
    /// Reads `<root>/.env` first, then `<root>/virtdb.toml` (created from a
    /// template when missing), then `VIRTDB_*` environment variables.
    pub fn new(root: &Path) -> Result<VirtdbConfig> {
        let env_file = root.join(".env");
        if env_file.exists() {
            dotenvy::from_path(&env_file)
                .map_err(|e| anyhow!("Unable to load {}: {}", env_file.display(), e))?;
        }

        // E.g., `VIRTDB_OUTPUT=server virtdb render --build` would switch to server output
        Self::with_environment(root, config::Environment::with_prefix("VIRTDB"))
    }

    fn with_environment(root: &Path, environment: config::Environment) -> Result<VirtdbConfig> {
        let mut builder = Config::builder();

        let path = root.join(CONFIG_FILE);
        if path.exists() {
            builder = builder.add_source(config::File::from(path.as_path()));
        } else {
            std::fs::write(&path, EMPTY_CONFIG).map_err(|e| {
                anyhow!("Unable to create config file {}: {}", path.display(), e)
            })?;
        }

        builder = builder.add_source(environment);

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let raw = settings
            .try_deserialize::<RawConfig>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        let defaults = VirtdbConfig::default();
        Ok(VirtdbConfig {
            root: root.to_path_buf(),
            db_dir: raw.db_dir.unwrap_or(defaults.db_dir),
            remote: raw.remote.unwrap_or(defaults.remote),
            remote_url: raw.remote_url.unwrap_or(defaults.remote_url),
            output: raw.output.unwrap_or(defaults.output),
            app_token: raw.app_token.filter(|t| !t.is_empty()),
            integration_seeds: raw.integration_seeds,
        })
    }

    /// Get the config file path
    pub fn config_file_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Get the data directory
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(&self.db_dir)
    }

    /// Get the path to the table definitions, preferring an existing file
    pub fn tables_path(&self) -> PathBuf {
        let data_dir = self.data_dir();
        TABLES_FILES
            .iter()
            .map(|name| data_dir.join(name))
            .find(|p| p.exists())
            .unwrap_or_else(|| data_dir.join(TABLES_FILES[0]))
    }

    /// Get the path to the local SQLite database file
    pub fn sqlite_path(&self) -> PathBuf {
        self.root.join(LOCAL_DATABASE_FILE)
    }

    /// Default `file://` URL of the local database
    pub fn database_url(&self) -> String {
        file_url(&self.sqlite_path())
    }

    /// Integration seeds first, then the conventional seed files
    pub fn seeds(&self) -> Vec<SeedSource> {
        let integration: Vec<PathBuf> = self
            .integration_seeds
            .iter()
            .map(|p| self.root.join(p))
            .collect();
        session_seeds(&integration, &self.data_dir())
    }

    /// Load the declared tables
    pub fn load_tables(&self) -> Result<TableSet> {
        TableSet::load(&self.tables_path())
    }

    /// Registry settings for a session over the given tables
    pub fn registry_settings(&self, tables: TableSet) -> RegistrySettings {
        let backend = if self.remote {
            BackendSettings::Remote {
                default_url: self.remote_url.clone(),
                app_token: self.app_token.clone().map(SecretRef::new),
            }
        } else {
            BackendSettings::Local {
                database_url: self.database_url(),
            }
        };
        RegistrySettings {
            backend,
            output_mode: self.output,
            tables,
            seeds: self.seeds(),
        }
    }

    /// Content sync paths for this project
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings::for_root(&self.root)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Project Root:       {}", self.root.display()),
            format!("Config File:        {}", self.config_file_path().display()),
            format!("Data Directory:     {}", self.data_dir().display()),
            format!("Tables File:        {}", self.tables_path().display()),
            format!(
                "Backend:            {}",
                if self.remote { "remote" } else { "local" }
            ),
            format!("Output Mode:        {:?}", self.output),
        ];

        if self.remote {
            lines.push(format!("Remote URL:         {}", self.remote_url));
            lines.push(format!(
                "App Token:          {}",
                if self.app_token.is_some() {
                    "set"
                } else {
                    "missing"
                }
            ));
        } else {
            lines.push(format!("SQLite Path:        {}", self.sqlite_path().display()));
        }

        for seed in self.seeds().iter().filter(|s| s.path.exists()) {
            lines.push(format!("Seed File:          {}", seed.path.display()));
        }

        lines.join("\n")
    }
}
