//! SQL seed scripts

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::database::{DatabaseClient, SqlStatement};
use crate::error::BoxError;
use crate::seed::{SeedExecutor, SeedSource};

/// Runs `.sql` seed scripts against a database client
///
/// Each script is submitted as a single batch, so a failing script leaves no
/// partial data behind. Other file types are rejected.
pub struct SqlScriptExecutor {
    client: Arc<dyn DatabaseClient>,
}

impl SqlScriptExecutor {
    pub fn new(client: Arc<dyn DatabaseClient>) -> Self {
        Self { client }
    }

    /// Whether this executor can run the file at `path`
    pub fn supports(path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
    }

    /// The sources this executor can run; script seeds that exist are reported and left out
    pub fn supported_sources(sources: &[SeedSource]) -> Vec<SeedSource> {
        sources
            .iter()
            .filter(|source| {
                let supported = Self::supports(&source.path);
                if !supported && source.path.exists() {
                    warn!(
                        "Skipping {}: only .sql seed files can run here",
                        source.path.display()
                    );
                }
                supported
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SeedExecutor for SqlScriptExecutor {
    async fn execute(&self, source: &SeedSource) -> Result<(), BoxError> {
        if !Self::supports(&source.path) {
            return Err(format!(
                "cannot execute '{}': only .sql seed files are supported by this executor",
                source.path.display()
            )
            .into());
        }

        let script = tokio::fs::read_to_string(&source.path).await?;
        if script.trim().is_empty() {
            return Ok(());
        }
        self.client.batch(&[SqlStatement::raw(script)]).await?;
        Ok(())
    }
}
