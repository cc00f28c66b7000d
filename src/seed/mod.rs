//! Seeding
//!
//! Seed sources populate a freshly recreated schema. They come in two classes:
//!
//! - **integration** sources, registered explicitly; a missing one is an error
//! - **conventional** sources, fixed file names under the data directory; a
//!   missing one is skipped
//!
//! Integration sources always run before conventional ones. While sources run,
//! the session's [`SeedGuard`] is set so that a seed importing the public
//! database module resolves to the seeded module instead of triggering another
//! recreate-and-seed cycle.

mod sql;

pub use sql::SqlScriptExecutor;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{BoxError, SeedError};
use crate::plugin::PluginHost;

/// Conventional seed file names, resolved relative to the data directory
pub const CONVENTIONAL_SEED_FILES: &[&str] = &["seed.sql", "seed.js", "seed.mjs", "seed.ts", "seed.mts"];

/// Message emitted once seeding has finished
pub const SEED_COMPLETE_MESSAGE: &str = "Seeded database";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedProvenance {
    /// Explicitly registered by an integration
    Integration,
    /// Discovered by file name convention
    Conventional,
}

/// A locatable seed script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSource {
    pub path: PathBuf,
    pub provenance: SeedProvenance,
}

impl SeedSource {
    pub fn integration(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            provenance: SeedProvenance::Integration,
        }
    }

    pub fn conventional(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            provenance: SeedProvenance::Conventional,
        }
    }
}

/// Candidate conventional seed sources under a data directory, in lookup order
pub fn conventional_seeds(data_dir: &Path) -> Vec<SeedSource> {
    CONVENTIONAL_SEED_FILES
        .iter()
        .map(|name| SeedSource::conventional(data_dir.join(name)))
        .collect()
}

/// All seed sources of a session: integration sources first, then conventional ones
pub fn session_seeds(integration: &[PathBuf], data_dir: &Path) -> Vec<SeedSource> {
    integration
        .iter()
        .cloned()
        .map(SeedSource::integration)
        .chain(conventional_seeds(data_dir))
        .collect()
}

/// Reentrancy guard shared by the registry and the seed runner of one session
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct SeedGuard {
    in_progress: Arc<AtomicBool>,
}

impl SeedGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether seed sources are currently running
    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Set the flag until the returned scope is dropped
    fn enter(&self) -> SeedScope<'_> {
        self.in_progress.store(true, Ordering::SeqCst);
        SeedScope { guard: self }
    }
}

/// Clears the guard on drop, including when seeding fails
struct SeedScope<'a> {
    guard: &'a SeedGuard,
}

impl Drop for SeedScope<'_> {
    fn drop(&mut self) {
        self.guard.in_progress.store(false, Ordering::SeqCst);
    }
}

/// Runs one seed source
#[async_trait]
pub trait SeedExecutor: Send + Sync {
    async fn execute(&self, source: &SeedSource) -> Result<(), BoxError>;
}

/// Outcome of a seeding run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub executed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

enum Resolution {
    Present,
    Absent,
}

async fn resolve(source: &SeedSource) -> Result<Resolution, SeedError> {
    match tokio::fs::metadata(&source.path).await {
        Ok(meta) if meta.is_file() => Ok(Resolution::Present),
        Ok(_) => Ok(Resolution::Absent),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Resolution::Absent),
        // Present but unreadable is not the same as absent
        Err(e) => Err(SeedError::Unreadable {
            path: source.path.clone(),
            source: e,
        }),
    }
}

/// Executes seed sources under the session's reentrancy guard
pub struct SeedRunner<'a> {
    executor: &'a dyn SeedExecutor,
    host: &'a dyn PluginHost,
}

impl<'a> SeedRunner<'a> {
    pub fn new(executor: &'a dyn SeedExecutor, host: &'a dyn PluginHost) -> Self {
        Self { executor, host }
    }

    /// Run every resolvable source, integration sources first
    ///
    /// Every candidate path is registered with the host's file watcher, including
    /// conventional files that do not exist yet. All sources are resolved before
    /// any of them runs, so a missing integration source fails the run without
    /// side effects.
    pub async fn run_all(
        &self,
        sources: &[SeedSource],
        guard: &SeedGuard,
    ) -> Result<SeedReport, SeedError> {
        let ordered = sources
            .iter()
            .filter(|s| s.provenance == SeedProvenance::Integration)
            .chain(
                sources
                    .iter()
                    .filter(|s| s.provenance == SeedProvenance::Conventional),
            );

        let mut report = SeedReport::default();
        let mut runnable = Vec::new();
        for source in ordered {
            self.host.add_watch_file(&source.path);
            match (resolve(source).await?, source.provenance) {
                (Resolution::Present, _) => runnable.push(source),
                (Resolution::Absent, SeedProvenance::Integration) => {
                    return Err(SeedError::MissingIntegrationSeed {
                        path: source.path.clone(),
                    });
                }
                (Resolution::Absent, SeedProvenance::Conventional) => {
                    debug!("No seed file at {}", source.path.display());
                    report.skipped.push(source.path.clone());
                }
            }
        }

        let _scope = guard.enter();
        for source in runnable {
            debug!("Running seed file {}", source.path.display());
            self.executor
                .execute(source)
                .await
                .map_err(|e| SeedError::Failed {
                    path: source.path.clone(),
                    source: e,
                })?;
            report.executed.push(source.path.clone());
        }

        info!(
            "{} ({} executed, {} skipped)",
            SEED_COMPLETE_MESSAGE,
            report.executed.len(),
            report.skipped.len()
        );
        self.host.log_info(SEED_COMPLETE_MESSAGE);
        Ok(report)
    }
}
