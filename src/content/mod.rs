//! Content type synchronization
//!
//! [`ContentSyncPipeline::sync`] starts an isolated evaluator, loads the content
//! configuration through it and writes collection type declarations. The
//! evaluator is shut down on every path.

pub mod evaluator;
mod fs_evaluator;
pub mod types;

pub use evaluator::{
    ErrorBridge, EvaluatorError, EvaluatorFactory, EvaluatorOptions, HostEvent, ModuleEvaluator,
};
pub use fs_evaluator::{FsEvaluator, FsEvaluatorFactory, CONTENT_CONFIG_FILES};
pub use types::{
    render_content_declarations, CollectionDef, CollectionKind, ContentConfig, FieldDef,
    CONTENT_TYPES_FILE,
};

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::SyncError;

/// Content directory relative to the project root
pub const CONTENT_DIR: &str = "src/content";
/// Generated-files directory relative to the project root
pub const GENERATED_DIR: &str = ".virtdb";

/// Paths a sync run works with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub root: PathBuf,
    pub content_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl SyncSettings {
    /// Conventional layout under a project root
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            content_dir: root.join(CONTENT_DIR),
            output_dir: root.join(GENERATED_DIR),
            root,
        }
    }

    pub fn types_path(&self) -> PathBuf {
        self.output_dir.join(CONTENT_TYPES_FILE)
    }
}

/// Outcome of a successful sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypesGeneratedInfo {
    pub content_dir_found: bool,
    pub types_generated: bool,
}

fn classify(err: EvaluatorError) -> SyncError {
    match err {
        EvaluatorError::User(user) => SyncError::UserConfig(user),
        EvaluatorError::Other(inner) => SyncError::TypeGenerationFailed { inner },
    }
}

/// A missing path or a non-directory counts as absent; any other lookup failure is an error
fn content_dir_present(path: &Path, metadata: io::Result<Metadata>) -> Result<bool, SyncError> {
    match metadata {
        Ok(m) => Ok(m.is_dir()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(SyncError::ContentDir {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub struct ContentSyncPipeline {
    factory: Arc<dyn EvaluatorFactory>,
}

impl ContentSyncPipeline {
    pub fn new(factory: Arc<dyn EvaluatorFactory>) -> Self {
        Self { factory }
    }

    pub async fn sync(&self, settings: &SyncSettings) -> Result<TypesGeneratedInfo, SyncError> {
        let metadata = tokio::fs::metadata(&settings.content_dir).await;
        if !content_dir_present(&settings.content_dir, metadata)? {
            debug!(
                "No content directory at {}, skipping type generation",
                settings.content_dir.display()
            );
            return Ok(TypesGeneratedInfo {
                content_dir_found: false,
                types_generated: false,
            });
        }

        let bridge = ErrorBridge::new();
        let evaluator = self
            .factory
            .create(EvaluatorOptions::isolated(&settings.root), bridge.clone())
            .await
            .map_err(classify)?;

        let result = Self::generate(evaluator.as_ref(), &bridge, settings).await;
        evaluator.shutdown().await;
        result
    }

    async fn generate(
        evaluator: &dyn ModuleEvaluator,
        bridge: &ErrorBridge,
        settings: &SyncSettings,
    ) -> Result<TypesGeneratedInfo, SyncError> {
        let loaded = evaluator.load_config(&settings.content_dir).await;

        // An error sent through the bridge wins even if the evaluator swallowed it
        let value = match (bridge.take_error(), loaded) {
            (Some(err), _) | (None, Err(err)) => return Err(classify(err)),
            (None, Ok(value)) => value,
        };

        let config = ContentConfig::from_value(value).map_err(SyncError::UserConfig)?;
        let declarations = render_content_declarations(&config);

        let path = settings.types_path();
        tokio::fs::create_dir_all(&settings.output_dir)
            .await
            .map_err(|source| SyncError::Write {
                path: settings.output_dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, declarations)
            .await
            .map_err(|source| SyncError::Write {
                path: path.clone(),
                source,
            })?;

        info!(
            "Generated types for {} collections at {}",
            config.collections.len(),
            path.display()
        );
        Ok(TypesGeneratedInfo {
            content_dir_found: true,
            types_generated: true,
        })
    }
}
