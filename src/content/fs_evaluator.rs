//! File-based evaluator for declarative content configuration
//!
//! Reads `config.toml` or `config.json` from the content directory with the
//! `config` crate. Script configurations need a JavaScript evaluator provided by
//! the host through [`EvaluatorFactory`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use config::ConfigError;
use tracing::debug;

use crate::content::evaluator::{
    ErrorBridge, EvaluatorError, EvaluatorFactory, EvaluatorOptions, HostEvent, ModuleEvaluator,
};
use crate::error::{ErrorLocation, UserConfigError, UserErrorKind};

/// Configuration file names, in lookup order
pub const CONTENT_CONFIG_FILES: &[&str] = &["config.toml", "config.json"];

pub struct FsEvaluator {
    options: EvaluatorOptions,
    bridge: ErrorBridge,
    closed: AtomicBool,
}

impl FsEvaluator {
    pub fn new(options: EvaluatorOptions, bridge: ErrorBridge) -> Self {
        Self {
            options,
            bridge,
            closed: AtomicBool::new(false),
        }
    }

    fn find_config(content_dir: &Path) -> Option<PathBuf> {
        CONTENT_CONFIG_FILES
            .iter()
            .map(|name| content_dir.join(name))
            .find(|path| path.is_file())
    }

    fn read(path: &Path) -> Result<serde_json::Value, EvaluatorError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(|e| classify(path, e))?;
        settings
            .try_deserialize::<serde_json::Value>()
            .map_err(|e| classify(path, e))
    }

    fn report(&self, err: EvaluatorError) -> EvaluatorError {
        // The bridge rejects error events; the returned value is the same error
        match self.bridge.send(HostEvent::Error(err)) {
            Err(err) => err,
            Ok(()) => EvaluatorError::other("error event was not rejected"),
        }
    }
}

fn classify(path: &Path, err: ConfigError) -> EvaluatorError {
    match err {
        ConfigError::FileParse { cause, .. } => EvaluatorError::User(UserConfigError {
            kind: UserErrorKind::Syntax,
            message: format!("failed to parse {}: {}", path.display(), cause),
            hint: Some("check the syntax of your content configuration file".to_string()),
            location: Some(ErrorLocation {
                file: path.to_path_buf(),
                line: None,
                column: None,
            }),
        }),
        ConfigError::Type { .. } | ConfigError::Message(_) => {
            EvaluatorError::User(UserConfigError {
                kind: UserErrorKind::InvalidConfig,
                message: format!("invalid content configuration in {}: {}", path.display(), err),
                hint: None,
                location: Some(ErrorLocation {
                    file: path.to_path_buf(),
                    line: None,
                    column: None,
                }),
            })
        }
        other => EvaluatorError::other(format!(
            "failed to read {}: {}",
            path.display(),
            other
        )),
    }
}

#[async_trait]
impl ModuleEvaluator for FsEvaluator {
    async fn load_config(&self, content_dir: &Path) -> Result<serde_json::Value, EvaluatorError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EvaluatorError::other("evaluator has been shut down"));
        }

        let dir = if content_dir.is_absolute() {
            content_dir.to_path_buf()
        } else {
            self.options.root.join(content_dir)
        };

        match Self::find_config(&dir) {
            Some(path) => {
                debug!("Loading content config {}", path.display());
                Self::read(&path).map_err(|e| self.report(e))
            }
            None => {
                debug!("No content config in {}", dir.display());
                Ok(serde_json::Value::Null)
            }
        }
    }

    async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Creates [`FsEvaluator`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct FsEvaluatorFactory;

#[async_trait]
impl EvaluatorFactory for FsEvaluatorFactory {
    async fn create(
        &self,
        options: EvaluatorOptions,
        bridge: ErrorBridge,
    ) -> Result<Box<dyn ModuleEvaluator>, EvaluatorError> {
        Ok(Box::new(FsEvaluator::new(options, bridge)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator(root: &Path) -> (FsEvaluator, ErrorBridge) {
        let bridge = ErrorBridge::new();
        (
            FsEvaluator::new(EvaluatorOptions::isolated(root), bridge.clone()),
            bridge,
        )
    }

    #[tokio::test]
    async fn test_loads_toml_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            r#"
[[collections]]
name = "blog"
kind = "content"
fields = [{ name = "title", kind = "text" }]
"#,
        )
        .unwrap();

        let (evaluator, bridge) = evaluator(dir.path());
        let value = evaluator.load_config(dir.path()).await.unwrap();
        assert_eq!(value["collections"][0]["name"], "blog");
        assert_eq!(value["collections"][0]["fields"][0]["kind"], "text");
        assert_eq!(bridge.take_error(), None);
    }

    #[tokio::test]
    async fn test_missing_config_is_null() {
        let dir = tempfile::tempdir().unwrap();
        let (evaluator, _) = evaluator(dir.path());
        assert!(evaluator.load_config(dir.path()).await.unwrap().is_null());
    }

    #[tokio::test]
    async fn test_parse_error_is_user_error_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[[collections]\nname = ").unwrap();

        let (evaluator, bridge) = evaluator(dir.path());
        let err = evaluator.load_config(dir.path()).await.unwrap_err();
        match &err {
            EvaluatorError::User(user) => {
                assert_eq!(user.kind, UserErrorKind::Syntax);
                assert!(user.hint.is_some());
                assert_eq!(
                    user.location.as_ref().map(|l| l.file.clone()),
                    Some(dir.path().join("config.toml"))
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(bridge.take_error(), Some(err));
    }

    #[tokio::test]
    async fn test_load_after_shutdown_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (evaluator, _) = evaluator(dir.path());
        evaluator.shutdown().await;
        assert!(matches!(
            evaluator.load_config(dir.path()).await,
            Err(EvaluatorError::Other(_))
        ));
    }
}
