//! Module evaluator abstraction
//!
//! The content pipeline loads user configuration through an isolated evaluator
//! instance. Evaluators report failures through an [`ErrorBridge`] that stands
//! in for their usual event channel.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use crate::error::UserConfigError;

/// Startup options of an isolated evaluator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorOptions {
    pub root: PathBuf,
    /// Run without binding a server of its own
    pub middleware_mode: bool,
    pub hmr: bool,
}

impl EvaluatorOptions {
    /// Options for a one-shot evaluator: middleware mode, no hot reload
    pub fn isolated(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            middleware_mode: true,
            hmr: false,
        }
    }
}

/// Failure reported by an evaluator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvaluatorError {
    /// Caused by the user's own files
    #[error(transparent)]
    User(UserConfigError),
    #[error("{0}")]
    Other(String),
}

impl EvaluatorError {
    pub fn other(message: impl Into<String>) -> Self {
        EvaluatorError::Other(message.into())
    }
}

/// Events an evaluator would normally push to connected clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    FullReload,
    Error(EvaluatorError),
}

/// Replacement event channel for isolated evaluators
///
/// Error events are returned to the sender as `Err` and recorded, so the
/// pipeline still sees them when the evaluator ignores the return value.
#[derive(Debug, Clone, Default)]
pub struct ErrorBridge {
    recorded: Arc<Mutex<Option<EvaluatorError>>>,
}

impl ErrorBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&self, event: HostEvent) -> Result<(), EvaluatorError> {
        match event {
            HostEvent::Error(err) => {
                if let Ok(mut recorded) = self.recorded.lock() {
                    // First error wins
                    recorded.get_or_insert_with(|| err.clone());
                }
                Err(err)
            }
            _ => Ok(()),
        }
    }

    /// Take the first recorded error, if any
    pub fn take_error(&self) -> Option<EvaluatorError> {
        self.recorded.lock().ok().and_then(|mut r| r.take())
    }
}

/// A running module evaluator
#[async_trait]
pub trait ModuleEvaluator: Send + Sync {
    /// Evaluate the content configuration found in `content_dir`
    async fn load_config(&self, content_dir: &Path) -> Result<serde_json::Value, EvaluatorError>;

    /// Stop the evaluator and release its resources
    async fn shutdown(&self);
}

/// Starts evaluators for the pipeline
#[async_trait]
pub trait EvaluatorFactory: Send + Sync {
    async fn create(
        &self,
        options: EvaluatorOptions,
        bridge: ErrorBridge,
    ) -> Result<Box<dyn ModuleEvaluator>, EvaluatorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UserErrorKind;

    #[test]
    fn test_isolated_options() {
        let options = EvaluatorOptions::isolated("/site");
        assert!(options.middleware_mode);
        assert!(!options.hmr);
        assert_eq!(options.root, PathBuf::from("/site"));
    }

    #[test]
    fn test_bridge_rejects_and_records_errors() {
        let bridge = ErrorBridge::new();
        assert!(bridge.send(HostEvent::FullReload).is_ok());
        assert_eq!(bridge.take_error(), None);

        let first = EvaluatorError::User(UserConfigError {
            kind: UserErrorKind::Syntax,
            message: "unexpected token".to_string(),
            hint: None,
            location: None,
        });
        let clone = bridge.clone();
        assert_eq!(clone.send(HostEvent::Error(first.clone())), Err(first.clone()));
        let _ = clone.send(HostEvent::Error(EvaluatorError::other("second")));

        assert_eq!(bridge.take_error(), Some(first));
        assert_eq!(bridge.take_error(), None);
    }
}
