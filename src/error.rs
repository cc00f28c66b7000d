//! Error types
//!
//! Each component reports a tagged error enum. [`Error`] is what the plugin host
//! boundary sees; every component error converts into it.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error produced by host-provided collaborators (seed executors, evaluators)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type used at the plugin host boundary
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error surfaced to the plugin host
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Invalid or incomplete user configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// A value that must have been provided by a collaborator is missing
    #[error("internal error: {message}. This is a bug, please file an issue")]
    Internal { message: String },
}

impl Error {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Errors raised by a [`DatabaseClient`](crate::database::DatabaseClient)
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Statement rejected by the backend
    #[error("statement rejected: {0}")]
    Rejected(String),

    /// The connection lock was poisoned by a panicking holder
    #[error("database connection is poisoned")]
    Poisoned,
}

/// Schema recreation failures
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table `{name}` is declared more than once")]
    DuplicateTable { name: String },

    #[error("invalid table `{table}`: {reason}")]
    InvalidTable { table: String, reason: String },

    /// The recreate batch failed; no statement of it was applied
    #[error("failed to recreate schema: {source}")]
    Batch {
        #[source]
        source: ClientError,
    },
}

impl SchemaError {
    pub(crate) fn invalid(table: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTable {
            table: table.to_string(),
            reason: reason.into(),
        }
    }
}

/// Seed execution failures
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("seed file `{}` registered by an integration does not exist", .path.display())]
    MissingIntegrationSeed { path: PathBuf },

    #[error("seed file `{}` exists but could not be read: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("seed file `{}` failed: {source}", .path.display())]
    Failed {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

/// Kind of a user-authored configuration error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserErrorKind {
    /// The configuration file could not be parsed
    Syntax,
    /// The configuration parsed but does not describe valid collections
    InvalidConfig,
}

/// Source position attached to a user-authored error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    pub file: PathBuf,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// An error caused by the user's own configuration, carrying a hint for fixing it
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct UserConfigError {
    pub kind: UserErrorKind,
    pub message: String,
    pub hint: Option<String>,
    pub location: Option<ErrorLocation>,
}

/// Content sync failures
#[derive(Debug, Error)]
pub enum SyncError {
    /// User-authored error, propagated with its original hint
    #[error("{0}")]
    UserConfig(UserConfigError),

    /// Anything the pipeline does not recognize
    #[error("type generation failed: {inner}")]
    TypeGenerationFailed { inner: String },

    #[error("failed to read content directory `{}`: {source}", .path.display())]
    ContentDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write type declarations to `{}`: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// The hint text of a user-authored error, if any
    pub fn hint(&self) -> Option<&str> {
        match self {
            SyncError::UserConfig(err) => err.hint.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_error_message() {
        let err = Error::internal("local database client was not configured");
        assert_eq!(
            err.to_string(),
            "internal error: local database client was not configured. This is a bug, please file an issue"
        );
    }

    #[test]
    fn test_sync_error_hint() {
        let err = SyncError::UserConfig(UserConfigError {
            kind: UserErrorKind::Syntax,
            message: "unexpected token".to_string(),
            hint: Some("check the collection list".to_string()),
            location: None,
        });
        assert_eq!(err.hint(), Some("check the collection list"));
        assert_eq!(err.to_string(), "unexpected token");

        let err = SyncError::TypeGenerationFailed {
            inner: "boom".to_string(),
        };
        assert_eq!(err.hint(), None);
        assert_eq!(err.to_string(), "type generation failed: boom");
    }
}
