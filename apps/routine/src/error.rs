//! Errors raised by the command-line application.
//!
//! Store failures pass through unchanged as [`AppError::Core`]; the other
//! variants cover configuration and file handling around the store.

use routine_core::RoutineError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// A store operation failed.
    #[error(transparent)]
    Core(#[from] RoutineError),

    #[error("Unknown backend: {0}. Use: redb, file")]
    UnknownBackend(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Config file size {size} bytes exceeds maximum allowed {max} bytes")]
    ConfigTooLarge { size: u64, max: u64 },

    #[error("Database already exists at {}. Use --force to overwrite.", .0.display())]
    DatabaseExists(PathBuf),

    #[error("Database file size {size} bytes exceeds maximum allowed {max} bytes")]
    DatabaseTooLarge { size: u64, max: u64 },

    #[error("{context} '{}': {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl AppError {
    /// Build a mapper for `map_err` that records what was being done to `path`.
    pub(crate) fn io(
        context: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io {
            context,
            path,
            source,
        }
    }
}
