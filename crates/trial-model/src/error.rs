use std::path::{Path, PathBuf};

use thiserror::Error;

/// Fatal pipeline failures. Anything in here aborts the run before outputs are written.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no data: {message}")]
    EmptyResult { message: String },

    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to write {path}: {message}")]
    Persist { path: PathBuf, message: String },

    #[error("frame error: {0}")]
    Frame(String),
}

impl PipelineError {
    pub fn empty(message: impl Into<String>) -> Self {
        Self::EmptyResult {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn persist(path: &Path, message: impl std::fmt::Display) -> Self {
        Self::Persist {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn parse(path: &Path, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Recoverable per-source problems. The ingestor returns these as values so the
/// caller can skip the source and keep going with the others.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceIssue {
    #[error("source file not found: {path}")]
    MissingSource { path: PathBuf },

    #[error("failed to read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("no valid rows in {path}")]
    NoValidRows { path: PathBuf },
}

impl SourceIssue {
    pub fn path(&self) -> &Path {
        match self {
            Self::MissingSource { path }
            | Self::Unreadable { path, .. }
            | Self::NoValidRows { path } => path,
        }
    }

    pub fn unreadable(path: &Path, message: impl std::fmt::Display) -> Self {
        Self::Unreadable {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}
