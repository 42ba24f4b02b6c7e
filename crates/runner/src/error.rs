//! Error types for the test runner
//!
//! Only catalog- and environment-level problems are errors. Anything that
//! goes wrong while a single test case runs is classified as a
//! [`crate::runner::Failure`] and never aborts the run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    /// One or more required fields are missing or blank.
    #[error("Invalid parameters in the test: {}", .0.join("; "))]
    Configuration(Vec<String>),

    #[error("Test #{index} <{tag}>: {source}")]
    InvalidTest {
        index: usize,
        tag: String,
        #[source]
        source: Box<RunnerError>,
    },

    #[error("Unknown test kind '{0}'")]
    UnknownTestKind(String),

    #[error("Test document not found: {0}")]
    CatalogNotFound(PathBuf),

    #[error("{0} is not an executable")]
    NotExecutable(PathBuf),

    #[error("{0} doesn't exist")]
    MissingTestDir(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Pattern error: {0}")]
    Regex(#[from] regex::Error),
}

impl RunnerError {
    /// Batched missing-field messages, looking through test context.
    pub fn missing_fields(&self) -> Option<&[String]> {
        match self {
            RunnerError::Configuration(messages) => Some(messages),
            RunnerError::InvalidTest { source, .. } => source.missing_fields(),
            _ => None,
        }
    }

    /// True for errors raised by the test document rather than the host.
    pub fn is_configuration(&self) -> bool {
        match self {
            RunnerError::Configuration(_)
            | RunnerError::UnknownTestKind(_)
            | RunnerError::CatalogNotFound(_)
            | RunnerError::Yaml(_) => true,
            RunnerError::InvalidTest { source, .. } => source.is_configuration(),
            _ => false,
        }
    }
}

pub type RunnerResult<T> = Result<T, RunnerError>;
