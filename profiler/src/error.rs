//! Error types for the profiler engine

use thiserror::Error;

/// Errors surfaced by the profiler's public API.
#[derive(Debug, Error)]
pub enum ProfilerError {
    /// `start` was called while the profiler was already running.
    #[error("profiler is already running")]
    AlreadyRunning,

    /// A configuration value was rejected before start.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A filter pattern failed to compile.
    #[error("invalid filter pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The sample source could not be opened, drained, or closed.
    #[error("sample source error: {0}")]
    Source(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProfilerError>;
