use std::path::PathBuf;
use thiserror::Error;

/// Failures that terminate a pipeline run. Nothing here is retried.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Cannot open {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("Resampler error: {0}")]
    Resampler(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
