// Domain errors - Error types for the domain layer

use std::time::Duration;

use thiserror::Error;

/// Domain-specific error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),
    /// No input file was supplied
    #[error("No input file: select a video to split first")]
    NoInput,
    /// Another split job is still running
    #[error("A split job is already running")]
    Busy,
    /// Output destination could not be acquired
    #[error("Output destination not granted: {0}")]
    DestinationDenied(String),
    /// Engine could not determine the media duration
    #[error("Could not determine the duration of the video")]
    DurationUnknown,
    /// Engine core resources failed to load
    #[error("Failed to load transcoding engine: {0}")]
    EngineLoad(String),
    /// Engine operation failed
    #[error("Transcoding engine error: {0}")]
    EngineFailed(String),
    /// Engine call exceeded the configured timeout
    #[error("Transcoding engine call '{operation}' timed out after {limit:?}")]
    EngineTimeout { operation: String, limit: Duration },
    /// Filesystem operation failed
    #[error("Filesystem error: {0}")]
    FsFail(String),
    /// Media probe failed
    #[error("Probe failed: {0}")]
    ProbeFail(String),
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DomainError {
    /// Errors that reject a job before it starts
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DomainError::BadArgs(_) | DomainError::NoInput | DomainError::Busy
        )
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::FsFail(err.to_string())
    }
}
