// Ports - Interface definitions (contracts)

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Resources the engine needs before it can run anything
#[derive(Debug, Clone, PartialEq)]
pub struct EngineResources {
    /// Path or command name of the transcoder binary
    pub binary: PathBuf,
    /// Where the engine may create its scratch area (system temp dir if unset)
    pub scratch_root: Option<PathBuf>,
}

impl Default for EngineResources {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            scratch_root: None,
        }
    }
}

/// Receives the engine's asynchronous diagnostics
pub trait EngineObserver: Send + Sync {
    /// One diagnostic line from the engine
    fn on_log(&self, line: &str);

    /// Completion ratio of the running operation, 0.0 to 1.0
    fn on_progress(&self, ratio: f64);
}

/// Port for the stateful transcoding engine.
///
/// File names are entries in the engine's private scratch area, not host paths.
/// Implementations are not safe for concurrent use; callers run one operation
/// at a time.
#[async_trait]
pub trait EnginePort: Send + Sync {
    /// Register the observer for log lines and progress ratios
    fn subscribe(&self, observer: Arc<dyn EngineObserver>);

    /// Load engine core resources
    async fn load(&self, resources: &EngineResources) -> Result<(), DomainError>;

    /// Create or replace a scratch entry
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), DomainError>;

    /// Read a scratch entry
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, DomainError>;

    /// Remove a scratch entry
    async fn delete_file(&self, name: &str) -> Result<(), DomainError>;

    /// Names of all scratch entries
    async fn list_files(&self) -> Result<Vec<String>, DomainError>;

    /// Total media duration in seconds, `None` when it cannot be determined
    async fn probe_duration(&self, name: &str) -> Result<Option<f64>, DomainError>;

    /// Run one transcoder invocation with the given arguments
    async fn execute(&self, args: &[String]) -> Result<(), DomainError>;
}

/// Port for a writable destination folder
#[async_trait]
pub trait OutputSinkPort: Send + Sync {
    /// Display name of the destination
    fn name(&self) -> String;

    /// Create or overwrite `filename` with the full payload.
    ///
    /// Returns only after the data is flushed and the handle released.
    async fn write(&self, filename: &str, bytes: &[u8]) -> Result<(), DomainError>;
}

/// Port for interactively acquiring an output destination
#[async_trait]
pub trait DestinationPickerPort: Send + Sync {
    /// `Ok(None)` means the user dismissed the picker
    async fn pick(&self) -> Result<Option<Arc<dyn OutputSinkPort>>, DomainError>;
}

/// Port for user-facing job notifications.
///
/// Called inline from the job; implementations must not block.
pub trait NotifyPort: Send + Sync {
    fn notify(&self, event: &JobEvent);
}
