// Domain models - Core types and data structures

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::errors::DomainError;

/// Video supplied by the caller, held in memory for the duration of a job
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    bytes: Vec<u8>,
    name: String,
}

impl UploadedFile {
    /// Create a new uploaded file from raw bytes and its original name
    pub fn new(bytes: Vec<u8>, name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::BadArgs("File name cannot be empty".to_string()));
        }
        Ok(Self { bytes, name })
    }

    /// Read a file from disk, keeping only its file name
    pub async fn load(path: &Path) -> Result<Self, DomainError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DomainError::BadArgs(format!("Invalid input path: {}", path.display())))?;
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            DomainError::FsFail(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::new(bytes, name)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text after the last '.', or the whole name when there is none
    pub fn extension(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((_, ext)) => ext,
            None => &self.name,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Naming scheme for engine-side artifacts and user-facing outputs.
///
/// Internal names live only inside the engine's scratch area; output names
/// land in the destination folder.
pub struct ArtifactNames;

impl ArtifactNames {
    pub fn input(extension: &str) -> String {
        format!("input.{}", extension)
    }

    /// Internal output for the zero-based window `index`
    pub fn segment(index: usize) -> String {
        format!("part_{}.mp4", index + 1)
    }

    /// User-facing output for the zero-based window `index`
    pub fn output(index: usize, original_name: &str) -> String {
        format!("part_{}_{}", index + 1, original_name)
    }

    /// True for names produced by [`ArtifactNames::input`] or [`ArtifactNames::segment`]
    pub fn is_internal(name: &str) -> bool {
        if name.starts_with("input.") {
            return true;
        }
        name.strip_prefix("part_")
            .and_then(|rest| rest.strip_suffix(".mp4"))
            .map(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    }
}

/// One output chunk of the source media
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentWindow {
    pub index: usize,
    pub start_seconds: f64,
    pub length_seconds: f64,
}

impl SegmentWindow {
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.length_seconds
    }
}

/// Ordered, immutable list of segment windows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentPlan {
    total_duration: f64,
    segment_length: f64,
    windows: Vec<SegmentWindow>,
}

impl SegmentPlan {
    pub(crate) fn new(total_duration: f64, segment_length: f64, windows: Vec<SegmentWindow>) -> Self {
        Self {
            total_duration,
            segment_length,
            windows,
        }
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn segment_length(&self) -> f64 {
        self.segment_length
    }

    pub fn windows(&self) -> &[SegmentWindow] {
        &self.windows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SegmentWindow> {
        self.windows.iter()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Fixed re-encode parameters applied to every segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub preset: String,
    pub audio_codec: String,
    pub threads: Option<usize>,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            audio_codec: "aac".to_string(),
            threads: None,
        }
    }
}

/// Job controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    AcquiringOutput,
    Initializing,
    Probing,
    Planning,
    Executing,
    Finalizing,
    Completed,
    Aborted,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Aborted | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Idle => "idle",
            JobState::AcquiringOutput => "acquiring output",
            JobState::Initializing => "initializing",
            JobState::Probing => "probing",
            JobState::Planning => "planning",
            JobState::Executing => "executing",
            JobState::Finalizing => "finalizing",
            JobState::Completed => "completed",
            JobState::Aborted => "aborted",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a job ended without failing or completing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// The destination picker was dismissed
    Cancelled,
    /// The destination could not be used
    DestinationDenied { message: String },
    /// Cancellation was requested between segments
    Interrupted { completed: usize, total: usize },
}

/// Terminal failure with diagnostic context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobFailure {
    pub stage: JobState,
    pub message: String,
    pub segments_completed: usize,
    pub segments_total: Option<usize>,
    pub diagnostics: Vec<String>,
}

impl JobFailure {
    /// Human-readable one-line summary
    pub fn summary(&self) -> String {
        match self.segments_total {
            Some(total) => format!(
                "{} ({} of {} segments completed)",
                self.message, self.segments_completed, total
            ),
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())?;
        if !self.diagnostics.is_empty() {
            write!(f, "\n\nDetails:\n{}", self.diagnostics.join("\n"))?;
        }
        Ok(())
    }
}

/// How a job ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed { segments_written: usize },
    Aborted { reason: AbortReason },
    Failed { failure: JobFailure },
}

impl JobOutcome {
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Completed { .. } => JobState::Completed,
            JobOutcome::Aborted { .. } => JobState::Aborted,
            JobOutcome::Failed { .. } => JobState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match self {
            JobOutcome::Failed { failure } => Some(failure),
            _ => None,
        }
    }
}

/// Record of a finished job
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub input_name: String,
    pub destination: Option<String>,
    pub segment_length_seconds: f64,
    pub outcome: JobOutcome,
    pub transitions: Vec<JobState>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobReport {
    pub fn final_state(&self) -> JobState {
        self.outcome.state()
    }
}

/// Notifications delivered to the caller while a job runs
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    InputMissing,
    StateChanged(JobState),
    SegmentsPlanned { total: usize },
    SegmentStarted { index: usize, total: usize, filename: String },
    EngineProgress { ratio: f64 },
    SegmentCompleted { index: usize, total: usize, filename: String },
    Completed { segments: usize },
    Aborted(AbortReason),
    Failed(JobFailure),
}

#[cfg(test)]
mod tests;
