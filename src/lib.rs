//! SplitX video splitter library
//!
//! Splits a video into consecutive fixed-length segments and re-encodes each
//! one through a stateful transcoding engine (FFmpeg), writing the results to
//! a user-chosen folder.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{EngineLifecycle, SplitInteractor};
pub use domain::errors::DomainError;
pub use domain::model::{JobEvent, JobOutcome, JobReport, JobState, SegmentPlan, UploadedFile};
pub use domain::rules::{format_duration, SegmentPlanner};
