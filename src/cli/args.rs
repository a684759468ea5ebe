//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::adapters::SplitterConfig;
use crate::domain::rules::{minutes_to_seconds, MIN_SEGMENT_SECONDS};

/// Arguments for the split command
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Segment length in minutes
    #[arg(short, long, value_parser = parse_minutes)]
    pub minutes: f64,

    /// Output folder (prompted for when omitted)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Video codec
    #[arg(long)]
    pub video_codec: Option<String>,

    /// Encoding preset
    #[arg(long)]
    pub preset: Option<String>,

    /// Audio codec
    #[arg(long)]
    pub audio_codec: Option<String>,

    /// Encoder threads (0 = one per CPU)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Give up on any single engine call after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Print the job report as JSON
    #[arg(long)]
    pub json: bool,
}

impl SplitArgs {
    pub fn apply_to(&self, config: &mut SplitterConfig) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = Some(dir.clone());
        }
        if let Some(codec) = &self.video_codec {
            config.video_codec = codec.clone();
        }
        if let Some(preset) = &self.preset {
            config.preset = preset.clone();
        }
        if let Some(codec) = &self.audio_codec {
            config.audio_codec = codec.clone();
        }
        if let Some(threads) = self.threads {
            config.threads = Some(threads);
        }
        if let Some(secs) = self.timeout_secs {
            config.engine_timeout_secs = Some(secs);
        }
    }
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Segment length in minutes
    #[arg(short, long, value_parser = parse_minutes)]
    pub minutes: f64,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// Segment length must be a finite number of minutes covering at least one second
pub fn parse_minutes(value: &str) -> Result<f64, String> {
    let minutes: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(format!("segment length must be greater than zero, got {}", value));
    }
    if minutes_to_seconds(minutes) < MIN_SEGMENT_SECONDS {
        return Err(format!("segment length must be at least one second, got {} minutes", value));
    }
    Ok(minutes)
}
