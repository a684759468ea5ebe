//! Command implementations

use std::path::Path;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::app::SplitInteractor;
use crate::cli::args::{PlanArgs, SplitArgs};
use crate::domain::errors::DomainError;
use crate::domain::model::{ArtifactNames, JobOutcome, SegmentPlan, UploadedFile};
use crate::domain::rules::format_duration;

/// How a command ended, mapped to the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Completed, or cancelled by the user
    Success,
    /// The job ran and failed
    Failed,
    /// The job was refused before it started
    Rejected,
}

impl CommandStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            CommandStatus::Success => 0,
            CommandStatus::Failed => 1,
            CommandStatus::Rejected => 2,
        }
    }

    fn from_error(err: &DomainError) -> Self {
        if err.is_rejection() {
            CommandStatus::Rejected
        } else {
            CommandStatus::Failed
        }
    }
}

async fn load_input(path: Option<&Path>) -> Result<Option<UploadedFile>, DomainError> {
    match path {
        Some(path) => {
            let file = UploadedFile::load(path).await?;
            info!("Loaded {} ({} bytes)", file.name(), file.len());
            Ok(Some(file))
        }
        None => Ok(None),
    }
}

/// Execute the split command
pub async fn split(
    interactor: &SplitInteractor,
    args: &SplitArgs,
    cancel: &CancellationToken,
) -> Result<CommandStatus> {
    let input = match load_input(args.input.as_deref()).await {
        Ok(input) => input,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(CommandStatus::Rejected);
        }
    };

    let report = match interactor.run(input.as_ref(), args.minutes, cancel).await {
        Ok(report) => report,
        Err(e) => {
            error!("Split rejected: {}", e);
            eprintln!("error: {}", e);
            return Ok(CommandStatus::from_error(&e));
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize job report")?;
        println!("{}", json);
    }

    Ok(match report.outcome {
        JobOutcome::Completed { .. } | JobOutcome::Aborted { .. } => CommandStatus::Success,
        JobOutcome::Failed { .. } => CommandStatus::Failed,
    })
}

/// Execute the plan command
pub async fn plan(interactor: &SplitInteractor, args: &PlanArgs) -> Result<CommandStatus> {
    let input = match load_input(args.input.as_deref()).await {
        Ok(input) => input,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(CommandStatus::Rejected);
        }
    };

    let plan = match interactor.preview(input.as_ref(), args.minutes).await {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(CommandStatus::from_error(&e));
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
        println!("{}", json);
    } else {
        // preview() only succeeds with an input present
        let name = input.as_ref().map(|f| f.name()).unwrap_or_default();
        print!("{}", render_plan(&plan, name));
    }
    Ok(CommandStatus::Success)
}

/// Plain-text table of the planned segments
pub fn render_plan(plan: &SegmentPlan, original_name: &str) -> String {
    let mut out = format!(
        "Duration {} -> {} segment(s) of {}\n",
        format_duration(plan.total_duration()),
        plan.len(),
        format_duration(plan.segment_length())
    );
    for window in plan.iter() {
        out.push_str(&format!(
            "  {}  start {}  length {}\n",
            ArtifactNames::output(window.index, original_name),
            format_duration(window.start_seconds),
            format_duration(window.length_seconds)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::SegmentPlanner;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CommandStatus::Success.exit_code(), 0);
        assert_eq!(CommandStatus::Failed.exit_code(), 1);
        assert_eq!(CommandStatus::Rejected.exit_code(), 2);
        assert_eq!(CommandStatus::from_error(&DomainError::NoInput), CommandStatus::Rejected);
        assert_eq!(
            CommandStatus::from_error(&DomainError::DurationUnknown),
            CommandStatus::Failed
        );
    }

    #[test]
    fn test_render_plan() {
        let plan = SegmentPlanner::plan(Some(125.0), 60.0).unwrap();
        let text = render_plan(&plan, "talk.mp4");

        assert!(text.starts_with("Duration 00:02:05 -> 3 segment(s) of 00:01:00\n"));
        assert!(text.contains("part_1_talk.mp4  start 00:00:00"));
        assert!(text.contains("part_3_talk.mp4  start 00:02:00"));
    }
}
