// Console notify adapter - Job events rendered for a terminal user

use std::io::Write;

use tracing::{debug, info};

use crate::domain::model::*;
use crate::ports::*;

/// Prints user-facing job messages to stderr
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self { quiet: false }
    }

    /// Only trace events, print nothing (used with `--json`)
    pub fn quiet() -> Self {
        Self { quiet: true }
    }

    /// Message shown to the user for `event`, if any
    pub fn render(event: &JobEvent) -> Option<String> {
        match event {
            JobEvent::InputMissing => {
                Some("No input file selected. Choose a video to split first.".to_string())
            }
            JobEvent::SegmentsPlanned { total } => {
                Some(format!("Splitting into {} segment(s)", total))
            }
            JobEvent::SegmentStarted {
                index,
                total,
                filename,
            } => Some(format!("[{}/{}] Writing {}", index + 1, total, filename)),
            JobEvent::Completed { segments } => {
                Some(format!("Done: {} segment(s) written.", segments))
            }
            JobEvent::Aborted(AbortReason::DestinationDenied { message }) => {
                Some(format!("Cannot use the output folder: {}", message))
            }
            JobEvent::Aborted(AbortReason::Interrupted { completed, total }) => Some(format!(
                "Stopped: {} of {} segments completed.",
                completed, total
            )),
            JobEvent::Failed(failure) => Some(format!("Splitting failed: {}", failure)),
            JobEvent::Aborted(AbortReason::Cancelled)
            | JobEvent::StateChanged(_)
            | JobEvent::EngineProgress { .. }
            | JobEvent::SegmentCompleted { .. } => None,
        }
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyPort for ConsoleNotifier {
    fn notify(&self, event: &JobEvent) {
        match event {
            JobEvent::EngineProgress { ratio } => debug!("Segment progress: {:.0}%", ratio * 100.0),
            JobEvent::StateChanged(state) => debug!("State: {}", state),
            JobEvent::SegmentCompleted { filename, .. } => info!("Saved {}", filename),
            JobEvent::Aborted(AbortReason::Cancelled) => info!("Cancelled by user"),
            _ => {}
        }

        if self.quiet {
            return;
        }
        if let Some(message) = Self::render(event) {
            let mut stderr = std::io::stderr().lock();
            // stderr may already be closed
            let _ = writeln!(stderr, "{}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_segment_started_is_one_based() {
        let message = ConsoleNotifier::render(&JobEvent::SegmentStarted {
            index: 0,
            total: 3,
            filename: "part_1_clip.mp4".to_string(),
        });
        assert_eq!(message.as_deref(), Some("[1/3] Writing part_1_clip.mp4"));
    }

    #[test]
    fn test_render_cancel_is_silent() {
        assert!(ConsoleNotifier::render(&JobEvent::Aborted(AbortReason::Cancelled)).is_none());
        assert!(ConsoleNotifier::render(&JobEvent::EngineProgress { ratio: 0.5 }).is_none());
    }

    #[test]
    fn test_render_failure_includes_details() {
        let failure = JobFailure {
            stage: JobState::Executing,
            message: "ffmpeg exited with status 1".to_string(),
            segments_completed: 1,
            segments_total: Some(5),
            diagnostics: vec!["Conversion failed!".to_string()],
        };
        let message = ConsoleNotifier::render(&JobEvent::Failed(failure)).unwrap();
        assert!(message.contains("1 of 5 segments completed"));
        assert!(message.ends_with("Details:\nConversion failed!"));
    }

    #[test]
    fn test_render_missing_input() {
        let message = ConsoleNotifier::render(&JobEvent::InputMissing).unwrap();
        assert!(message.starts_with("No input file selected"));
    }
}
