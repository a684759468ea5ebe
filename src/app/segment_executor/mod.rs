// Segment executor - Sequential encode/read/write/delete loop over a segment plan

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::engine_lifecycle::EngineLifecycle;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::format_duration;
use crate::ports::*;

/// Why the loop stopped before the end of the plan
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionStop {
    /// Cancellation was requested between segments
    Interrupted { completed: usize },
    /// A step failed; `completed` segments were written before it
    Failed { completed: usize, error: DomainError },
}

/// Drives the engine through every window of a plan, one segment at a time
pub struct SegmentExecutor<'a> {
    engine: &'a EngineLifecycle,
    sink: &'a dyn OutputSinkPort,
    settings: &'a EncodeSettings,
    notifier: Arc<dyn NotifyPort>,
}

impl<'a> SegmentExecutor<'a> {
    pub fn new(
        engine: &'a EngineLifecycle,
        sink: &'a dyn OutputSinkPort,
        settings: &'a EncodeSettings,
        notifier: Arc<dyn NotifyPort>,
    ) -> Self {
        Self {
            engine,
            sink,
            settings,
            notifier,
        }
    }

    /// Transcoder arguments for one window
    pub fn encode_args(
        settings: &EncodeSettings,
        input_artifact: &str,
        window: &SegmentWindow,
        output_artifact: &str,
    ) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            input_artifact.to_string(),
            "-ss".to_string(),
            format_duration(window.start_seconds),
            "-t".to_string(),
            format_duration(window.length_seconds),
            "-c:v".to_string(),
            settings.video_codec.clone(),
            "-preset".to_string(),
            settings.preset.clone(),
            "-c:a".to_string(),
            settings.audio_codec.clone(),
        ];
        if let Some(threads) = settings.threads {
            args.push("-threads".to_string());
            args.push(threads.to_string());
        }
        args.push(output_artifact.to_string());
        args
    }

    /// Process every window in order; returns the number of segments written
    pub async fn run(
        &self,
        input_artifact: &str,
        original_name: &str,
        plan: &SegmentPlan,
        cancel: &CancellationToken,
    ) -> Result<usize, ExecutionStop> {
        let total = plan.len();
        let mut completed = 0;

        for window in plan.iter() {
            if cancel.is_cancelled() {
                info!("Split interrupted after {} of {} segments", completed, total);
                return Err(ExecutionStop::Interrupted { completed });
            }

            let filename = ArtifactNames::output(window.index, original_name);
            info!("Splitting part {}/{}: {}", window.index + 1, total, filename);
            self.notifier.notify(&JobEvent::SegmentStarted {
                index: window.index,
                total,
                filename: filename.clone(),
            });

            if let Err(error) = self.process_window(input_artifact, window, &filename).await {
                // An interrupt from the terminal reaches the engine child too
                if cancel.is_cancelled() {
                    info!(
                        "Split interrupted during part {}/{} ({})",
                        window.index + 1,
                        total,
                        error
                    );
                    return Err(ExecutionStop::Interrupted { completed });
                }
                warn!("Segment {}/{} failed: {}", window.index + 1, total, error);
                return Err(ExecutionStop::Failed { completed, error });
            }

            completed += 1;
            self.notifier.notify(&JobEvent::SegmentCompleted {
                index: window.index,
                total,
                filename,
            });
        }

        Ok(completed)
    }

    /// encode → read → write → delete for a single window.
    ///
    /// The internal artifact is removed even when an earlier step failed.
    async fn process_window(
        &self,
        input_artifact: &str,
        window: &SegmentWindow,
        filename: &str,
    ) -> Result<(), DomainError> {
        let artifact = ArtifactNames::segment(window.index);
        let produced = self.produce(input_artifact, window, &artifact, filename).await;

        let removed = self.engine.delete_file(&artifact).await;
        match (produced, removed) {
            (Ok(()), Ok(())) => {
                debug!("Removed internal artifact {}", artifact);
                Ok(())
            }
            (Ok(()), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup)) => {
                debug!("Could not remove {} after failure: {}", artifact, cleanup);
                Err(e)
            }
        }
    }

    async fn produce(
        &self,
        input_artifact: &str,
        window: &SegmentWindow,
        artifact: &str,
        filename: &str,
    ) -> Result<(), DomainError> {
        let args = Self::encode_args(self.settings, input_artifact, window, artifact);
        debug!("Engine arguments: {:?}", args);
        self.engine.execute(&args).await?;

        let data = self.engine.read_file(artifact).await?;
        self.sink.write(filename, &data).await?;
        info!("Saved {} ({} bytes) to {}", filename, data.len(), self.sink.name());
        Ok(())
    }
}
