// Split interactor - Orchestrates the split-and-transcode job

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app::engine_lifecycle::EngineLifecycle;
use crate::app::segment_executor::{ExecutionStop, SegmentExecutor};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

/// Default number of trailing engine log lines attached to a failure
pub const DEFAULT_DIAGNOSTIC_LINES: usize = 5;

/// Where a job stopped short of completion
enum Halt {
    Interrupted {
        completed: usize,
        total: usize,
    },
    Failed {
        stage: JobState,
        error: DomainError,
        completed: usize,
        total: Option<usize>,
    },
}

impl Halt {
    fn failed(stage: JobState, error: DomainError) -> Self {
        Halt::Failed {
            stage,
            error,
            completed: 0,
            total: None,
        }
    }
}

/// Records state transitions and announces them
struct JobTracker {
    transitions: Vec<JobState>,
    notifier: Arc<dyn NotifyPort>,
}

impl JobTracker {
    fn new(notifier: Arc<dyn NotifyPort>) -> Self {
        Self {
            transitions: vec![JobState::Idle],
            notifier,
        }
    }

    fn enter(&mut self, state: JobState) {
        debug!("Job state -> {}", state);
        self.transitions.push(state);
        self.notifier.notify(&JobEvent::StateChanged(state));
    }
}

/// Resets the running flag when the job ends, however it ends
struct RunningGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Interactor for the split use case.
///
/// At most one job runs at a time; a start while another is active is
/// rejected with [`DomainError::Busy`].
pub struct SplitInteractor {
    engine: Arc<EngineLifecycle>,
    picker: Arc<dyn DestinationPickerPort>,
    notifier: Arc<dyn NotifyPort>,
    settings: EncodeSettings,
    diagnostic_lines: usize,
    running: AtomicBool,
}

impl SplitInteractor {
    /// Create new split interactor with injected ports
    pub fn new(
        engine: Arc<EngineLifecycle>,
        picker: Arc<dyn DestinationPickerPort>,
        notifier: Arc<dyn NotifyPort>,
        settings: EncodeSettings,
    ) -> Self {
        Self {
            engine,
            picker,
            notifier,
            settings,
            diagnostic_lines: DEFAULT_DIAGNOSTIC_LINES,
            running: AtomicBool::new(false),
        }
    }

    pub fn with_diagnostic_lines(mut self, lines: usize) -> Self {
        self.diagnostic_lines = lines;
        self
    }

    pub fn engine(&self) -> &Arc<EngineLifecycle> {
        &self.engine
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Most recent engine log lines, as attached to failures
    pub fn diagnostics(&self) -> Vec<String> {
        self.engine.logs().tail(self.diagnostic_lines)
    }

    /// Split `input` into segments of `segment_minutes` each.
    ///
    /// `Err` is returned only when the job is rejected before it starts;
    /// every other ending, including failures, is described by the report.
    pub async fn run(
        &self,
        input: Option<&UploadedFile>,
        segment_minutes: f64,
        cancel: &CancellationToken,
    ) -> Result<JobReport, DomainError> {
        let input = self.require_input(input)?;
        let segment_seconds = minutes_to_seconds(segment_minutes);
        SegmentPlanner::validate_segment_length(segment_seconds)?;
        let _running = self.try_start()?;

        let started_at = Utc::now();
        let mut job = JobTracker::new(Arc::clone(&self.notifier));
        self.engine.logs().clear();
        info!(
            "Starting split of {} ({} bytes) into {}s segments",
            input.name(),
            input.len(),
            segment_seconds
        );

        job.enter(JobState::AcquiringOutput);
        let (outcome, destination) = match self.picker.pick().await {
            Ok(Some(sink)) => {
                info!("Selected output folder: {}", sink.name());
                self.engine.attach(Arc::clone(&self.notifier));
                let outcome = self
                    .split(&mut job, input, segment_seconds, sink.as_ref(), cancel)
                    .await;
                self.engine.detach();
                (outcome, Some(sink.name()))
            }
            Ok(None) => {
                info!("Output folder selection was cancelled");
                (
                    JobOutcome::Aborted {
                        reason: AbortReason::Cancelled,
                    },
                    None,
                )
            }
            Err(e) => {
                warn!("Output folder not available: {}", e);
                (
                    JobOutcome::Aborted {
                        reason: AbortReason::DestinationDenied {
                            message: e.to_string(),
                        },
                    },
                    None,
                )
            }
        };

        job.enter(outcome.state());
        self.announce(&outcome);

        Ok(JobReport {
            input_name: input.name().to_string(),
            destination,
            segment_length_seconds: segment_seconds,
            outcome,
            transitions: job.transitions,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Probe `input` and compute its segment plan without writing any output
    pub async fn preview(
        &self,
        input: Option<&UploadedFile>,
        segment_minutes: f64,
    ) -> Result<SegmentPlan, DomainError> {
        let input = self.require_input(input)?;
        let segment_seconds = minutes_to_seconds(segment_minutes);
        SegmentPlanner::validate_segment_length(segment_seconds)?;
        let _running = self.try_start()?;

        self.engine.logs().clear();
        self.engine.ensure_ready().await?;

        let input_artifact = ArtifactNames::input(input.extension());
        let written = self.engine.write_file(&input_artifact, input.bytes()).await;
        let probed = match written {
            Ok(()) => self.engine.probe_duration(&input_artifact).await,
            Err(e) => Err(e),
        };
        self.discard(&input_artifact).await;

        SegmentPlanner::plan(probed?, segment_seconds)
    }

    fn require_input<'f>(&self, input: Option<&'f UploadedFile>) -> Result<&'f UploadedFile, DomainError> {
        match input {
            Some(file) => Ok(file),
            None => {
                warn!("Split requested without an input file");
                self.notifier.notify(&JobEvent::InputMissing);
                Err(DomainError::NoInput)
            }
        }
    }

    fn try_start(&self) -> Result<RunningGuard<'_>, DomainError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Rejected split start: another job is running");
            return Err(DomainError::Busy);
        }
        Ok(RunningGuard {
            flag: &self.running,
        })
    }

    /// Initializing → Probing → Planning → Executing → Finalizing
    async fn split(
        &self,
        job: &mut JobTracker,
        input: &UploadedFile,
        segment_seconds: f64,
        sink: &dyn OutputSinkPort,
        cancel: &CancellationToken,
    ) -> JobOutcome {
        job.enter(JobState::Initializing);
        if let Err(e) = self.engine.ensure_ready().await {
            return self.outcome(Halt::failed(JobState::Initializing, e));
        }

        let input_artifact = ArtifactNames::input(input.extension());
        if let Err(e) = self.engine.write_file(&input_artifact, input.bytes()).await {
            self.discard(&input_artifact).await;
            return self.outcome(Halt::failed(JobState::Initializing, e));
        }
        debug!("Wrote {} ({} bytes) to engine", input_artifact, input.len());

        let processed = self
            .process(job, input, &input_artifact, segment_seconds, sink, cancel)
            .await;

        job.enter(JobState::Finalizing);
        let cleanup = self.engine.delete_file(&input_artifact).await;

        match (processed, cleanup) {
            (Ok(written), Ok(())) => JobOutcome::Completed {
                segments_written: written,
            },
            (Ok(written), Err(e)) => self.outcome(Halt::Failed {
                stage: JobState::Finalizing,
                error: e,
                completed: written,
                total: Some(written),
            }),
            (Err(halt), cleanup) => {
                if let Err(e) = cleanup {
                    warn!("Could not remove {}: {}", input_artifact, e);
                }
                self.outcome(halt)
            }
        }
    }

    async fn process(
        &self,
        job: &mut JobTracker,
        input: &UploadedFile,
        input_artifact: &str,
        segment_seconds: f64,
        sink: &dyn OutputSinkPort,
        cancel: &CancellationToken,
    ) -> Result<usize, Halt> {
        job.enter(JobState::Probing);
        let duration = self
            .engine
            .probe_duration(input_artifact)
            .await
            .map_err(|e| Halt::failed(JobState::Probing, e))?;
        let duration = match duration {
            Some(seconds) if seconds.is_finite() && seconds > 0.0 => seconds,
            _ => return Err(Halt::failed(JobState::Probing, DomainError::DurationUnknown)),
        };
        info!("Media duration: {:.3}s", duration);

        job.enter(JobState::Planning);
        let plan = SegmentPlanner::plan(Some(duration), segment_seconds)
            .map_err(|e| Halt::failed(JobState::Planning, e))?;
        let total = plan.len();
        info!("Splitting into {} segments", total);
        self.notifier
            .notify(&JobEvent::SegmentsPlanned { total });

        job.enter(JobState::Executing);
        let executor = SegmentExecutor::new(
            &self.engine,
            sink,
            &self.settings,
            Arc::clone(&self.notifier),
        );
        executor
            .run(input_artifact, input.name(), &plan, cancel)
            .await
            .map_err(|stop| match stop {
                ExecutionStop::Interrupted { completed } => Halt::Interrupted { completed, total },
                ExecutionStop::Failed { completed, error } => Halt::Failed {
                    stage: JobState::Executing,
                    error,
                    completed,
                    total: Some(total),
                },
            })
    }

    fn outcome(&self, halt: Halt) -> JobOutcome {
        match halt {
            Halt::Interrupted { completed, total } => JobOutcome::Aborted {
                reason: AbortReason::Interrupted { completed, total },
            },
            Halt::Failed {
                stage,
                error,
                completed,
                total,
            } => JobOutcome::Failed {
                failure: JobFailure {
                    stage,
                    message: error.to_string(),
                    segments_completed: completed,
                    segments_total: total,
                    diagnostics: self.diagnostics(),
                },
            },
        }
    }

    /// Best-effort removal of an internal artifact
    async fn discard(&self, artifact: &str) {
        if let Err(e) = self.engine.delete_file(artifact).await {
            debug!("Could not remove {}: {}", artifact, e);
        }
    }

    fn announce(&self, outcome: &JobOutcome) {
        let event = match outcome {
            JobOutcome::Completed { segments_written } => {
                info!("Split completed: {} segments written", segments_written);
                JobEvent::Completed {
                    segments: *segments_written,
                }
            }
            JobOutcome::Aborted { reason } => JobEvent::Aborted(reason.clone()),
            JobOutcome::Failed { failure } => {
                error!("Split failed during {}: {}", failure.stage, failure.summary());
                for line in &failure.diagnostics {
                    error!("  {}", line);
                }
                JobEvent::Failed(failure.clone())
            }
        };
        self.notifier.notify(&event);
    }
}
