// Engine lifecycle - Lazy, memoized engine initialization and diagnostics capture

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Engine lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Loading,
    Ready,
}

/// Ordered diagnostic lines emitted by the engine during the current job.
///
/// Cleared between jobs, never capped while a job runs.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        lock(&self.lines).push(line.into());
    }

    pub fn clear(&self) {
        lock(&self.lines).clear();
    }

    /// The most recent `count` lines, oldest first
    pub fn tail(&self, count: usize) -> Vec<String> {
        let lines = lock(&self.lines);
        let start = lines.len().saturating_sub(count);
        lines[start..].to_vec()
    }

    pub fn snapshot(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.lines).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.lines).is_empty()
    }
}

/// Observer registered with the engine: buffers logs, relays progress
struct EngineEvents {
    logs: LogBuffer,
    listener: Mutex<Option<Arc<dyn NotifyPort>>>,
}

impl EngineObserver for EngineEvents {
    fn on_log(&self, line: &str) {
        debug!(target: "splitx::engine", "{}", line);
        self.logs.push(line);
    }

    fn on_progress(&self, ratio: f64) {
        debug!("Engine progress: {:.2}%", ratio * 100.0);
        let listener = lock(&self.listener).clone();
        if let Some(listener) = listener {
            listener.notify(&JobEvent::EngineProgress { ratio });
        }
    }
}

/// Owns the single engine instance for the whole process.
///
/// The first [`EngineLifecycle::ensure_ready`] loads the engine; later calls
/// are no-ops. Every engine call made through this type honours the optional
/// per-call timeout.
pub struct EngineLifecycle {
    engine: Arc<dyn EnginePort>,
    resources: EngineResources,
    state: Mutex<EngineState>,
    load_lock: tokio::sync::Mutex<()>,
    subscribed: AtomicBool,
    events: Arc<EngineEvents>,
    timeout: Option<Duration>,
}

impl EngineLifecycle {
    pub fn new(engine: Arc<dyn EnginePort>, resources: EngineResources) -> Self {
        Self {
            engine,
            resources,
            state: Mutex::new(EngineState::Uninitialized),
            load_lock: tokio::sync::Mutex::new(()),
            subscribed: AtomicBool::new(false),
            events: Arc::new(EngineEvents {
                logs: LogBuffer::new(),
                listener: Mutex::new(None),
            }),
            timeout: None,
        }
    }

    /// Limit every engine call to `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> EngineState {
        *lock(&self.state)
    }

    fn set_state(&self, state: EngineState) {
        *lock(&self.state) = state;
    }

    pub fn logs(&self) -> &LogBuffer {
        &self.events.logs
    }

    pub fn engine(&self) -> &Arc<dyn EnginePort> {
        &self.engine
    }

    /// Route engine progress to `listener` until [`EngineLifecycle::detach`]
    pub fn attach(&self, listener: Arc<dyn NotifyPort>) {
        *lock(&self.events.listener) = Some(listener);
    }

    pub fn detach(&self) {
        *lock(&self.events.listener) = None;
    }

    /// Load the engine once; a failed load leaves it uninitialized so the next call retries
    pub async fn ensure_ready(&self) -> Result<(), DomainError> {
        if self.state() == EngineState::Ready {
            return Ok(());
        }

        let _guard = self.load_lock.lock().await;
        if self.state() == EngineState::Ready {
            return Ok(());
        }

        if !self.subscribed.swap(true, Ordering::SeqCst) {
            self.engine
                .subscribe(Arc::clone(&self.events) as Arc<dyn EngineObserver>);
        }

        self.set_state(EngineState::Loading);
        info!("Loading transcoding engine from {}", self.resources.binary.display());

        match self.bounded("load", self.engine.load(&self.resources)).await {
            Ok(()) => {
                self.set_state(EngineState::Ready);
                info!("Transcoding engine ready");
                Ok(())
            }
            Err(e) => {
                self.set_state(EngineState::Uninitialized);
                warn!("Transcoding engine failed to load: {}", e);
                Err(match e {
                    DomainError::EngineLoad(_) | DomainError::EngineTimeout { .. } => e,
                    other => DomainError::EngineLoad(other.to_string()),
                })
            }
        }
    }

    /// Await `call`, failing with [`DomainError::EngineTimeout`] past the configured limit
    pub async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                DomainError::EngineTimeout {
                    operation: operation.to_string(),
                    limit,
                }
            })?,
            None => call.await,
        }
    }

    pub async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), DomainError> {
        self.bounded("write_file", self.engine.write_file(name, data)).await
    }

    pub async fn read_file(&self, name: &str) -> Result<Vec<u8>, DomainError> {
        self.bounded("read_file", self.engine.read_file(name)).await
    }

    pub async fn delete_file(&self, name: &str) -> Result<(), DomainError> {
        self.bounded("delete_file", self.engine.delete_file(name)).await
    }

    pub async fn probe_duration(&self, name: &str) -> Result<Option<f64>, DomainError> {
        self.bounded("probe_duration", self.engine.probe_duration(name)).await
    }

    pub async fn execute(&self, args: &[String]) -> Result<(), DomainError> {
        self.bounded("execute", self.engine.execute(args)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct StubEngine {
        loads: AtomicUsize,
        failing_loads: AtomicUsize,
        load_delay: Option<Duration>,
        observer: Mutex<Option<Arc<dyn EngineObserver>>>,
    }

    #[async_trait]
    impl EnginePort for StubEngine {
        fn subscribe(&self, observer: Arc<dyn EngineObserver>) {
            *lock(&self.observer) = Some(observer);
        }

        async fn load(&self, _resources: &EngineResources) -> Result<(), DomainError> {
            if let Some(delay) = self.load_delay {
                tokio::time::sleep(delay).await;
            }
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.failing_loads.load(Ordering::SeqCst) > 0 {
                self.failing_loads.fetch_sub(1, Ordering::SeqCst);
                return Err(DomainError::FsFail("core not found".to_string()));
            }
            Ok(())
        }

        async fn write_file(&self, _name: &str, _data: &[u8]) -> Result<(), DomainError> {
            Ok(())
        }

        async fn read_file(&self, _name: &str) -> Result<Vec<u8>, DomainError> {
            Ok(Vec::new())
        }

        async fn delete_file(&self, _name: &str) -> Result<(), DomainError> {
            Ok(())
        }

        async fn list_files(&self) -> Result<Vec<String>, DomainError> {
            Ok(Vec::new())
        }

        async fn probe_duration(&self, _name: &str) -> Result<Option<f64>, DomainError> {
            Ok(Some(1.0))
        }

        async fn execute(&self, _args: &[String]) -> Result<(), DomainError> {
            let observer = lock(&self.observer).clone();
            if let Some(observer) = observer {
                observer.on_log("frame=1");
                observer.on_progress(0.5);
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<JobEvent>>);

    impl NotifyPort for Recorder {
        fn notify(&self, event: &JobEvent) {
            lock(&self.0).push(event.clone());
        }
    }

    #[test]
    fn test_log_buffer_tail() {
        let logs = LogBuffer::new();
        for i in 0..8 {
            logs.push(format!("line {}", i));
        }
        assert_eq!(logs.tail(3), vec!["line 5", "line 6", "line 7"]);
        assert_eq!(logs.tail(20).len(), 8);

        logs.clear();
        assert!(logs.is_empty());
        assert!(logs.tail(5).is_empty());
    }

    #[tokio::test]
    async fn test_ensure_ready_loads_once() {
        let engine = Arc::new(StubEngine::default());
        let lifecycle = EngineLifecycle::new(engine.clone(), EngineResources::default());
        assert_eq!(lifecycle.state(), EngineState::Uninitialized);

        lifecycle.ensure_ready().await.unwrap();
        lifecycle.ensure_ready().await.unwrap();

        assert_eq!(lifecycle.state(), EngineState::Ready);
        assert_eq!(engine.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_can_be_retried() {
        let engine = Arc::new(StubEngine {
            failing_loads: AtomicUsize::new(1),
            ..Default::default()
        });
        let lifecycle = EngineLifecycle::new(engine.clone(), EngineResources::default());

        let err = lifecycle.ensure_ready().await.unwrap_err();
        assert!(matches!(err, DomainError::EngineLoad(_)));
        assert_eq!(lifecycle.state(), EngineState::Uninitialized);

        lifecycle.ensure_ready().await.unwrap();
        assert_eq!(lifecycle.state(), EngineState::Ready);
        assert_eq!(engine.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_logs_and_progress_are_captured() {
        let engine = Arc::new(StubEngine::default());
        let lifecycle = EngineLifecycle::new(engine, EngineResources::default());
        let recorder = Arc::new(Recorder::default());

        lifecycle.ensure_ready().await.unwrap();
        lifecycle.attach(recorder.clone());
        lifecycle.execute(&[]).await.unwrap();
        lifecycle.detach();
        lifecycle.execute(&[]).await.unwrap();

        assert_eq!(lifecycle.logs().snapshot(), vec!["frame=1", "frame=1"]);
        assert_eq!(
            *lock(&recorder.0),
            vec![JobEvent::EngineProgress { ratio: 0.5 }]
        );
    }

    #[tokio::test]
    async fn test_load_timeout() {
        let engine = Arc::new(StubEngine {
            load_delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let lifecycle = EngineLifecycle::new(engine, EngineResources::default())
            .with_timeout(Some(Duration::from_millis(20)));

        let err = lifecycle.ensure_ready().await.unwrap_err();
        assert_eq!(
            err,
            DomainError::EngineTimeout {
                operation: "load".to_string(),
                limit: Duration::from_millis(20),
            }
        );
        assert_eq!(lifecycle.state(), EngineState::Uninitialized);
    }
}
