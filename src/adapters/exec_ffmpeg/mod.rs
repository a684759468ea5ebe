//! FFmpeg engine adapter
//!
//! Probing goes through libav; extract+re-encode runs the `ffmpeg` binary as a
//! child process inside a private scratch directory that serves as the
//! engine's filesystem. stderr lines are reported as engine logs and the
//! `-progress` stream on stdout as completion ratios.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use ffmpeg_next as ffmpeg;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::errors::*;
use crate::ports::*;

/// Flags added to every invocation: no prompts, overwrite, machine-readable progress
const PROCESS_FLAGS: [&str; 9] = [
    "-hide_banner",
    "-nostdin",
    "-y",
    "-nostats",
    "-progress",
    "pipe:1",
    "-loglevel",
    "info",
    "-stats_period",
];
const STATS_PERIOD: &str = "0.5";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Loaded engine: binary plus scratch directory
struct Session {
    binary: PathBuf,
    scratch: Arc<TempDir>,
}

/// FFmpeg-based transcoding engine
pub struct FFmpegEngineAdapter {
    observer: Mutex<Option<Arc<dyn EngineObserver>>>,
    session: Mutex<Option<Session>>,
}

impl Default for FFmpegEngineAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FFmpegEngineAdapter {
    /// Create an unloaded adapter; nothing touches the system until `load`
    pub fn new() -> Self {
        Self {
            observer: Mutex::new(None),
            session: Mutex::new(None),
        }
    }

    fn install_session(&self, binary: PathBuf, scratch: TempDir) {
        debug!("Engine scratch directory: {}", scratch.path().display());
        *lock(&self.session) = Some(Session {
            binary,
            scratch: Arc::new(scratch),
        });
    }

    /// Binary and scratch directory of the loaded engine
    fn session(&self) -> Result<(PathBuf, Arc<TempDir>), DomainError> {
        lock(&self.session)
            .as_ref()
            .map(|s| (s.binary.clone(), Arc::clone(&s.scratch)))
            .ok_or_else(|| DomainError::EngineFailed("engine is not loaded".to_string()))
    }

    /// Scratch path for a flat entry name
    fn resolve(&self, name: &str) -> Result<PathBuf, DomainError> {
        let (_, scratch) = self.session()?;
        resolve_entry(scratch.path(), name)
    }

    fn observer(&self) -> Option<Arc<dyn EngineObserver>> {
        lock(&self.observer).clone()
    }

    fn emit_log(&self, line: &str) {
        if let Some(observer) = self.observer() {
            observer.on_log(line);
        }
    }
}

/// Entries are flat names; anything that could escape the scratch directory is rejected
fn resolve_entry(scratch: &Path, name: &str) -> Result<PathBuf, DomainError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(DomainError::BadArgs(format!("Invalid engine file name: {:?}", name)));
    }
    Ok(scratch.join(name))
}

/// Parse an `hh:mm:ss[.frac]` clock value into seconds
pub fn parse_clock(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    if hours < 0.0 || minutes < 0.0 || seconds < 0.0 {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Position in seconds reported by one line of `-progress` output.
///
/// `out_time_ms` is in microseconds despite its name.
pub fn parse_out_time(line: &str) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => value
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|us| *us >= 0)
            .map(|us| us as f64 / 1_000_000.0),
        "out_time" => parse_clock(value),
        _ => None,
    }
}

/// Requested output length, taken from the `-t` argument
pub fn requested_length(args: &[String]) -> Option<f64> {
    args.windows(2)
        .find(|pair| pair[0] == "-t")
        .and_then(|pair| parse_clock(&pair[1]).or_else(|| pair[1].parse().ok()))
        .filter(|length| *length > 0.0)
}

/// Tracks `-progress` blocks and turns them into completion ratios
#[derive(Debug, Default)]
struct ProgressTracker {
    expected: Option<f64>,
    position: f64,
}

impl ProgressTracker {
    fn new(expected: Option<f64>) -> Self {
        Self {
            expected,
            position: 0.0,
        }
    }

    /// Ratio to report for this line, if it closes a progress block
    fn feed(&mut self, line: &str) -> Option<f64> {
        if let Some(position) = parse_out_time(line) {
            self.position = position;
            return None;
        }
        match line.trim() {
            "progress=end" => Some(1.0),
            "progress=continue" => self
                .expected
                .map(|expected| (self.position / expected).clamp(0.0, 1.0)),
            _ => None,
        }
    }
}

#[async_trait]
impl EnginePort for FFmpegEngineAdapter {
    fn subscribe(&self, observer: Arc<dyn EngineObserver>) {
        *lock(&self.observer) = Some(observer);
    }

    async fn load(&self, resources: &EngineResources) -> Result<(), DomainError> {
        ffmpeg::init()
            .map_err(|e| DomainError::EngineLoad(format!("libav initialization failed: {}", e)))?;

        let output = Command::new(&resources.binary)
            .args(["-hide_banner", "-version"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                DomainError::EngineLoad(format!(
                    "cannot run {}: {}",
                    resources.binary.display(),
                    e
                ))
            })?;
        if !output.status.success() {
            return Err(DomainError::EngineLoad(format!(
                "{} -version exited with {}",
                resources.binary.display(),
                output.status
            )));
        }
        if let Some(line) = String::from_utf8_lossy(&output.stdout).lines().next() {
            info!("Using {}", line);
            self.emit_log(line);
        }

        if let Some(root) = &resources.scratch_root {
            tokio::fs::create_dir_all(root).await.map_err(|e| {
                DomainError::EngineLoad(format!("cannot create {}: {}", root.display(), e))
            })?;
        }
        let mut builder = tempfile::Builder::new();
        builder.prefix("splitx-");
        let scratch = match &resources.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| DomainError::EngineLoad(format!("cannot create scratch directory: {}", e)))?;

        self.install_session(resources.binary.clone(), scratch);
        Ok(())
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), DomainError> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| DomainError::EngineFailed(format!("cannot write {}: {}", name, e)))
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, DomainError> {
        let path = self.resolve(name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| DomainError::EngineFailed(format!("cannot read {}: {}", name, e)))
    }

    async fn delete_file(&self, name: &str) -> Result<(), DomainError> {
        let path = self.resolve(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| DomainError::EngineFailed(format!("cannot delete {}: {}", name, e)))
    }

    async fn list_files(&self) -> Result<Vec<String>, DomainError> {
        let (_, scratch) = self.session()?;
        let mut entries = tokio::fs::read_dir(scratch.path()).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn probe_duration(&self, name: &str) -> Result<Option<f64>, DomainError> {
        let path = self.resolve(name)?;
        tokio::task::spawn_blocking(move || -> Result<Option<f64>, DomainError> {
            let context = ffmpeg::format::input(&path).map_err(|e| {
                DomainError::ProbeFail(format!("Failed to open {}: {}", path.display(), e))
            })?;
            let duration = context.duration();
            if duration <= 0 {
                return Ok(None);
            }
            Ok(Some(duration as f64 / ffmpeg::ffi::AV_TIME_BASE as f64))
        })
        .await
        .map_err(|e| DomainError::ProbeFail(format!("probe task failed: {}", e)))?
    }

    async fn execute(&self, args: &[String]) -> Result<(), DomainError> {
        let (binary, scratch) = self.session()?;
        let observer = self.observer();

        let mut child = Command::new(&binary)
            .args(PROCESS_FLAGS)
            .arg(STATS_PERIOD)
            .args(args)
            .current_dir(scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DomainError::EngineFailed(format!("failed to spawn ffmpeg: {}", e)))?;

        // Both pipes must be drained while ffmpeg runs
        let log_task = child.stderr.take().map(|stderr| {
            let observer = observer.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut last = None;
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(observer) = &observer {
                        observer.on_log(&line);
                    }
                    last = Some(line);
                }
                last
            })
        });

        let progress_task = child.stdout.take().map(|stdout| {
            let mut tracker = ProgressTracker::new(requested_length(args));
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let (Some(ratio), Some(observer)) = (tracker.feed(&line), &observer) {
                        observer.on_progress(ratio);
                    }
                }
            })
        });

        let status = child
            .wait()
            .await
            .map_err(|e| DomainError::EngineFailed(format!("failed to wait for ffmpeg: {}", e)))?;

        let last_line = match log_task {
            Some(task) => task.await.ok().flatten(),
            None => None,
        };
        if let Some(task) = progress_task {
            let _ = task.await;
        }

        if status.success() {
            return Ok(());
        }
        Err(DomainError::EngineFailed(match last_line {
            Some(line) => format!("ffmpeg exited with {}: {}", status, line),
            None => format!("ffmpeg exited with {}", status),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_adapter() -> FFmpegEngineAdapter {
        let adapter = FFmpegEngineAdapter::new();
        adapter.install_session(PathBuf::from("ffmpeg"), tempfile::tempdir().unwrap());
        adapter
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("00:01:00"), Some(60.0));
        assert_eq!(parse_clock("01:02:03.5"), Some(3723.5));
        assert_eq!(parse_clock("1:00"), None);
        assert_eq!(parse_clock("aa:bb:cc"), None);
    }

    #[test]
    fn test_parse_out_time() {
        assert_eq!(parse_out_time("out_time_us=5000000"), Some(5.0));
        assert_eq!(parse_out_time("out_time_ms=30500000"), Some(30.5));
        assert_eq!(parse_out_time("out_time=00:00:02.500000"), Some(2.5));
        assert_eq!(parse_out_time("out_time_us=N/A"), None);
        assert_eq!(parse_out_time("frame=100"), None);
    }

    #[test]
    fn test_requested_length() {
        let args: Vec<String> = ["-i", "input.mp4", "-ss", "00:01:00", "-t", "00:02:00", "out.mp4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(requested_length(&args), Some(120.0));
        assert_eq!(requested_length(&args[..4]), None);
    }

    #[test]
    fn test_progress_tracker_emits_on_block_end() {
        let mut tracker = ProgressTracker::new(Some(10.0));
        assert_eq!(tracker.feed("frame=10"), None);
        assert_eq!(tracker.feed("out_time_us=2500000"), None);
        assert_eq!(tracker.feed("progress=continue"), Some(0.25));
        assert_eq!(tracker.feed("out_time_us=12000000"), None);
        assert_eq!(tracker.feed("progress=continue"), Some(1.0));
        assert_eq!(tracker.feed("progress=end"), Some(1.0));
    }

    #[test]
    fn test_progress_tracker_without_length_reports_only_end() {
        let mut tracker = ProgressTracker::new(None);
        tracker.feed("out_time_us=2500000");
        assert_eq!(tracker.feed("progress=continue"), None);
        assert_eq!(tracker.feed("progress=end"), Some(1.0));
    }

    #[test]
    fn test_resolve_entry_rejects_paths() {
        let root = Path::new("/scratch");
        assert_eq!(resolve_entry(root, "input.mp4").unwrap(), root.join("input.mp4"));
        assert!(resolve_entry(root, "../etc/passwd").is_err());
        assert!(resolve_entry(root, "a/b.mp4").is_err());
        assert!(resolve_entry(root, "..").is_err());
        assert!(resolve_entry(root, "").is_err());
    }

    #[tokio::test]
    async fn test_unloaded_adapter_rejects_calls() {
        let adapter = FFmpegEngineAdapter::new();
        let err = adapter.write_file("input.mp4", b"data").await.unwrap_err();
        assert_eq!(err, DomainError::EngineFailed("engine is not loaded".to_string()));
        assert!(adapter.execute(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_scratch_file_roundtrip() {
        let adapter = loaded_adapter();

        adapter.write_file("input.mov", b"payload").await.unwrap();
        adapter.write_file("part_1.mp4", b"segment").await.unwrap();
        assert_eq!(adapter.list_files().await.unwrap(), vec!["input.mov", "part_1.mp4"]);
        assert_eq!(adapter.read_file("input.mov").await.unwrap(), b"payload");

        adapter.delete_file("input.mov").await.unwrap();
        adapter.delete_file("part_1.mp4").await.unwrap();
        assert!(adapter.list_files().await.unwrap().is_empty());
        assert!(adapter.read_file("input.mov").await.is_err());
    }
}
