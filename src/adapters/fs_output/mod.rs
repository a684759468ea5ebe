// Filesystem output adapter - Destination folders and their pickers

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::errors::*;
use crate::ports::*;

/// Writes segment files into one folder
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Temporary sibling used while a file is being written
    fn temp_path(&self, filename: &str) -> PathBuf {
        self.root.join(format!(".tmp_{}", filename))
    }
}

/// Write, flush and sync `bytes` to `path`; the handle is closed on every return path
async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).await?;
    writer.flush().await?;
    writer.get_ref().sync_all().await
}

#[async_trait]
impl OutputSinkPort for DirectorySink {
    fn name(&self) -> String {
        self.root.display().to_string()
    }

    async fn write(&self, filename: &str, bytes: &[u8]) -> Result<(), DomainError> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename == ".." {
            return Err(DomainError::BadArgs(format!("Invalid output file name: {:?}", filename)));
        }

        let target = self.root.join(filename);
        let temp = self.temp_path(filename);

        let result = match write_synced(&temp, bytes).await {
            Ok(()) => tokio::fs::rename(&temp, &target).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                debug!("Could not remove {}: {}", temp.display(), cleanup);
            }
            return Err(DomainError::FsFail(format!(
                "Failed to write {}: {}",
                target.display(),
                e
            )));
        }

        debug!("Wrote {} bytes to {}", bytes.len(), target.display());
        Ok(())
    }
}

/// Make sure `path` is a writable folder, creating it when missing
async fn open_directory(path: &Path) -> Result<DirectorySink, DomainError> {
    tokio::fs::create_dir_all(path).await.map_err(|e| {
        DomainError::DestinationDenied(format!("cannot create {}: {}", path.display(), e))
    })?;
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        DomainError::DestinationDenied(format!("cannot access {}: {}", path.display(), e))
    })?;
    if !metadata.is_dir() {
        return Err(DomainError::DestinationDenied(format!(
            "{} is not a folder",
            path.display()
        )));
    }
    if metadata.permissions().readonly() {
        return Err(DomainError::DestinationDenied(format!(
            "{} is read-only",
            path.display()
        )));
    }
    Ok(DirectorySink::new(path))
}

/// Destination chosen up front, e.g. from `--output-dir`
pub struct FixedDirectoryPicker {
    path: PathBuf,
}

impl FixedDirectoryPicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DestinationPickerPort for FixedDirectoryPicker {
    async fn pick(&self) -> Result<Option<Arc<dyn OutputSinkPort>>, DomainError> {
        let sink = open_directory(&self.path).await?;
        Ok(Some(Arc::new(sink)))
    }
}

/// Asks for a folder on the terminal; an empty answer or an interrupt cancels
pub struct PromptDirectoryPicker<R> {
    reader: Mutex<R>,
    cancel: CancellationToken,
}

impl PromptDirectoryPicker<BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R> PromptDirectoryPicker<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
            cancel: CancellationToken::new(),
        }
    }

    /// Stop waiting for an answer once `cancel` fires
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[async_trait]
impl<R> DestinationPickerPort for PromptDirectoryPicker<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn pick(&self) -> Result<Option<Arc<dyn OutputSinkPort>>, DomainError> {
        eprint!("Output folder (leave empty to cancel): ");

        let mut answer = String::new();
        let mut reader = self.reader.lock().await;
        let read = tokio::select! {
            read = reader.read_line(&mut answer) => read.map_err(|e| {
                DomainError::DestinationDenied(format!("cannot read answer: {}", e))
            })?,
            _ = self.cancel.cancelled() => {
                eprintln!();
                info!("Folder prompt interrupted");
                return Ok(None);
            }
        };
        drop(reader);

        let answer = answer.trim();
        if read == 0 || answer.is_empty() {
            info!("No output folder chosen");
            return Ok(None);
        }

        let sink = open_directory(Path::new(answer)).await?;
        Ok(Some(Arc::new(sink)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());

        sink.write("part_1_movie.mp4", b"segment one").await.unwrap();

        let written = std::fs::read(dir.path().join("part_1_movie.mp4")).unwrap();
        assert_eq!(written, b"segment one");
    }

    #[tokio::test]
    async fn test_write_overwrites_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());

        sink.write("part_1_movie.mp4", b"a much longer first payload").await.unwrap();
        sink.write("part_1_movie.mp4", b"short").await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("part_1_movie.mp4")).unwrap(), b"short");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_write_into_missing_folder_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("gone"));

        let err = sink.write("part_1_movie.mp4", b"data").await.unwrap_err();
        assert!(matches!(err, DomainError::FsFail(_)));
    }

    #[tokio::test]
    async fn test_write_rejects_nested_names() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        assert!(matches!(
            sink.write("../escape.mp4", b"data").await,
            Err(DomainError::BadArgs(_))
        ));
    }

    #[tokio::test]
    async fn test_fixed_picker_creates_folder() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("segments");
        let picker = FixedDirectoryPicker::new(&target);

        let sink = picker.pick().await.unwrap().unwrap();
        assert!(target.is_dir());
        assert_eq!(sink.name(), target.display().to_string());
    }

    #[tokio::test]
    async fn test_fixed_picker_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_folder");
        std::fs::write(&file, b"x").unwrap();

        let result = FixedDirectoryPicker::new(&file).pick().await;
        assert!(matches!(result, Err(DomainError::DestinationDenied(_))));
    }

    #[tokio::test]
    async fn test_prompt_picker_empty_answer_cancels() {
        let picker = PromptDirectoryPicker::new(Cursor::new(b"   \n".to_vec()));
        assert!(picker.pick().await.unwrap().is_none());

        let picker = PromptDirectoryPicker::new(Cursor::new(Vec::new()));
        assert!(picker.pick().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prompt_picker_stops_on_cancel() {
        let (_writer, silent) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        let picker = PromptDirectoryPicker::new(BufReader::new(silent)).with_cancel(cancel.clone());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let picked = tokio::time::timeout(std::time::Duration::from_secs(5), picker.pick())
            .await
            .expect("prompt kept waiting after cancel");
        assert!(picked.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prompt_picker_uses_answer() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        let answer = format!("{}\n", target.display());
        let picker = PromptDirectoryPicker::new(Cursor::new(answer.into_bytes()));

        let sink = picker.pick().await.unwrap().unwrap();
        sink.write("part_1_a.mp4", b"data").await.unwrap();
        assert!(target.join("part_1_a.mp4").is_file());
    }
}
