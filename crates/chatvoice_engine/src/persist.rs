use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chat_logging::{chat_debug, chat_error, chat_warn};
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::store::{Listener, MemoryStore, SettingsStore, StoreError, SubscriptionId};

pub const DEFAULT_WRITE_WINDOW: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("settings directory missing or not writable: {0}")]
    Dir(String),
    #[error("settings file {path} is not a JSON object: {message}")]
    Corrupt { path: String, message: String },
    #[error("settings writer has stopped")]
    WriterClosed,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure `dir` exists and accepts new files; create it if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::Dir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::Dir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::Dir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| PersistError::Dir(e.to_string()))?;
    Ok(())
}

/// Replaces one file by writing a sibling temp file and renaming it over.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    path: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, content: &str) -> Result<(), PersistError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        ensure_dir(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.path).map_err(|e| PersistError::Io(e.error))?;
        Ok(())
    }
}

enum WriterCommand {
    Write(String),
    Flush(oneshot::Sender<Result<(), PersistError>>),
}

/// Coalesces writes: only the newest content of a burst reaches the disk,
/// once no newer content has arrived for the window.
pub struct DebouncedWriter {
    tx: mpsc::UnboundedSender<WriterCommand>,
}

impl DebouncedWriter {
    /// Must be called inside a tokio runtime.
    pub fn spawn(file: AtomicFileWriter, window: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(file, window, rx));
        Self { tx }
    }

    pub fn schedule(&self, content: String) {
        if self.tx.send(WriterCommand::Write(content)).is_err() {
            chat_warn!("Settings writer stopped; dropping write");
        }
    }

    /// Writes any pending content now.
    pub async fn flush(&self) -> Result<(), PersistError> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(WriterCommand::Flush(reply))
            .map_err(|_| PersistError::WriterClosed)?;
        done.await.map_err(|_| PersistError::WriterClosed)?
    }
}

async fn run_writer(
    file: AtomicFileWriter,
    window: Duration,
    mut rx: mpsc::UnboundedReceiver<WriterCommand>,
) {
    let mut pending: Option<String> = None;
    loop {
        let command = if pending.is_some() {
            match tokio::time::timeout(window, rx.recv()).await {
                Ok(command) => command,
                Err(_) => {
                    write_pending(&file, &mut pending);
                    continue;
                }
            }
        } else {
            rx.recv().await
        };

        match command {
            Some(WriterCommand::Write(content)) => pending = Some(content),
            Some(WriterCommand::Flush(reply)) => {
                let result = match pending.take() {
                    Some(content) => file.write(&content),
                    None => Ok(()),
                };
                let _ = reply.send(result);
            }
            None => {
                write_pending(&file, &mut pending);
                break;
            }
        }
    }
}

fn write_pending(file: &AtomicFileWriter, pending: &mut Option<String>) {
    if let Some(content) = pending.take() {
        match file.write(&content) {
            Ok(()) => chat_debug!("Saved settings to {}", file.path().display()),
            Err(err) => chat_error!("Failed to save settings to {}: {}", file.path().display(), err),
        }
    }
}

/// Settings backed by a JSON object on disk.
pub struct PersistentStore {
    memory: MemoryStore,
    writer: DebouncedWriter,
}

impl PersistentStore {
    /// Loads `path` when present. Must be called inside a tokio runtime.
    pub fn open(path: impl Into<PathBuf>, window: Duration) -> Result<Arc<Self>, PersistError> {
        let path = path.into();
        let values = read_values(&path)?;
        Ok(Arc::new(Self {
            memory: MemoryStore::with_values(values),
            writer: DebouncedWriter::spawn(AtomicFileWriter::new(path), window),
        }))
    }

    pub async fn flush(&self) -> Result<(), PersistError> {
        self.writer.flush().await
    }
}

fn read_values(path: &Path) -> Result<BTreeMap<String, Value>, PersistError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&raw).map_err(|err| PersistError::Corrupt {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

impl SettingsStore for PersistentStore {
    fn get_snapshot(&self, key: &str) -> Option<Value> {
        self.memory.get_snapshot(key)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.memory.set(key, value)?;
        let all = self.memory.snapshot_all();
        let content = serde_json::to_string_pretty(&all).map_err(|err| StoreError::Serialize {
            key: key.to_string(),
            message: err.to_string(),
        })?;
        self.writer.schedule(content);
        Ok(())
    }

    fn subscribe(&self, key: &str, listener: Listener) -> SubscriptionId {
        self.memory.subscribe(key, listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.memory.unsubscribe(id)
    }
}
