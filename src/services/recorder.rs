//! Session recorder: hands completed sessions to the persister off the tick path

use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{error::RecordError, state::SessionRecord};

/// Records that may wait for the writer before new ones are dropped
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Append-only sink for completed sessions
pub trait Persister: Send + 'static {
    fn append(&mut self, record: &SessionRecord) -> io::Result<()>;
}

/// Sending half of the record queue; cheap to clone, never blocks
#[derive(Debug, Clone)]
pub struct SessionRecorder {
    tx: mpsc::Sender<SessionRecord>,
}

impl SessionRecorder {
    /// Create a recorder whose records are read from the returned receiver
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SessionRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Create a recorder backed by a writer thread that drains into `persister`.
    ///
    /// The writer exits once every `SessionRecorder` clone has been dropped and
    /// the queue is empty.
    pub fn spawn<P: Persister>(mut persister: P, capacity: usize) -> (Self, JoinHandle<()>) {
        let (recorder, mut rx) = Self::channel(capacity);
        let handle = tokio::task::spawn_blocking(move || {
            debug!("Session writer started");
            while let Some(record) = rx.blocking_recv() {
                if let Err(e) = persister.append(&record) {
                    warn!("Failed to persist {} session: {}", record.phase, e);
                }
            }
            debug!("Session writer drained and stopped");
        });
        (recorder, handle)
    }

    /// Enqueue a record without waiting for the persister
    pub fn record(&self, record: SessionRecord) -> Result<(), RecordError> {
        self.tx.try_send(record).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RecordError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => RecordError::Closed,
        })
    }
}

/// Persists sessions as one JSON object per line
#[derive(Debug, Clone)]
pub struct JsonLinesLog {
    path: PathBuf,
}

impl JsonLinesLog {
    /// Append to `path`; the file is created on the first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Recording sessions to {}", path.display());
        Self { path }
    }

    /// Location of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persister for JsonLinesLog {
    fn append(&mut self, record: &SessionRecord) -> io::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        debug!("Persisted {} session ({}s)", record.phase, record.duration_seconds);
        Ok(())
    }
}
