//! Journaled ordered engine.

use super::journal::{self, Frame};
use super::memory::{MemoryEngine, Snapshot};
use super::{BatchOp, Cursor, OrderedEngine, Space, WriteBatch};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use bytes::Bytes;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use termstore_storage::{FileBackend, StorageBackend};
use tracing::{debug, info, trace, warn};

/// An engine that journals every batch to a [`StorageBackend`].
///
/// The sorted state lives in memory and is rebuilt by replaying the
/// journal on open. Each committed batch is one checksummed record, so a
/// crash leaves at most one torn record at the tail. Recovery drops that
/// tail; a record that is complete but fails its checksum is reported as
/// corruption.
///
/// If a failed write cannot be rolled back, the engine is poisoned: every
/// later write fails until the journal is rewritten by
/// [`LogEngine::compact`] or the engine is reopened.
///
/// # Example
///
/// ```
/// use termstore_core::{EngineConfig, LogEngine, OrderedEngine, Space};
/// use termstore_storage::InMemoryBackend;
///
/// let engine = LogEngine::open(Box::new(InMemoryBackend::new()), EngineConfig::default()).unwrap();
/// engine.put(Space::Records, b"k", b"v").unwrap();
/// assert!(engine.get(Space::Records, b"k").unwrap().is_some());
/// ```
pub struct LogEngine {
    journal: Mutex<Box<dyn StorageBackend>>,
    state: MemoryEngine,
    config: EngineConfig,
    poisoned: AtomicBool,
}

impl LogEngine {
    /// Opens an engine over `backend`, replaying its journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal is corrupted or cannot be read.
    pub fn open(mut backend: Box<dyn StorageBackend>, config: EngineConfig) -> EngineResult<Self> {
        let snapshot = replay(backend.as_mut())?;
        info!(
            records = snapshot.entries(Space::Records).count(),
            journal_bytes = backend.size()?,
            "journal replayed"
        );
        Ok(Self {
            journal: Mutex::new(backend),
            state: MemoryEngine::from_snapshot(snapshot),
            config,
            poisoned: AtomicBool::new(false),
        })
    }

    /// Opens an engine journaling to the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingJournal`] if the file is absent and
    /// `create_if_missing` is off, or any error from [`LogEngine::open`].
    pub fn open_path(path: &Path, config: EngineConfig) -> EngineResult<Self> {
        if !config.create_if_missing && !path.exists() {
            return Err(EngineError::MissingJournal {
                path: path.to_path_buf(),
            });
        }
        let backend = FileBackend::open_with_create_dirs(path)?;
        Self::open(Box::new(backend), config)
    }

    /// Rewrites the journal as a single record holding the live state.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be replaced.
    pub fn compact(&self) -> EngineResult<()> {
        let mut backend = self.journal.lock();
        let before = backend.size()?;
        let snapshot = self.state.snapshot();

        let ops: Vec<BatchOp> = Space::ALL
            .into_iter()
            .flat_map(|space| {
                snapshot.entries(space).map(move |(key, value)| BatchOp::Put {
                    space,
                    key: key.clone(),
                    value: value.clone(),
                })
            })
            .collect();
        let data = if ops.is_empty() {
            Vec::new()
        } else {
            journal::encode_record(&ops)
        };
        backend.replace(&data)?;
        if self.poisoned.swap(false, Ordering::SeqCst) {
            info!("journal rewritten, engine no longer poisoned");
        }

        info!(before, after = data.len(), entries = ops.len(), "journal compacted");
        Ok(())
    }

    /// Current size of the journal in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be read.
    pub fn journal_size(&self) -> EngineResult<u64> {
        Ok(self.journal.lock().size()?)
    }

    /// Whether a failed rollback has poisoned the engine.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

fn replay(backend: &mut dyn StorageBackend) -> EngineResult<Snapshot> {
    let data = backend.read_all()?;
    let mut snapshot = Snapshot::default();
    let mut offset = 0usize;
    let mut records = 0usize;

    while offset < data.len() {
        match journal::read_record(&data, offset)? {
            Frame::Record { ops, len } => {
                trace!(offset, ops = ops.len(), "replaying record");
                snapshot.apply(ops);
                offset += len;
                records += 1;
            }
            Frame::Torn => {
                warn!(
                    offset,
                    torn_bytes = data.len() - offset,
                    "discarding torn record at journal tail"
                );
                backend.truncate(offset as u64)?;
                break;
            }
        }
    }

    debug!(records, "journal scan complete");
    Ok(snapshot)
}

impl OrderedEngine for LogEngine {
    fn get(&self, space: Space, key: &[u8]) -> EngineResult<Option<Bytes>> {
        self.state.get(space, key)
    }

    fn cursor(&self, space: Space) -> EngineResult<Box<dyn Cursor + '_>> {
        self.state.cursor(space)
    }

    fn write(&self, batch: WriteBatch) -> EngineResult<()> {
        let mut backend = self.journal.lock();
        if self.poisoned.load(Ordering::SeqCst) {
            return Err(EngineError::Poisoned {
                message: "journal holds a torn write that could not be rolled back".into(),
            });
        }
        let sync = self.config.sync_on_commit;

        self.state.write_with(batch, |batch| {
            let record = journal::encode_record(batch.ops());
            let start = backend.size()?;
            let appended = backend.append(&record).and_then(|_| {
                if sync {
                    backend.sync()
                } else {
                    backend.flush()
                }
            });
            if let Err(err) = appended {
                if let Err(rollback) = backend.truncate(start) {
                    // Appending after the torn bytes would bury later records.
                    warn!(start, error = %rollback, "journal rollback failed, poisoning engine");
                    self.poisoned.store(true, Ordering::SeqCst);
                }
                return Err(err.into());
            }
            Ok(())
        })
    }

    fn key_count(&self, space: Space) -> EngineResult<Option<u64>> {
        self.state.key_count(space)
    }

    fn flush(&self) -> EngineResult<()> {
        Ok(self.journal.lock().sync()?)
    }
}

impl std::fmt::Debug for LogEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
