//! Error types for the engine adapter and the record store.

use crate::engine::Space;
use std::path::PathBuf;
use termstore_codec::CodecError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by an ordered engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The byte log under the engine failed.
    #[error("storage error: {0}")]
    Storage(#[from] termstore_storage::StorageError),

    /// The journal holds bytes that cannot be a valid record.
    #[error("journal corrupted at offset {offset}: {message}")]
    Corrupted {
        /// Offset of the bad record.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// A journal record failed its checksum.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the bad record.
        offset: u64,
        /// Checksum stored in the record.
        expected: u32,
        /// Checksum computed over the record.
        actual: u32,
    },

    /// A batch precondition did not hold; nothing was written.
    #[error("batch precondition failed in {space} space")]
    ConditionFailed {
        /// Space of the first failing precondition.
        space: Space,
    },

    /// The journal does not exist and the config forbids creating it.
    #[error("journal not found: {}", path.display())]
    MissingJournal {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// An earlier write left bytes in the journal that could not be rolled
    /// back; the engine refuses further writes until it is reopened.
    #[error("engine poisoned: {message}")]
    Poisoned {
        /// The failure that poisoned the engine.
        message: String,
    },
}

impl EngineError {
    /// Creates a corruption error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            message: message.into(),
        }
    }

    /// Returns whether this is a failed batch precondition.
    #[must_use]
    pub fn is_condition_failed(&self) -> bool {
        matches!(self, Self::ConditionFailed { .. })
    }
}

/// Errors returned by the record store and range operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A key or value term could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[source] CodecError),

    /// Bytes read back from the engine do not decode to a term.
    #[error("decode error: {0}")]
    Decode(#[source] CodecError),

    /// The engine failed. Never retried by the store.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// No record exists at the key.
    #[error("record not found")]
    NotFound,

    /// The keyspace holds no records.
    #[error("store is empty")]
    EmptyStore,

    /// No record sorts after the key.
    #[error("no successor")]
    NoSuccessor,

    /// No record sorts before the key.
    #[error("no predecessor")]
    NoPredecessor,

    /// The operation is not available for these arguments.
    #[error("unsupported: {operation}")]
    Unsupported {
        /// What was attempted.
        operation: String,
    },

    /// The sequence counter has reached its largest value.
    #[error("sequence counter exhausted at {last}")]
    SequenceExhausted {
        /// Last value handed out.
        last: i64,
    },

    /// A read-modify-write kept losing to concurrent writers.
    #[error("write contention: gave up after {attempts} attempts")]
    Contention {
        /// Attempts made before giving up.
        attempts: u32,
    },
}

impl StoreError {
    /// Creates an unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Returns whether this is an expected absence rather than a failure.
    #[must_use]
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::EmptyStore | Self::NoSuccessor | Self::NoPredecessor
        )
    }
}
