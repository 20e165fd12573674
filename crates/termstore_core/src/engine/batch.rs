//! Atomic write batches.

use super::{OrderedEngine, Space};
use crate::error::EngineResult;
use bytes::Bytes;

/// One staged mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Store a value.
    Put {
        /// Target space.
        space: Space,
        /// Key bytes.
        key: Bytes,
        /// Value bytes.
        value: Bytes,
    },
    /// Remove a key.
    Delete {
        /// Target space.
        space: Space,
        /// Key bytes.
        key: Bytes,
    },
}

impl BatchOp {
    /// Space the op writes to.
    #[must_use]
    pub fn space(&self) -> Space {
        match self {
            Self::Put { space, .. } | Self::Delete { space, .. } => *space,
        }
    }

    /// Key the op writes to.
    #[must_use]
    pub fn key(&self) -> &Bytes {
        match self {
            Self::Put { key, .. } | Self::Delete { key, .. } => key,
        }
    }
}

/// A condition checked against committed state before a batch applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    /// Space of the key.
    pub space: Space,
    /// Key bytes.
    pub key: Bytes,
    /// Required current value; `None` requires the key to be absent.
    pub expected: Option<Bytes>,
}

/// A set of mutations applied all together or not at all.
///
/// Ops apply in insertion order, so a later op on the same key wins.
/// Preconditions are evaluated against the state before any op applies.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
    conditions: Vec<Precondition>,
}

impl WriteBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a put.
    pub fn put(&mut self, space: Space, key: impl Into<Bytes>, value: impl Into<Bytes>) {
        self.ops.push(BatchOp::Put {
            space,
            key: key.into(),
            value: value.into(),
        });
    }

    /// Stages a delete.
    pub fn delete(&mut self, space: Space, key: impl Into<Bytes>) {
        self.ops.push(BatchOp::Delete {
            space,
            key: key.into(),
        });
    }

    /// Requires `key` to be absent when the batch commits.
    pub fn expect_absent(&mut self, space: Space, key: impl Into<Bytes>) {
        self.expect_value(space, key, None);
    }

    /// Requires `key` to hold exactly `expected` (or be absent for `None`).
    pub fn expect_value(&mut self, space: Space, key: impl Into<Bytes>, expected: Option<Bytes>) {
        self.conditions.push(Precondition {
            space,
            key: key.into(),
            expected,
        });
    }

    /// Staged ops in application order.
    #[must_use]
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Staged preconditions.
    #[must_use]
    pub fn conditions(&self) -> &[Precondition] {
        &self.conditions
    }

    /// Number of staged ops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether no ops are staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// A write batch bound to the engine it will commit to.
///
/// Nothing reaches the engine until [`Batch::commit`]. A batch dropped
/// without committing discards everything it staged.
pub struct Batch<'e> {
    engine: &'e dyn OrderedEngine,
    staged: WriteBatch,
}

impl<'e> Batch<'e> {
    /// Starts a batch against `engine`.
    pub fn new(engine: &'e dyn OrderedEngine) -> Self {
        Self {
            engine,
            staged: WriteBatch::new(),
        }
    }

    /// The engine this batch commits to.
    #[must_use]
    pub fn engine(&self) -> &'e dyn OrderedEngine {
        self.engine
    }

    /// Stages a put.
    pub fn put(&mut self, space: Space, key: impl Into<Bytes>, value: impl Into<Bytes>) {
        self.staged.put(space, key, value);
    }

    /// Stages a delete.
    pub fn delete(&mut self, space: Space, key: impl Into<Bytes>) {
        self.staged.delete(space, key);
    }

    /// Requires `key` to be absent at commit.
    pub fn expect_absent(&mut self, space: Space, key: impl Into<Bytes>) {
        self.staged.expect_absent(space, key);
    }

    /// Requires `key` to hold `expected` at commit.
    pub fn expect_value(&mut self, space: Space, key: impl Into<Bytes>, expected: Option<Bytes>) {
        self.staged.expect_value(space, key, expected);
    }

    /// Number of staged ops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// Whether no ops are staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Applies everything staged in one atomic write.
    ///
    /// # Errors
    ///
    /// Returns the engine's error; on failure nothing was written.
    pub fn commit(self) -> EngineResult<()> {
        if self.staged.is_empty() && self.staged.conditions().is_empty() {
            return Ok(());
        }
        self.engine.write(self.staged)
    }
}

impl std::fmt::Debug for Batch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch").field("staged", &self.staged).finish()
    }
}
