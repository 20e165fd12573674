//! Ordered key-value engine adapter.
//!
//! The record store never touches a concrete engine. It talks to an
//! [`OrderedEngine`]: point reads and writes, bidirectional [`Cursor`]s
//! and atomic [`WriteBatch`]es with optional preconditions. Keys and
//! values are opaque bytes compared bytewise.
//!
//! Two engines ship with the crate:
//! - [`MemoryEngine`]: copy-on-write `BTreeMap`s, nothing persisted
//! - [`LogEngine`]: the same state rebuilt from a checksummed journal

mod batch;
mod journal;
mod log_engine;
mod memory;

pub use batch::{Batch, BatchOp, Precondition, WriteBatch};
pub use log_engine::LogEngine;
pub use memory::{MemoryCursor, MemoryEngine};

use crate::error::EngineResult;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// A separate keyspace inside one engine.
///
/// Spaces never see each other's keys, so range operations over records
/// are not disturbed by index entries or counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Space {
    /// Primary records.
    Records = 0,
    /// Secondary index entries.
    Index = 1,
    /// Store metadata such as the sequence counter.
    Meta = 2,
}

impl Space {
    /// Number of spaces.
    pub const COUNT: usize = 3;

    /// All spaces in byte order.
    pub const ALL: [Space; Self::COUNT] = [Space::Records, Space::Index, Space::Meta];

    /// Converts the space to its journal byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Converts a journal byte to a space.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Records),
            1 => Some(Self::Index),
            2 => Some(Self::Meta),
            _ => None,
        }
    }

    pub(crate) const fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Records => "records",
            Self::Index => "index",
            Self::Meta => "meta",
        };
        f.write_str(name)
    }
}

/// A bidirectional iterator over one space of an engine.
///
/// A fresh cursor is not positioned. After any movement the cursor either
/// rests on an entry (`valid()` is true) or has run off an end. Moving an
/// invalid cursor with `next` or `prev` leaves it invalid. Dropping the
/// cursor releases whatever it pins in the engine.
pub trait Cursor {
    /// Positions at the first key `>= key`.
    fn seek(&mut self, key: &[u8]) -> EngineResult<()>;

    /// Positions at the smallest key.
    fn seek_to_first(&mut self) -> EngineResult<()>;

    /// Positions at the largest key.
    fn seek_to_last(&mut self) -> EngineResult<()>;

    /// Advances to the next larger key.
    fn next(&mut self) -> EngineResult<()>;

    /// Steps back to the next smaller key.
    fn prev(&mut self) -> EngineResult<()>;

    /// Whether the cursor rests on an entry.
    fn valid(&self) -> bool;

    /// Key under the cursor.
    fn key(&self) -> Option<&[u8]>;

    /// Value under the cursor.
    fn value(&self) -> Option<&[u8]>;
}

/// A sorted key-value engine with bytewise key order.
///
/// # Contract
///
/// - `get` after a committed `put` returns the new value
/// - a cursor sees one consistent state of its space; writes committed
///   after it was opened may or may not be visible
/// - `write` applies every op of a batch or none of them, and applies
///   nothing if any precondition fails
pub trait OrderedEngine: Send + Sync {
    /// Reads the value stored at `key`.
    fn get(&self, space: Space, key: &[u8]) -> EngineResult<Option<Bytes>>;

    /// Stores `value` at `key`, replacing any previous value.
    fn put(&self, space: Space, key: &[u8], value: &[u8]) -> EngineResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(space, Bytes::copy_from_slice(key), Bytes::copy_from_slice(value));
        self.write(batch)
    }

    /// Removes `key`. Removing an absent key is not an error.
    fn delete(&self, space: Space, key: &[u8]) -> EngineResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(space, Bytes::copy_from_slice(key));
        self.write(batch)
    }

    /// Opens a cursor over `space`.
    fn cursor(&self, space: Space) -> EngineResult<Box<dyn Cursor + '_>>;

    /// Applies a batch atomically.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::ConditionFailed`] if a precondition
    /// does not hold. Nothing is written in that case.
    fn write(&self, batch: WriteBatch) -> EngineResult<()>;

    /// Number of keys in `space`, if the engine tracks it.
    fn key_count(&self, _space: Space) -> EngineResult<Option<u64>> {
        Ok(None)
    }

    /// Makes every committed batch durable.
    fn flush(&self) -> EngineResult<()> {
        Ok(())
    }
}

impl<E: OrderedEngine + ?Sized> OrderedEngine for Arc<E> {
    fn get(&self, space: Space, key: &[u8]) -> EngineResult<Option<Bytes>> {
        (**self).get(space, key)
    }

    fn put(&self, space: Space, key: &[u8], value: &[u8]) -> EngineResult<()> {
        (**self).put(space, key, value)
    }

    fn delete(&self, space: Space, key: &[u8]) -> EngineResult<()> {
        (**self).delete(space, key)
    }

    fn cursor(&self, space: Space) -> EngineResult<Box<dyn Cursor + '_>> {
        (**self).cursor(space)
    }

    fn write(&self, batch: WriteBatch) -> EngineResult<()> {
        (**self).write(batch)
    }

    fn key_count(&self, space: Space) -> EngineResult<Option<u64>> {
        (**self).key_count(space)
    }

    fn flush(&self) -> EngineResult<()> {
        (**self).flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_byte_roundtrip() {
        for space in Space::ALL {
            assert_eq!(Space::from_byte(space.as_byte()), Some(space));
        }
        assert_eq!(Space::from_byte(3), None);
    }

    #[test]
    fn shared_engine_through_arc() {
        let engine = Arc::new(MemoryEngine::new());
        let other = Arc::clone(&engine);

        engine.put(Space::Records, b"k", b"v").unwrap();
        assert_eq!(
            other.get(Space::Records, b"k").unwrap(),
            Some(Bytes::from_static(b"v"))
        );
        assert_eq!(other.key_count(Space::Records).unwrap(), Some(1));
    }

    #[test]
    fn spaces_are_isolated() {
        let engine = MemoryEngine::new();
        engine.put(Space::Records, b"k", b"record").unwrap();
        engine.put(Space::Meta, b"k", b"meta").unwrap();

        assert_eq!(
            engine.get(Space::Records, b"k").unwrap().as_deref(),
            Some(&b"record"[..])
        );
        assert_eq!(
            engine.get(Space::Meta, b"k").unwrap().as_deref(),
            Some(&b"meta"[..])
        );
        assert_eq!(engine.get(Space::Index, b"k").unwrap(), None);
    }
}
