//! In-memory ordered engine.

use super::{BatchOp, Cursor, OrderedEngine, Precondition, Space, WriteBatch};
use crate::error::{EngineError, EngineResult};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

type Keyspace = BTreeMap<Bytes, Bytes>;

/// Committed state of every space.
#[derive(Debug, Clone, Default)]
pub(crate) struct Snapshot {
    spaces: [Keyspace; Space::COUNT],
}

impl Snapshot {
    fn space(&self, space: Space) -> &Keyspace {
        &self.spaces[space.slot()]
    }

    pub(crate) fn entries(&self, space: Space) -> impl Iterator<Item = (&Bytes, &Bytes)> {
        self.space(space).iter()
    }

    fn check(&self, conditions: &[Precondition]) -> EngineResult<()> {
        for condition in conditions {
            let current = self.space(condition.space).get(&condition.key);
            if current != condition.expected.as_ref() {
                return Err(EngineError::ConditionFailed {
                    space: condition.space,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn apply(&mut self, ops: Vec<BatchOp>) {
        for op in ops {
            match op {
                BatchOp::Put { space, key, value } => {
                    self.spaces[space.slot()].insert(key, value);
                }
                BatchOp::Delete { space, key } => {
                    self.spaces[space.slot()].remove(&key);
                }
            }
        }
    }
}

/// An engine holding every space in sorted maps.
///
/// Writers swap in a new copy-on-write snapshot; cursors keep the snapshot
/// they were opened on, so iteration never blocks writers and never sees a
/// half-applied batch.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: RwLock<Arc<Snapshot>>,
}

impl MemoryEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub(crate) fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.state.read())
    }

    /// Checks preconditions, runs `before_apply`, then applies the ops.
    ///
    /// The state stays write-locked throughout, so no other batch can slip
    /// in between the check and the apply. If `before_apply` fails the
    /// batch is discarded.
    pub(crate) fn write_with<F>(&self, batch: WriteBatch, before_apply: F) -> EngineResult<()>
    where
        F: FnOnce(&WriteBatch) -> EngineResult<()>,
    {
        let mut state = self.state.write();
        state.check(batch.conditions())?;
        if batch.is_empty() {
            return Ok(());
        }
        before_apply(&batch)?;
        Arc::make_mut(&mut state).apply(batch.into_ops());
        Ok(())
    }
}

impl OrderedEngine for MemoryEngine {
    fn get(&self, space: Space, key: &[u8]) -> EngineResult<Option<Bytes>> {
        Ok(self.state.read().space(space).get(key).cloned())
    }

    fn cursor(&self, space: Space) -> EngineResult<Box<dyn Cursor + '_>> {
        Ok(Box::new(MemoryCursor::new(self.snapshot(), space)))
    }

    fn write(&self, batch: WriteBatch) -> EngineResult<()> {
        self.write_with(batch, |_| Ok(()))
    }

    fn key_count(&self, space: Space) -> EngineResult<Option<u64>> {
        Ok(Some(self.state.read().space(space).len() as u64))
    }
}

/// A cursor over one space of a pinned snapshot.
#[derive(Debug)]
pub struct MemoryCursor {
    snapshot: Arc<Snapshot>,
    space: Space,
    current: Option<(Bytes, Bytes)>,
}

impl MemoryCursor {
    pub(crate) fn new(snapshot: Arc<Snapshot>, space: Space) -> Self {
        Self {
            snapshot,
            space,
            current: None,
        }
    }

    fn keyspace(&self) -> &Keyspace {
        self.snapshot.space(self.space)
    }

    fn position(entry: Option<(&Bytes, &Bytes)>) -> Option<(Bytes, Bytes)> {
        entry.map(|(k, v)| (k.clone(), v.clone()))
    }
}

impl Cursor for MemoryCursor {
    fn seek(&mut self, key: &[u8]) -> EngineResult<()> {
        let found = self
            .keyspace()
            .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
            .next();
        self.current = Self::position(found);
        Ok(())
    }

    fn seek_to_first(&mut self) -> EngineResult<()> {
        self.current = Self::position(self.keyspace().iter().next());
        Ok(())
    }

    fn seek_to_last(&mut self) -> EngineResult<()> {
        self.current = Self::position(self.keyspace().iter().next_back());
        Ok(())
    }

    fn next(&mut self) -> EngineResult<()> {
        let next = match &self.current {
            Some((key, _)) => Self::position(
                self.keyspace()
                    .range::<[u8], _>((Bound::Excluded(key.as_ref()), Bound::Unbounded))
                    .next(),
            ),
            None => None,
        };
        self.current = next;
        Ok(())
    }

    fn prev(&mut self) -> EngineResult<()> {
        let prev = match &self.current {
            Some((key, _)) => Self::position(
                self.keyspace()
                    .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(key.as_ref())))
                    .next_back(),
            ),
            None => None,
        };
        self.current = prev;
        Ok(())
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn key(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(k, _)| k.as_ref())
    }

    fn value(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(_, v)| v.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(keys: &[&'static [u8]]) -> MemoryEngine {
        let engine = MemoryEngine::new();
        let mut batch = WriteBatch::new();
        for key in keys {
            batch.put(Space::Records, *key, *key);
        }
        engine.write(batch).unwrap();
        engine
    }

    fn walk_forward(cursor: &mut dyn Cursor) -> Vec<Vec<u8>> {
        let mut keys = Vec::new();
        while let Some(key) = cursor.key() {
            keys.push(key.to_vec());
            cursor.next().unwrap();
        }
        keys
    }

    #[test]
    fn get_put_delete() {
        let engine = MemoryEngine::new();
        assert_eq!(engine.get(Space::Records, b"a").unwrap(), None);

        engine.put(Space::Records, b"a", b"1").unwrap();
        assert_eq!(
            engine.get(Space::Records, b"a").unwrap().as_deref(),
            Some(&b"1"[..])
        );

        engine.delete(Space::Records, b"a").unwrap();
        engine.delete(Space::Records, b"a").unwrap();
        assert_eq!(engine.get(Space::Records, b"a").unwrap(), None);
    }

    #[test]
    fn unpositioned_cursor_is_invalid() {
        let engine = engine_with(&[b"a"]);
        let cursor = engine.cursor(Space::Records).unwrap();
        assert!(!cursor.valid());
        assert_eq!(cursor.key(), None);
        assert_eq!(cursor.value(), None);
    }

    #[test]
    fn cursor_walks_in_byte_order() {
        let engine = engine_with(&[b"b", b"a", b"\xff", b"ab", b"\x00"]);
        let mut cursor = engine.cursor(Space::Records).unwrap();
        cursor.seek_to_first().unwrap();
        assert_eq!(
            walk_forward(cursor.as_mut()),
            vec![
                b"\x00".to_vec(),
                b"a".to_vec(),
                b"ab".to_vec(),
                b"b".to_vec(),
                b"\xff".to_vec()
            ]
        );
        assert!(!cursor.valid());
    }

    #[test]
    fn seek_lands_on_first_key_at_or_after() {
        let engine = engine_with(&[b"a", b"c", b"e"]);
        let mut cursor = engine.cursor(Space::Records).unwrap();

        cursor.seek(b"c").unwrap();
        assert_eq!(cursor.key(), Some(&b"c"[..]));
        cursor.seek(b"d").unwrap();
        assert_eq!(cursor.key(), Some(&b"e"[..]));
        cursor.seek(b"f").unwrap();
        assert!(!cursor.valid());
    }

    #[test]
    fn prev_walks_backwards() {
        let engine = engine_with(&[b"a", b"b", b"c"]);
        let mut cursor = engine.cursor(Space::Records).unwrap();

        cursor.seek_to_last().unwrap();
        assert_eq!(cursor.key(), Some(&b"c"[..]));
        cursor.prev().unwrap();
        assert_eq!(cursor.key(), Some(&b"b"[..]));
        cursor.prev().unwrap();
        cursor.prev().unwrap();
        assert!(!cursor.valid());

        cursor.prev().unwrap();
        assert!(!cursor.valid());
    }

    #[test]
    fn cursor_keeps_its_snapshot() {
        let engine = engine_with(&[b"a", b"b"]);
        let mut cursor = engine.cursor(Space::Records).unwrap();

        engine.delete(Space::Records, b"b").unwrap();
        engine.put(Space::Records, b"c", b"c").unwrap();

        cursor.seek_to_first().unwrap();
        assert_eq!(
            walk_forward(cursor.as_mut()),
            vec![b"a".to_vec(), b"b".to_vec()]
        );
        assert_eq!(engine.key_count(Space::Records).unwrap(), Some(2));
    }

    #[test]
    fn empty_space_cursor() {
        let engine = engine_with(&[b"a"]);
        let mut cursor = engine.cursor(Space::Index).unwrap();
        cursor.seek_to_first().unwrap();
        assert!(!cursor.valid());
        cursor.seek_to_last().unwrap();
        assert!(!cursor.valid());
    }
}
