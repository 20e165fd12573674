//! Range operations over one space of an ordered engine.
//!
//! Everything here works on encoded bytes. The record store encodes
//! terms on the way in and decodes them on the way out.
//!
//! Every operation opens its own cursor and drops it before returning,
//! on success and on error alike.

use crate::engine::{Batch, Cursor, OrderedEngine, Space};
use crate::error::{StoreError, StoreResult};
use bytes::Bytes;
use tracing::debug;

/// A raw key-value pair read from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Encoded key.
    pub key: Bytes,
    /// Encoded value.
    pub value: Bytes,
}

fn current(cursor: &dyn Cursor) -> Option<RawEntry> {
    match (cursor.key(), cursor.value()) {
        (Some(key), Some(value)) => Some(RawEntry {
            key: Bytes::copy_from_slice(key),
            value: Bytes::copy_from_slice(value),
        }),
        _ => None,
    }
}

/// Exclusive upper bound of every key starting with `prefix`.
///
/// The codec never emits `0xFF` right after a complete prefix, so
/// `prefix ++ 0xFF` sorts after every extension of it.
#[must_use]
pub fn upper_bound(prefix: &[u8]) -> Vec<u8> {
    let mut bound = Vec::with_capacity(prefix.len() + 1);
    bound.extend_from_slice(prefix);
    bound.push(0xFF);
    bound
}

/// Returns the entry with the smallest key.
///
/// # Errors
///
/// Returns [`StoreError::EmptyStore`] if the space is empty.
pub fn top(engine: &dyn OrderedEngine, space: Space) -> StoreResult<RawEntry> {
    let mut cursor = engine.cursor(space)?;
    cursor.seek_to_first()?;
    current(cursor.as_ref()).ok_or(StoreError::EmptyStore)
}

/// Returns the entry with the largest key.
///
/// # Errors
///
/// Returns [`StoreError::EmptyStore`] if the space is empty.
pub fn bot(engine: &dyn OrderedEngine, space: Space) -> StoreResult<RawEntry> {
    let mut cursor = engine.cursor(space)?;
    cursor.seek_to_last()?;
    current(cursor.as_ref()).ok_or(StoreError::EmptyStore)
}

/// Returns the entry with the smallest key strictly greater than `key`.
///
/// `key` itself need not exist.
///
/// # Errors
///
/// Returns [`StoreError::NoSuccessor`] if no such entry exists.
pub fn next(engine: &dyn OrderedEngine, space: Space, key: &[u8]) -> StoreResult<RawEntry> {
    let mut cursor = engine.cursor(space)?;
    cursor.seek(key)?;
    if cursor.key() == Some(key) {
        cursor.next()?;
    }
    current(cursor.as_ref()).ok_or(StoreError::NoSuccessor)
}

/// Returns the entry with the largest key strictly less than `key`.
///
/// `key` itself need not exist.
///
/// # Errors
///
/// Returns [`StoreError::NoPredecessor`] if no such entry exists.
pub fn prev(engine: &dyn OrderedEngine, space: Space, key: &[u8]) -> StoreResult<RawEntry> {
    let mut cursor = engine.cursor(space)?;
    cursor.seek(key)?;
    if cursor.valid() {
        cursor.prev()?;
    } else {
        cursor.seek_to_last()?;
    }
    current(cursor.as_ref()).ok_or(StoreError::NoPredecessor)
}

/// Returns up to `n` entries with keys `>= start`, in ascending order.
///
/// # Errors
///
/// Returns an error if the engine fails.
pub fn take(
    engine: &dyn OrderedEngine,
    space: Space,
    start: &[u8],
    n: usize,
) -> StoreResult<Vec<RawEntry>> {
    let mut entries = Vec::new();
    if n == 0 {
        return Ok(entries);
    }

    let mut cursor = engine.cursor(space)?;
    cursor.seek(start)?;
    while entries.len() < n {
        let Some(entry) = current(cursor.as_ref()) else {
            break;
        };
        entries.push(entry);
        cursor.next()?;
    }
    Ok(entries)
}

/// Returns every entry whose key starts with `prefix`, in ascending order.
///
/// # Errors
///
/// Returns an error if the engine fails.
pub fn scan_prefix(
    engine: &dyn OrderedEngine,
    space: Space,
    prefix: &[u8],
) -> StoreResult<Vec<RawEntry>> {
    let mut cursor = engine.cursor(space)?;
    cursor.seek(prefix)?;
    collect_prefix(cursor.as_mut(), prefix)
}

/// Returns every entry of `space`, in ascending order.
///
/// # Errors
///
/// Returns an error if the engine fails.
pub fn scan(engine: &dyn OrderedEngine, space: Space) -> StoreResult<Vec<RawEntry>> {
    let mut cursor = engine.cursor(space)?;
    cursor.seek_to_first()?;
    collect_prefix(cursor.as_mut(), &[])
}

fn collect_prefix(cursor: &mut dyn Cursor, prefix: &[u8]) -> StoreResult<Vec<RawEntry>> {
    let mut entries = Vec::new();
    while let Some(entry) = current(cursor) {
        if !entry.key.starts_with(prefix) {
            break;
        }
        entries.push(entry);
        cursor.next()?;
    }
    Ok(entries)
}

/// Counts the entries of `space`.
///
/// Uses the engine's own count when it keeps one, else walks the space.
///
/// # Errors
///
/// Returns an error if the engine fails.
pub fn count(engine: &dyn OrderedEngine, space: Space) -> StoreResult<u64> {
    if let Some(n) = engine.key_count(space)? {
        return Ok(n);
    }

    let mut cursor = engine.cursor(space)?;
    cursor.seek_to_first()?;
    let mut n = 0u64;
    while cursor.valid() {
        n += 1;
        cursor.next()?;
    }
    Ok(n)
}

/// Deletes up to `n` entries with keys `>= start` in one atomic batch.
///
/// Returns how many entries were deleted.
///
/// # Errors
///
/// Returns an error if the engine fails; nothing is deleted then.
pub fn drop(
    engine: &dyn OrderedEngine,
    space: Space,
    start: &[u8],
    n: usize,
) -> StoreResult<usize> {
    let mut batch = Batch::new(engine);
    let removed = drop_into(&mut batch, space, start, n)?.len();
    batch.commit()?;
    debug!(%space, removed, "dropped entries");
    Ok(removed)
}

/// Stages deletes for up to `n` entries with keys `>= start`.
///
/// Returns the visited entries so callers can stage related changes in
/// the same batch.
///
/// # Errors
///
/// Returns an error if the engine fails.
pub fn drop_into(
    batch: &mut Batch<'_>,
    space: Space,
    start: &[u8],
    n: usize,
) -> StoreResult<Vec<RawEntry>> {
    let entries = take(batch.engine(), space, start, n)?;
    for entry in &entries {
        batch.delete(space, entry.key.clone());
    }
    Ok(entries)
}

/// Deletes every entry whose key starts with `prefix` in one atomic batch.
///
/// Returns how many entries were deleted.
///
/// # Errors
///
/// Returns an error if the engine fails; nothing is deleted then.
pub fn cut(engine: &dyn OrderedEngine, space: Space, prefix: &[u8]) -> StoreResult<usize> {
    let mut batch = Batch::new(engine);
    let removed = cut_into(&mut batch, space, prefix)?.len();
    batch.commit()?;
    debug!(%space, removed, "cut prefix");
    Ok(removed)
}

/// Stages deletes for every entry whose key starts with `prefix`.
///
/// # Errors
///
/// Returns an error if the engine fails.
pub fn cut_into(batch: &mut Batch<'_>, space: Space, prefix: &[u8]) -> StoreResult<Vec<RawEntry>> {
    let entries = scan_prefix(batch.engine(), space, prefix)?;
    for entry in &entries {
        batch.delete(space, entry.key.clone());
    }
    Ok(entries)
}
