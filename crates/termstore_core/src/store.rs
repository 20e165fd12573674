//! Record store facade.

use crate::config::StoreConfig;
use crate::engine::{Batch, OrderedEngine, Space};
use crate::error::{StoreError, StoreResult};
use crate::index::{self, IndexSpec};
use crate::range::{self, RawEntry};
use bytes::Bytes;
use termstore_codec::{decode, encode, encode_prefix, CodecError, Term};
use tracing::{debug, warn};

/// Name of the atom under which the sequence counter is stored.
const SEQ_COUNTER: &str = "seq";

/// A record store over an ordered engine.
///
/// Keys and values are [`Term`]s, stored under their order-preserving
/// encodings, so every range operation follows term order. The store holds
/// its engine explicitly; any number of stores can coexist in a process.
///
/// Records live in [`Space::Records`]. Secondary index entries and the
/// sequence counter live in their own spaces and are never visible to
/// range operations, [`RecordStore::count`] or [`RecordStore::dir`].
///
/// # Example
///
/// ```
/// use termstore_core::{MemoryEngine, RecordStore, StoreConfig, Term};
///
/// let store = RecordStore::new(MemoryEngine::new(), StoreConfig::default());
/// store.put(&Term::from("a"), &Term::Integer(1)).unwrap();
/// store.put(&Term::from("b"), &Term::Integer(2)).unwrap();
///
/// let (key, value) = store.top().unwrap();
/// assert_eq!(key, Term::from("a"));
/// assert_eq!(value, Term::Integer(1));
/// ```
#[derive(Debug)]
pub struct RecordStore<E> {
    engine: E,
    config: StoreConfig,
    indexes: IndexSpec,
}

impl<E: OrderedEngine> RecordStore<E> {
    /// Creates a store over `engine`.
    pub fn new(engine: E, config: StoreConfig) -> Self {
        let indexes = IndexSpec::new(&config.index_fields);
        Self {
            engine,
            config,
            indexes,
        }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Consumes the store and returns its engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Stores `value` at `key`, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encode`] if either term cannot be encoded, or
    /// an engine error.
    pub fn put(&self, key: &Term, value: &Term) -> StoreResult<()> {
        let k = Bytes::from(encode_term(key)?);
        let v = Bytes::from(encode_term(value)?);
        if self.indexes.is_empty() {
            self.engine.put(Space::Records, &k, &v)?;
            return Ok(());
        }

        let entries = self.indexes.entry_keys(key, value)?;
        self.retrying(|| {
            let old = self.engine.get(Space::Records, &k)?;
            let mut batch = Batch::new(&self.engine);
            batch.expect_value(Space::Records, k.clone(), old.clone());
            if let Some(old) = &old {
                self.stage_unindex(&mut batch, key, old)?;
            }
            for entry in &entries {
                batch.put(Space::Index, entry.clone(), Bytes::new());
            }
            batch.put(Space::Records, k.clone(), v.clone());
            Ok(batch.commit()?)
        })
    }

    /// Reads the value stored at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no record exists.
    pub fn get(&self, key: &Term) -> StoreResult<Term> {
        let k = encode_term(key)?;
        let bytes = self
            .engine
            .get(Space::Records, &k)?
            .ok_or(StoreError::NotFound)?;
        decode_term(&bytes)
    }

    /// Whether a record exists at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be encoded or the engine fails.
    pub fn exists(&self, key: &Term) -> StoreResult<bool> {
        let k = encode_term(key)?;
        Ok(self.engine.get(Space::Records, &k)?.is_some())
    }

    /// Removes the record at `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be encoded or the engine fails.
    pub fn delete(&self, key: &Term) -> StoreResult<()> {
        let k = Bytes::from(encode_term(key)?);
        if self.indexes.is_empty() {
            self.engine.delete(Space::Records, &k)?;
            return Ok(());
        }

        self.retrying(|| {
            let Some(old) = self.engine.get(Space::Records, &k)? else {
                return Ok(());
            };
            let mut batch = Batch::new(&self.engine);
            batch.expect_value(Space::Records, k.clone(), Some(old.clone()));
            self.stage_unindex(&mut batch, key, &old)?;
            batch.delete(Space::Records, k.clone());
            Ok(batch.commit()?)
        })
    }

    /// Inserts `value` at `candidate` unless a record already exists there.
    ///
    /// Returns the key of the stored record, which is `candidate` either
    /// way. The existence check and the insert are one conditional write,
    /// so concurrent appends to the same key store exactly one value.
    ///
    /// # Errors
    ///
    /// Returns an error if a term cannot be encoded or the engine fails.
    pub fn append(&self, candidate: &Term, value: &Term) -> StoreResult<Term> {
        let k = Bytes::from(encode_term(candidate)?);
        let v = encode_term(value)?;

        let mut batch = Batch::new(&self.engine);
        batch.expect_absent(Space::Records, k.clone());
        for entry in self.indexes.entry_keys(candidate, value)? {
            batch.put(Space::Index, entry, Bytes::new());
        }
        batch.put(Space::Records, k, v);

        match batch.commit() {
            Ok(()) => debug!(key = %candidate, "appended record"),
            Err(err) if err.is_condition_failed() => {
                debug!(key = %candidate, "record already present, append skipped");
            }
            Err(err) => return Err(err.into()),
        }
        Ok(candidate.clone())
    }

    /// Number of records.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    pub fn count(&self) -> StoreResult<u64> {
        range::count(&self.engine, Space::Records)
    }

    /// All keys in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Decode`] if a stored key is corrupted, or an
    /// engine error.
    pub fn dir(&self) -> StoreResult<Vec<Term>> {
        range::scan(&self.engine, Space::Records)?
            .iter()
            .map(|entry| decode_term(&entry.key))
            .collect()
    }

    /// The record with the smallest key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyStore`] if there are no records.
    pub fn top(&self) -> StoreResult<(Term, Term)> {
        decode_entry(&range::top(&self.engine, Space::Records)?)
    }

    /// The record with the largest key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyStore`] if there are no records.
    pub fn bot(&self) -> StoreResult<(Term, Term)> {
        decode_entry(&range::bot(&self.engine, Space::Records)?)
    }

    /// The record with the smallest key greater than `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoSuccessor`] if `key` sorts at or after the
    /// last record.
    pub fn next(&self, key: &Term) -> StoreResult<(Term, Term)> {
        let k = encode_term(key)?;
        decode_entry(&range::next(&self.engine, Space::Records, &k)?)
    }

    /// The record with the largest key less than `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoPredecessor`] if `key` sorts at or before the
    /// first record.
    pub fn prev(&self, key: &Term) -> StoreResult<(Term, Term)> {
        let k = encode_term(key)?;
        decode_entry(&range::prev(&self.engine, Space::Records, &k)?)
    }

    /// Up to `n` records with keys `>= start`, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Decode`] if a stored record is corrupted.
    pub fn take(&self, start: &Term, n: usize) -> StoreResult<Vec<(Term, Term)>> {
        let start = encode_term(start)?;
        range::take(&self.engine, Space::Records, &start, n)?
            .iter()
            .map(decode_entry)
            .collect()
    }

    /// Deletes the records [`RecordStore::take`] would return, atomically.
    ///
    /// Returns how many records were deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails; nothing is deleted then.
    pub fn drop(&self, start: &Term, n: usize) -> StoreResult<usize> {
        let start = encode_term(start)?;
        if self.indexes.is_empty() {
            return range::drop(&self.engine, Space::Records, &start, n);
        }

        self.retrying(|| {
            let mut batch = Batch::new(&self.engine);
            let visited = range::drop_into(&mut batch, Space::Records, &start, n)?;
            self.guard_and_unindex(&mut batch, &visited)?;
            batch.commit()?;
            debug!(removed = visited.len(), "dropped indexed records");
            Ok(visited.len())
        })
    }

    /// Deletes every record whose key has `prefix` as a term prefix.
    ///
    /// A binary prefix matches longer binaries (`"a"` cuts `"a1"`); a tuple
    /// prefix matches longer tuples (`{feed}` cuts `{feed, 7}`). Returns how
    /// many records were deleted; cutting an unused prefix deletes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encode`] if the prefix cannot be encoded, or an
    /// engine error.
    pub fn cut(&self, prefix: &Term) -> StoreResult<usize> {
        let prefix = encode_prefix(prefix).map_err(StoreError::Encode)?;
        if self.indexes.is_empty() {
            return range::cut(&self.engine, Space::Records, &prefix);
        }

        self.retrying(|| {
            let mut batch = Batch::new(&self.engine);
            let visited = range::cut_into(&mut batch, Space::Records, &prefix)?;
            self.guard_and_unindex(&mut batch, &visited)?;
            batch.commit()?;
            debug!(removed = visited.len(), "cut indexed records");
            Ok(visited.len())
        })
    }

    /// Every record whose key has `prefix` as a term prefix, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Decode`] if a stored record is corrupted.
    pub fn feed(&self, prefix: &Term) -> StoreResult<Vec<(Term, Term)>> {
        let prefix = encode_prefix(prefix).map_err(StoreError::Encode)?;
        range::scan_prefix(&self.engine, Space::Records, &prefix)?
            .iter()
            .map(decode_entry)
            .collect()
    }

    /// Keys of the records whose `field` equals `value`, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unsupported`] if `field` is not configured in
    /// [`StoreConfig::index_fields`].
    pub fn index(&self, field: &Term, value: &Term) -> StoreResult<Vec<Term>> {
        if !self.indexes.covers(field) {
            return Err(StoreError::unsupported(format!(
                "index lookup on unindexed field {field}"
            )));
        }

        let prefix = index::lookup_prefix(field, value)?;
        range::scan_prefix(&self.engine, Space::Index, &prefix)?
            .iter()
            .map(|entry| index::primary_key(&entry.key))
            .collect()
    }

    /// Next value of the store's sequence counter.
    ///
    /// The first call returns `Integer(1)`; every later call returns a
    /// strictly larger integer, also across reopen of a persistent engine.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Contention`] if the counter keeps changing
    /// under concurrent callers, [`StoreError::SequenceExhausted`] once it
    /// reaches `i64::MAX`, or an engine error.
    pub fn seq(&self) -> StoreResult<Term> {
        let key = Bytes::from(encode_term(&Term::atom(SEQ_COUNTER))?);
        self.retrying(|| {
            let current = self.engine.get(Space::Meta, &key)?;
            let last = match &current {
                Some(bytes) => decode_term(bytes)?.as_integer().ok_or_else(|| {
                    StoreError::Decode(CodecError::non_canonical(
                        "sequence counter is not an integer",
                    ))
                })?,
                None => 0,
            };
            let next = last
                .checked_add(1)
                .ok_or(StoreError::SequenceExhausted { last })?;

            let mut batch = Batch::new(&self.engine);
            batch.expect_value(Space::Meta, key.clone(), current);
            batch.put(Space::Meta, key.clone(), encode_term(&Term::Integer(next))?);
            batch.commit()?;
            Ok(Term::Integer(next))
        })
    }

    /// Makes every committed write durable.
    ///
    /// # Errors
    ///
    /// Returns an engine error.
    pub fn flush(&self) -> StoreResult<()> {
        Ok(self.engine.flush()?)
    }

    /// Runs a read-modify-write, retrying when a precondition loses a race.
    fn retrying<T>(&self, mut attempt: impl FnMut() -> StoreResult<T>) -> StoreResult<T> {
        let attempts = self.config.max_write_retries.saturating_add(1);
        for n in 1..=attempts {
            match attempt() {
                Err(StoreError::Engine(err)) if err.is_condition_failed() => {
                    debug!(attempt = n, "write conflict, retrying");
                }
                result => return result,
            }
        }
        Err(StoreError::Contention { attempts })
    }

    /// Stages deletion of the index entries of a stored record.
    ///
    /// A stored value that no longer decodes cannot name its entries, so
    /// every entry pointing at `primary` is swept instead.
    fn stage_unindex(&self, batch: &mut Batch<'_>, primary: &Term, stored: &[u8]) -> StoreResult<()> {
        match decode(stored) {
            Ok(old) => {
                for entry in self.indexes.entry_keys(primary, &old)? {
                    batch.delete(Space::Index, entry);
                }
            }
            Err(err) => {
                warn!(key = %primary, error = %err, "stored record does not decode, sweeping its index entries");
                for entry in self.entries_pointing_at(primary)? {
                    batch.delete(Space::Index, entry.key);
                }
            }
        }
        Ok(())
    }

    /// Index entries of any configured field whose primary key is `primary`.
    fn entries_pointing_at(&self, primary: &Term) -> StoreResult<Vec<RawEntry>> {
        let mut found = Vec::new();
        for field in self.indexes.fields() {
            let prefix = encode_prefix(&Term::tuple([field.clone()])).map_err(StoreError::Encode)?;
            for entry in range::scan_prefix(&self.engine, Space::Index, &prefix)? {
                if index::primary_key(&entry.key).ok().as_ref() == Some(primary) {
                    found.push(entry);
                }
            }
        }
        Ok(found)
    }

    /// Pins visited records to what was read and stages their unindexing.
    fn guard_and_unindex(&self, batch: &mut Batch<'_>, visited: &[RawEntry]) -> StoreResult<()> {
        for entry in visited {
            batch.expect_value(Space::Records, entry.key.clone(), Some(entry.value.clone()));
            match decode(&entry.key) {
                Ok(primary) => self.stage_unindex(batch, &primary, &entry.value)?,
                Err(err) => {
                    warn!(error = %err, "stored key does not decode, its index entries are kept");
                }
            }
        }
        Ok(())
    }
}

fn encode_term(term: &Term) -> StoreResult<Vec<u8>> {
    encode(term).map_err(StoreError::Encode)
}

fn decode_term(bytes: &[u8]) -> StoreResult<Term> {
    decode(bytes).map_err(StoreError::Decode)
}

fn decode_entry(entry: &RawEntry) -> StoreResult<(Term, Term)> {
    Ok((decode_term(&entry.key)?, decode_term(&entry.value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::{LogEngine, MemoryEngine};
    use crate::error::EngineError;
    use std::sync::Arc;
    use std::thread;
    use termstore_storage::InMemoryBackend;

    fn store() -> RecordStore<MemoryEngine> {
        RecordStore::new(MemoryEngine::new(), StoreConfig::default())
    }

    fn indexed_store() -> RecordStore<MemoryEngine> {
        let config = StoreConfig::new()
            .index_field(Term::atom("role"))
            .index_field(2i64);
        RecordStore::new(MemoryEngine::new(), config)
    }

    fn bin(s: &str) -> Term {
        Term::from(s)
    }

    fn abc() -> RecordStore<MemoryEngine> {
        let store = store();
        store.put(&bin("a"), &Term::Integer(1)).unwrap();
        store.put(&bin("b"), &Term::Integer(2)).unwrap();
        store.put(&bin("c"), &Term::Integer(3)).unwrap();
        store
    }

    fn user(role: &str) -> Term {
        Term::map([
            (Term::atom("name"), bin("someone")),
            (Term::atom("role"), Term::atom(role)),
        ])
    }

    #[test]
    fn navigation_over_three_records() {
        let store = abc();
        assert_eq!(store.top().unwrap(), (bin("a"), Term::Integer(1)));
        assert_eq!(store.bot().unwrap(), (bin("c"), Term::Integer(3)));
        assert_eq!(store.next(&bin("a")).unwrap(), (bin("b"), Term::Integer(2)));
        assert_eq!(store.prev(&bin("c")).unwrap(), (bin("b"), Term::Integer(2)));
    }

    #[test]
    fn append_keeps_first_value() {
        let store = store();
        assert_eq!(store.append(&bin("a"), &bin("v1")).unwrap(), bin("a"));
        assert_eq!(store.append(&bin("a"), &bin("v2")).unwrap(), bin("a"));
        assert_eq!(store.get(&bin("a")).unwrap(), bin("v1"));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn cut_removes_prefixed_keys_only() {
        let store = store();
        for key in ["a1", "a2", "b1"] {
            store.put(&bin(key), &Term::Integer(0)).unwrap();
        }
        assert_eq!(store.cut(&bin("a")).unwrap(), 2);
        assert_eq!(store.dir().unwrap(), vec![bin("b1")]);
    }

    #[test]
    fn take_is_ordered_and_bounded() {
        let store = abc();
        assert_eq!(
            store.take(&bin("a"), 2).unwrap(),
            vec![(bin("a"), Term::Integer(1)), (bin("b"), Term::Integer(2))]
        );
        assert!(store.take(&bin("a"), 0).unwrap().is_empty());
        assert_eq!(store.take(&bin("bb"), 10).unwrap().len(), 1);
    }

    #[test]
    fn empty_store_boundaries() {
        let store = store();
        assert!(matches!(store.top(), Err(StoreError::EmptyStore)));
        assert!(matches!(store.bot(), Err(StoreError::EmptyStore)));
        assert!(matches!(store.next(&bin("x")), Err(StoreError::NoSuccessor)));
        assert!(matches!(store.prev(&bin("x")), Err(StoreError::NoPredecessor)));
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.dir().unwrap().is_empty());
    }

    #[test]
    fn drop_leaves_the_rest() {
        let store = abc();
        assert_eq!(store.drop(&bin("a"), 2).unwrap(), 2);
        assert_eq!(store.dir().unwrap(), vec![bin("c")]);
    }

    #[test]
    fn next_and_prev_at_the_edges() {
        let store = abc();
        assert!(matches!(store.next(&bin("c")), Err(StoreError::NoSuccessor)));
        assert!(matches!(store.prev(&bin("a")), Err(StoreError::NoPredecessor)));
        assert_eq!(store.next(&bin("")).unwrap().0, bin("a"));
        assert_eq!(store.prev(&bin("zzz")).unwrap().0, bin("c"));
    }

    #[test]
    fn get_put_delete() {
        let store = store();
        let key = Term::tuple([Term::atom("user"), Term::Integer(1)]);
        assert!(matches!(store.get(&key), Err(StoreError::NotFound)));
        assert!(!store.exists(&key).unwrap());

        store.put(&key, &bin("ann")).unwrap();
        store.put(&key, &bin("bob")).unwrap();
        assert_eq!(store.get(&key).unwrap(), bin("bob"));
        assert!(store.exists(&key).unwrap());

        store.delete(&key).unwrap();
        store.delete(&key).unwrap();
        assert!(matches!(store.get(&key), Err(StoreError::NotFound)));
    }

    #[test]
    fn unencodable_terms_are_encode_errors() {
        let store = store();
        assert!(matches!(
            store.put(&Term::Float(f64::NAN), &Term::Integer(1)),
            Err(StoreError::Encode(_))
        ));
        assert!(matches!(
            store.put(&bin("k"), &Term::Float(f64::NAN)),
            Err(StoreError::Encode(_))
        ));
        assert!(matches!(
            store.cut(&Term::atom("x".repeat(300))),
            Err(StoreError::Encode(_))
        ));
    }

    #[test]
    fn corrupted_value_is_a_decode_error() {
        let store = store();
        let key = encode(&bin("k")).unwrap();
        store
            .engine()
            .put(Space::Records, &key, &[0x99, 0x00])
            .unwrap();
        assert!(matches!(store.get(&bin("k")), Err(StoreError::Decode(_))));
        assert!(matches!(store.top(), Err(StoreError::Decode(_))));
    }

    #[test]
    fn dir_follows_term_order() {
        let store = store();
        let keys = [
            bin("b"),
            Term::Integer(-5),
            Term::tuple([Term::atom("feed"), Term::Integer(2)]),
            Term::atom("zeta"),
            Term::Integer(10),
            Term::Float(-0.5),
        ];
        for key in &keys {
            store.put(key, &Term::Integer(0)).unwrap();
        }

        let mut expected = keys.to_vec();
        expected.sort();
        assert_eq!(store.dir().unwrap(), expected);
    }

    #[test]
    fn feed_selects_by_tuple_prefix() {
        let store = store();
        for (feed, n) in [("f1", 1), ("f1", 2), ("f2", 1), ("f10", 1)] {
            let key = Term::tuple([Term::atom(feed), Term::Integer(n)]);
            store.put(&key, &Term::Integer(n)).unwrap();
        }

        let feed = store.feed(&Term::tuple([Term::atom("f1")])).unwrap();
        let keys: Vec<_> = feed.into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                Term::tuple([Term::atom("f1"), Term::Integer(1)]),
                Term::tuple([Term::atom("f1"), Term::Integer(2)]),
            ]
        );

        assert_eq!(store.cut(&Term::tuple([Term::atom("f1")])).unwrap(), 2);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn unindexed_field_is_unsupported() {
        let store = store();
        assert!(matches!(
            store.index(&Term::atom("role"), &Term::atom("admin")),
            Err(StoreError::Unsupported { .. })
        ));
    }

    #[test]
    fn index_tracks_put_and_delete() {
        let store = indexed_store();
        store.put(&Term::Integer(1), &user("admin")).unwrap();
        store.put(&Term::Integer(2), &user("guest")).unwrap();
        store.put(&Term::Integer(3), &user("admin")).unwrap();

        let role = Term::atom("role");
        assert_eq!(
            store.index(&role, &Term::atom("admin")).unwrap(),
            vec![Term::Integer(1), Term::Integer(3)]
        );

        store.put(&Term::Integer(1), &user("guest")).unwrap();
        assert_eq!(
            store.index(&role, &Term::atom("admin")).unwrap(),
            vec![Term::Integer(3)]
        );
        assert_eq!(
            store.index(&role, &Term::atom("guest")).unwrap(),
            vec![Term::Integer(1), Term::Integer(2)]
        );

        store.delete(&Term::Integer(2)).unwrap();
        assert_eq!(
            store.index(&role, &Term::atom("guest")).unwrap(),
            vec![Term::Integer(1)]
        );
        assert!(store.index(&role, &Term::atom("nobody")).unwrap().is_empty());
    }

    #[test]
    fn index_on_tuple_position() {
        let store = indexed_store();
        let record = |name: &str| Term::tuple([Term::atom("user"), bin(name)]);
        store.put(&Term::Integer(1), &record("ann")).unwrap();
        store.append(&Term::Integer(2), &record("bob")).unwrap();
        store.append(&Term::Integer(2), &record("ann")).unwrap();

        assert_eq!(
            store.index(&Term::Integer(2), &bin("ann")).unwrap(),
            vec![Term::Integer(1)]
        );
        assert_eq!(
            store.index(&Term::Integer(2), &bin("bob")).unwrap(),
            vec![Term::Integer(2)]
        );
    }

    #[test]
    fn drop_and_cut_clean_the_index() {
        let store = indexed_store();
        for n in 1..=4 {
            store.put(&Term::Integer(n), &user("admin")).unwrap();
        }
        let role = Term::atom("role");

        assert_eq!(store.drop(&Term::Integer(1), 2).unwrap(), 2);
        assert_eq!(
            store.index(&role, &Term::atom("admin")).unwrap(),
            vec![Term::Integer(3), Term::Integer(4)]
        );

        assert_eq!(store.cut(&Term::Integer(3)).unwrap(), 1);
        assert_eq!(
            store.index(&role, &Term::atom("admin")).unwrap(),
            vec![Term::Integer(4)]
        );
    }

    #[test]
    fn index_entries_stay_out_of_records() {
        let store = indexed_store();
        store.put(&Term::Integer(1), &user("admin")).unwrap();
        store.seq().unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.dir().unwrap(), vec![Term::Integer(1)]);
        assert_eq!(store.bot().unwrap().0, Term::Integer(1));
    }

    #[test]
    fn seq_counts_from_one() {
        let store = store();
        assert_eq!(store.seq().unwrap(), Term::Integer(1));
        assert_eq!(store.seq().unwrap(), Term::Integer(2));
        assert_eq!(store.seq().unwrap(), Term::Integer(3));
    }

    #[test]
    fn stores_do_not_share_state() {
        let first = store();
        let second = store();
        first.put(&bin("k"), &Term::Integer(1)).unwrap();
        first.seq().unwrap();

        assert!(matches!(second.get(&bin("k")), Err(StoreError::NotFound)));
        assert_eq!(second.seq().unwrap(), Term::Integer(1));
    }

    #[test]
    fn concurrent_appends_store_one_value() {
        let store = Arc::new(indexed_store());
        let key = bin("contended");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let key = key.clone();
                thread::spawn(move || {
                    let value = Term::tuple([Term::atom("v"), Term::Integer(i)]);
                    store.append(&key, &value).unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), key);
        }

        let indexed: usize = (0..8)
            .map(|i| store.index(&Term::Integer(2), &Term::Integer(i)).unwrap().len())
            .sum();
        assert_eq!(indexed, 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn concurrent_seq_is_unique() {
        let store = Arc::new(RecordStore::new(
            MemoryEngine::new(),
            StoreConfig::default().max_write_retries(10_000),
        ));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..50)
                        .map(|_| store.seq().unwrap().as_integer().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (1..=200).collect::<Vec<_>>());
    }

    /// An engine whose every conditional write loses.
    struct AlwaysConflicting(MemoryEngine);

    impl OrderedEngine for AlwaysConflicting {
        fn get(&self, space: Space, key: &[u8]) -> crate::EngineResult<Option<Bytes>> {
            self.0.get(space, key)
        }

        fn cursor(&self, space: Space) -> crate::EngineResult<Box<dyn crate::Cursor + '_>> {
            self.0.cursor(space)
        }

        fn write(&self, batch: crate::WriteBatch) -> crate::EngineResult<()> {
            if batch.conditions().is_empty() {
                self.0.write(batch)
            } else {
                Err(EngineError::ConditionFailed { space: Space::Meta })
            }
        }
    }

    #[test]
    fn contention_gives_up_after_retry_budget() {
        let store = RecordStore::new(
            AlwaysConflicting(MemoryEngine::new()),
            StoreConfig::default().max_write_retries(2),
        );
        assert!(matches!(
            store.seq(),
            Err(StoreError::Contention { attempts: 3 })
        ));
    }

    #[test]
    fn log_engine_keeps_records_index_and_seq() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.journal");
        let config = StoreConfig::new().index_field(Term::atom("role"));

        {
            let engine = LogEngine::open_path(&path, EngineConfig::default()).unwrap();
            let store = RecordStore::new(engine, config.clone());
            store.put(&Term::Integer(1), &user("admin")).unwrap();
            store.append(&Term::Integer(2), &user("admin")).unwrap();
            store.delete(&Term::Integer(1)).unwrap();
            store.seq().unwrap();
            store.seq().unwrap();
            store.flush().unwrap();
            store.into_engine().compact().unwrap();
        }

        let engine = LogEngine::open_path(&path, EngineConfig::default()).unwrap();
        let store = RecordStore::new(engine, config);
        assert_eq!(store.dir().unwrap(), vec![Term::Integer(2)]);
        assert_eq!(
            store
                .index(&Term::atom("role"), &Term::atom("admin"))
                .unwrap(),
            vec![Term::Integer(2)]
        );
        assert_eq!(store.seq().unwrap(), Term::Integer(3));
    }

    #[test]
    fn log_engine_over_memory_backend() {
        let engine =
            LogEngine::open(Box::new(InMemoryBackend::new()), EngineConfig::default()).unwrap();
        let store = RecordStore::new(engine, StoreConfig::default());
        store.append(&bin("a"), &Term::Integer(1)).unwrap();
        store.append(&bin("a"), &Term::Integer(2)).unwrap();
        assert_eq!(store.get(&bin("a")).unwrap(), Term::Integer(1));
        assert_eq!(store.count().unwrap(), 1);
    }

    fn corrupt(store: &RecordStore<MemoryEngine>, key: &Term) {
        let k = encode(key).unwrap();
        store.engine().put(Space::Records, &k, &[0x99, 0x00]).unwrap();
    }

    #[test]
    fn corrupted_records_can_be_removed() {
        let store = indexed_store();
        let role = Term::atom("role");
        for n in 1..=5 {
            store.put(&Term::Integer(n), &user("admin")).unwrap();
            corrupt(&store, &Term::Integer(n));
        }
        assert!(matches!(store.get(&Term::Integer(1)), Err(StoreError::Decode(_))));

        store.delete(&Term::Integer(1)).unwrap();
        assert!(!store.exists(&Term::Integer(1)).unwrap());

        store.put(&Term::Integer(2), &user("guest")).unwrap();
        assert_eq!(store.get(&Term::Integer(2)).unwrap(), user("guest"));

        assert_eq!(store.drop(&Term::Integer(3), 1).unwrap(), 1);
        assert_eq!(store.cut(&Term::Integer(4)).unwrap(), 1);
        assert!(!store.exists(&Term::Integer(3)).unwrap());
        assert!(!store.exists(&Term::Integer(4)).unwrap());

        assert_eq!(
            store.index(&role, &Term::atom("admin")).unwrap(),
            vec![Term::Integer(5)]
        );
        assert_eq!(
            store.index(&role, &Term::atom("guest")).unwrap(),
            vec![Term::Integer(2)]
        );
    }

    #[test]
    fn exhausted_sequence_is_reported() {
        let store = store();
        let key = encode(&Term::atom(SEQ_COUNTER)).unwrap();
        let last = encode(&Term::Integer(i64::MAX)).unwrap();
        store.engine().put(Space::Meta, &key, &last).unwrap();

        assert!(matches!(
            store.seq(),
            Err(StoreError::SequenceExhausted { last: i64::MAX })
        ));
    }
}
