//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use termstore_core::{
    EngineConfig, LogEngine, MemoryEngine, OrderedEngine, RecordStore, StoreConfig, Term,
};
use termstore_storage::InMemoryBackend;

/// Generate random bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// A record with a binary payload of `payload_size` bytes and a
/// `group` field taking one of `groups` values.
pub fn record(id: i64, payload_size: usize, groups: i64) -> Term {
    Term::map([
        (Term::atom("group"), Term::Integer(id % groups.max(1))),
        (Term::atom("id"), Term::Integer(id)),
        (Term::atom("payload"), Term::binary(random_data(payload_size))),
    ])
}

/// A `{feed, n}` key.
pub fn feed_key(feed: &str, n: i64) -> Term {
    Term::tuple([Term::atom(feed), Term::Integer(n)])
}

/// Generate `count` records keyed by integers in shuffled order.
pub fn generate_records(count: usize, payload_size: usize) -> Vec<(Term, Term)> {
    let mut ids: Vec<i64> = (0..count as i64).collect();
    ids.shuffle(&mut rand::thread_rng());
    ids.into_iter()
        .map(|id| (Term::Integer(id), record(id, payload_size, 16)))
        .collect()
}

/// The engines a benchmark runs against.
#[derive(Debug, Clone, Copy)]
pub enum EngineKind {
    /// Sorted state only.
    Memory,
    /// Journaled to an in-memory byte log.
    Journaled,
}

impl EngineKind {
    /// Both engines.
    pub const ALL: [EngineKind; 2] = [EngineKind::Memory, EngineKind::Journaled];

    /// Benchmark label.
    pub fn name(self) -> &'static str {
        match self {
            EngineKind::Memory => "memory",
            EngineKind::Journaled => "journal",
        }
    }

    /// Opens a fresh store on this engine.
    pub fn open(self, config: StoreConfig) -> RecordStore<Arc<dyn OrderedEngine>> {
        let engine: Arc<dyn OrderedEngine> = match self {
            EngineKind::Memory => Arc::new(MemoryEngine::new()),
            EngineKind::Journaled => {
                let config = EngineConfig::new().sync_on_commit(false);
                match LogEngine::open(Box::new(InMemoryBackend::new()), config) {
                    Ok(engine) => Arc::new(engine),
                    Err(err) => panic!("opening an empty in-memory journal failed: {err}"),
                }
            }
        };
        RecordStore::new(engine, config)
    }
}

/// Opens a store on `kind` holding `records`.
pub fn populated(
    kind: EngineKind,
    config: StoreConfig,
    records: &[(Term, Term)],
) -> RecordStore<Arc<dyn OrderedEngine>> {
    let store = kind.open(config);
    for (key, value) in records {
        if let Err(err) = store.put(key, value) {
            panic!("populating benchmark store failed: {err}");
        }
    }
    store
}
