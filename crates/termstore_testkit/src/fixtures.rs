//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tempfile::TempDir;
use termstore_core::{
    EngineConfig, LogEngine, MemoryEngine, OrderedEngine, RecordStore, StoreConfig,
};
use tracing_subscriber::EnvFilter;

/// A record store over a type-erased engine.
pub type DynStore = RecordStore<Arc<dyn OrderedEngine>>;

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: DynStore,
    journal: Option<PathBuf>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self::memory_with(StoreConfig::default())
    }

    /// Creates a new in-memory test store with the given config.
    pub fn memory_with(config: StoreConfig) -> Self {
        let engine: Arc<dyn OrderedEngine> = Arc::new(MemoryEngine::new());
        Self {
            store: RecordStore::new(engine, config),
            journal: None,
            _temp_dir: None,
        }
    }

    /// Creates a new journaled test store in a temporary directory.
    pub fn file() -> Self {
        Self::file_with(StoreConfig::default())
    }

    /// Creates a new journaled test store with the given config.
    pub fn file_with(config: StoreConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let journal = temp_dir.path().join("store.journal");
        let store = open_journaled(&journal, config);

        Self {
            store,
            journal: Some(journal),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the journal path if file-based, None if in-memory.
    pub fn journal_path(&self) -> Option<&Path> {
        self.journal.as_deref()
    }

    /// Closes the store and opens it again from its journal.
    ///
    /// An in-memory store has nothing to replay and is returned as is.
    #[must_use]
    pub fn reopen(self) -> Self {
        let Self {
            store,
            journal,
            _temp_dir,
        } = self;
        let Some(path) = journal else {
            return Self {
                store,
                journal: None,
                _temp_dir,
            };
        };

        let config = store.config().clone();
        drop(store);
        Self {
            store: open_journaled(&path, config),
            journal: Some(path),
            _temp_dir,
        }
    }
}

fn open_journaled(path: &Path, config: StoreConfig) -> DynStore {
    let engine =
        LogEngine::open_path(path, EngineConfig::default()).expect("Failed to open journal");
    let engine: Arc<dyn OrderedEngine> = Arc::new(engine);
    RecordStore::new(engine, config)
}

impl std::ops::Deref for TestStore {
    type Target = DynStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&DynStore) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store.store)
}

/// Runs a test with a temporary journaled store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&DynStore, &Path) -> R,
{
    let test_store = TestStore::file();
    let path = test_store
        .journal_path()
        .expect("File store should have a journal")
        .to_path_buf();
    f(&test_store.store, &path)
}

/// Installs a tracing subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`; defaults to `warn`. Safe to call from every test.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use termstore_core::Term;

    /// Creates a store holding `Integer(i) => {item, i}` for `i` in `0..count`.
    pub fn populated_store(count: i64) -> TestStore {
        let test_store = TestStore::memory();
        for i in 0..count {
            let value = Term::tuple([Term::atom("item"), Term::Integer(i)]);
            test_store
                .put(&Term::Integer(i), &value)
                .expect("Failed to populate store");
        }
        test_store
    }

    /// Creates a store with `per_feed` records under each of `feeds` feeds.
    ///
    /// Keys are `{feedN, Seq}` tuples, so each feed is a tuple prefix.
    pub fn feed_store(feeds: usize, per_feed: i64) -> TestStore {
        let test_store = TestStore::memory();
        for feed in 0..feeds {
            for seq in 0..per_feed {
                let key = Term::tuple([Term::atom(format!("feed{feed}")), Term::Integer(seq)]);
                test_store
                    .put(&key, &Term::Integer(seq))
                    .expect("Failed to populate store");
            }
        }
        test_store
    }
}

#[cfg(test)]
mod tests {
    use super::scenarios::*;
    use super::*;
    use termstore_core::Term;

    #[test]
    fn memory_store_works() {
        let store = TestStore::memory();
        assert!(store.journal_path().is_none());
        store.put(&Term::from("a"), &Term::Integer(1)).unwrap();
        assert_eq!(store.get(&Term::from("a")).unwrap(), Term::Integer(1));
    }

    #[test]
    fn file_store_survives_reopen() {
        init_test_tracing();
        let store = TestStore::file();
        assert!(store.journal_path().is_some());
        store.put(&Term::from("a"), &Term::Integer(1)).unwrap();
        store.seq().unwrap();

        let store = store.reopen();
        assert_eq!(store.get(&Term::from("a")).unwrap(), Term::Integer(1));
        assert_eq!(store.seq().unwrap(), Term::Integer(2));
    }

    #[test]
    fn reopen_keeps_config() {
        let config = StoreConfig::new().index_field(Term::atom("k"));
        let store = TestStore::file_with(config).reopen();
        assert!(store.index(&Term::atom("k"), &Term::Integer(1)).is_ok());
    }

    #[test]
    fn with_file_store_exposes_journal() {
        with_file_store(|store, path| {
            store.put(&Term::Integer(1), &Term::Integer(1)).unwrap();
            store.flush().unwrap();
            assert!(path.exists());
        });
    }

    #[test]
    fn scenarios_populate() {
        assert_eq!(populated_store(5).count().unwrap(), 5);

        let feeds = feed_store(3, 4);
        assert_eq!(feeds.count().unwrap(), 12);
        let feed1 = feeds
            .feed(&Term::tuple([Term::atom("feed1")]))
            .unwrap();
        assert_eq!(feed1.len(), 4);
    }
}
