//! Crash recovery testing for the journaled engine.
//!
//! Simulates a process dying in the middle of a journal write and checks
//! what a restarted process recovers from the surviving bytes.
//!
//! ## Test Strategy
//!
//! 1. **Crash during append** - a torn record at the tail is dropped
//! 2. **Crash inside a batch** - a batch survives whole or not at all
//! 3. **Crash during compaction** - the old journal stays intact
//! 4. **Failed sync** - the write is rolled back and the store keeps going
//!
//! ## Usage
//!
//! ```rust
//! use termstore_testkit::crash::CrashRecoveryHarness;
//!
//! let mut harness = CrashRecoveryHarness::new();
//! harness.run_all_tests();
//! assert!(harness.all_passed(), "{}", harness.summary());
//! ```

use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use termstore_core::{
    EngineConfig, EngineResult, LogEngine, RecordStore, StoreConfig, StoreError, StoreResult, Term,
};
use termstore_storage::{InMemoryBackend, StorageBackend, StorageError, StorageResult};

/// Result of a crash recovery test.
#[derive(Debug, Clone)]
pub struct CrashRecoveryResult {
    /// Whether the test passed.
    pub passed: bool,
    /// Description of what was tested.
    pub description: String,
    /// Expected records after recovery.
    pub expected_records: u64,
    /// Actual records after recovery.
    pub actual_records: u64,
    /// Any error message.
    pub error: Option<String>,
}

impl CrashRecoveryResult {
    /// Creates a passing result.
    pub fn pass(description: &str, records: u64) -> Self {
        Self {
            passed: true,
            description: description.to_string(),
            expected_records: records,
            actual_records: records,
            error: None,
        }
    }

    /// Creates a failing result.
    pub fn fail(description: &str, expected: u64, actual: u64, error: &str) -> Self {
        Self {
            passed: false,
            description: description.to_string(),
            expected_records: expected,
            actual_records: actual,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug)]
struct Shared {
    log: Mutex<InMemoryBackend>,
    budget: AtomicUsize,
    crashed: AtomicBool,
    fail_on_sync: AtomicBool,
}

/// A storage backend that can simulate a crash.
///
/// Clones share the same log and crash state, so a test can keep a handle
/// after giving the backend to an engine. Once crashed, every write fails;
/// the bytes that reached the log before the crash stay readable.
#[derive(Debug, Clone)]
pub struct CrashableBackend {
    shared: Arc<Shared>,
}

impl Default for CrashableBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrashableBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                log: Mutex::new(InMemoryBackend::new()),
                budget: AtomicUsize::new(usize::MAX),
                crashed: AtomicBool::new(false),
                fail_on_sync: AtomicBool::new(false),
            }),
        }
    }

    /// Crashes once `bytes` more bytes have been appended.
    ///
    /// The append that crosses the limit writes only the bytes that fit.
    pub fn crash_after(&self, bytes: usize) {
        self.shared.budget.store(bytes, Ordering::SeqCst);
    }

    /// Sets whether sync and flush should fail (without crashing).
    pub fn set_fail_on_sync(&self, fail: bool) {
        self.shared.fail_on_sync.store(fail, Ordering::SeqCst);
    }

    /// Resets the crash state. The log content is kept.
    pub fn reset(&self) {
        self.shared.budget.store(usize::MAX, Ordering::SeqCst);
        self.shared.crashed.store(false, Ordering::SeqCst);
        self.shared.fail_on_sync.store(false, Ordering::SeqCst);
    }

    /// Returns whether the backend has crashed.
    pub fn has_crashed(&self) -> bool {
        self.shared.crashed.load(Ordering::SeqCst)
    }

    /// Bytes that reached the log.
    pub fn bytes(&self) -> Vec<u8> {
        self.shared.log.lock().data()
    }

    fn armed(&self) -> bool {
        self.shared.budget.load(Ordering::SeqCst) != usize::MAX
    }

    fn check_alive(&self) -> StorageResult<()> {
        if self.has_crashed() {
            return Err(simulated("backend is down after a simulated crash"));
        }
        Ok(())
    }

    fn crash(&self, message: &str) -> StorageError {
        self.shared.crashed.store(true, Ordering::SeqCst);
        simulated(message)
    }

    fn check_sync(&self) -> StorageResult<()> {
        self.check_alive()?;
        if self.shared.fail_on_sync.load(Ordering::SeqCst) {
            return Err(simulated("simulated sync failure"));
        }
        Ok(())
    }
}

fn simulated(message: &str) -> StorageError {
    StorageError::Io(io::Error::new(io::ErrorKind::Other, message.to_string()))
}

impl StorageBackend for CrashableBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.shared.log.lock().read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        self.check_alive()?;
        let budget = self.shared.budget.load(Ordering::SeqCst);
        let mut log = self.shared.log.lock();

        if data.len() > budget {
            log.append(&data[..budget])?;
            return Err(self.crash("simulated crash during partial write"));
        }
        if budget != usize::MAX {
            self.shared.budget.store(budget - data.len(), Ordering::SeqCst);
        }
        log.append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.check_sync()?;
        self.shared.log.lock().flush()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.check_sync()?;
        self.shared.log.lock().sync()
    }

    fn size(&self) -> StorageResult<u64> {
        self.shared.log.lock().size()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.check_alive()?;
        self.shared.log.lock().truncate(new_size)
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        self.check_alive()?;
        if self.armed() {
            // Dies before the new content is swapped in.
            return Err(self.crash("simulated crash during replace"));
        }
        self.shared.log.lock().replace(data)
    }
}

/// Opens a store over a crashable backend.
///
/// # Errors
///
/// Returns an error if the journal cannot be replayed.
pub fn open_crashable(
    backend: &CrashableBackend,
    config: StoreConfig,
) -> EngineResult<RecordStore<LogEngine>> {
    let engine = LogEngine::open(Box::new(backend.clone()), EngineConfig::default())?;
    Ok(RecordStore::new(engine, config))
}

/// Opens a store over the bytes a crashed backend left behind, the way a
/// restarted process would.
///
/// # Errors
///
/// Returns an error if the surviving journal is corrupted.
pub fn recover(
    backend: &CrashableBackend,
    config: StoreConfig,
) -> EngineResult<RecordStore<LogEngine>> {
    let survivor = InMemoryBackend::with_data(backend.bytes());
    let engine = LogEngine::open(Box::new(survivor), EngineConfig::default())?;
    Ok(RecordStore::new(engine, config))
}

fn record(i: i64) -> Term {
    Term::map([
        (Term::atom("id"), Term::Integer(i)),
        (Term::atom("parity"), Term::atom(if i % 2 == 0 { "even" } else { "odd" })),
    ])
}

fn indexed() -> StoreConfig {
    StoreConfig::new().index_field(Term::atom("parity"))
}

/// Test harness for crash recovery scenarios.
#[derive(Debug, Default)]
pub struct CrashRecoveryHarness {
    /// Results of crash recovery tests.
    pub results: Vec<CrashRecoveryResult>,
}

impl CrashRecoveryHarness {
    /// Creates a new crash recovery harness.
    pub fn new() -> Self {
        Self::default()
    }

    fn run<F>(&mut self, description: &str, expected: u64, scenario: F) -> CrashRecoveryResult
    where
        F: FnOnce() -> StoreResult<Result<u64, (u64, String)>>,
    {
        let result = match scenario() {
            Ok(Ok(actual)) if actual == expected => CrashRecoveryResult::pass(description, actual),
            Ok(Ok(actual)) => {
                CrashRecoveryResult::fail(description, expected, actual, "record count mismatch")
            }
            Ok(Err((actual, message))) => {
                CrashRecoveryResult::fail(description, expected, actual, &message)
            }
            Err(err) => CrashRecoveryResult::fail(description, expected, 0, &err.to_string()),
        };
        self.results.push(result.clone());
        result
    }

    /// Tests that committed records survive a crash during a later write.
    pub fn test_committed_data_survives(&mut self) -> CrashRecoveryResult {
        self.run("committed records survive a torn append", 10, || {
            let backend = CrashableBackend::new();
            let store = open_crashable(&backend, StoreConfig::default())?;
            for i in 0..10 {
                store.put(&Term::Integer(i), &record(i))?;
            }

            backend.crash_after(5);
            if store.put(&Term::Integer(10), &record(10)).is_ok() {
                return Ok(Err((0, "write past the crash point succeeded".into())));
            }
            drop(store);

            let recovered = recover(&backend, StoreConfig::default())?;
            let count = recovered.count()?;
            if recovered.exists(&Term::Integer(10))? {
                return Ok(Err((count, "torn record was replayed".into())));
            }
            Ok(Ok(count))
        })
    }

    /// Tests that a batch torn at any byte recovers as if never written.
    pub fn test_torn_batch_is_atomic(&mut self) -> CrashRecoveryResult {
        self.run("a torn batch leaves no record and no index entry", 1, || {
            let probe = CrashableBackend::new();
            let store = open_crashable(&probe, indexed())?;
            store.put(&Term::Integer(0), &record(0))?;
            let before = probe.bytes().len();
            store.put(&Term::Integer(1), &record(1))?;
            let batch_len = probe.bytes().len() - before;

            for cut in 0..batch_len {
                let backend = CrashableBackend::new();
                let store = open_crashable(&backend, indexed())?;
                store.put(&Term::Integer(0), &record(0))?;
                backend.crash_after(cut);
                if store.put(&Term::Integer(1), &record(1)).is_ok() {
                    return Ok(Err((0, format!("write torn at {cut} succeeded"))));
                }
                drop(store);

                let recovered = recover(&backend, indexed())?;
                let odd = recovered.index(&Term::atom("parity"), &Term::atom("odd"))?;
                if recovered.exists(&Term::Integer(1))? || !odd.is_empty() {
                    return Ok(Err((recovered.count()?, format!("partial batch at {cut}"))));
                }
                if recovered.count()? != 1 {
                    return Ok(Err((recovered.count()?, format!("lost data at {cut}"))));
                }
            }
            Ok(Ok(1))
        })
    }

    /// Tests that a crash during compaction keeps the previous journal.
    pub fn test_crash_during_compaction(&mut self) -> CrashRecoveryResult {
        self.run("crash during compaction keeps the old journal", 5, || {
            let backend = CrashableBackend::new();
            let store = open_crashable(&backend, StoreConfig::default())?;
            for round in 0..3 {
                for i in 0..5 {
                    store.put(&Term::Integer(i), &Term::Integer(round))?;
                }
            }

            backend.crash_after(0);
            let engine = store.into_engine();
            if engine.compact().is_ok() {
                return Ok(Err((0, "compaction past the crash point succeeded".into())));
            }
            drop(engine);

            let recovered = recover(&backend, StoreConfig::default())?;
            for i in 0..5 {
                if recovered.get(&Term::Integer(i))? != Term::Integer(2) {
                    return Ok(Err((recovered.count()?, format!("stale value at {i}"))));
                }
            }
            Ok(Ok(recovered.count()?))
        })
    }

    /// Tests that a failed sync rolls the write back and the store recovers.
    pub fn test_failed_sync_rolls_back(&mut self) -> CrashRecoveryResult {
        self.run("failed sync leaves no trace", 2, || {
            let backend = CrashableBackend::new();
            let store = open_crashable(&backend, StoreConfig::default())?;
            store.put(&Term::Integer(1), &record(1))?;

            backend.set_fail_on_sync(true);
            if store.put(&Term::Integer(2), &record(2)).is_ok() {
                return Ok(Err((0, "write with failing sync succeeded".into())));
            }
            if !matches!(store.get(&Term::Integer(2)), Err(StoreError::NotFound)) {
                return Ok(Err((0, "failed write is visible".into())));
            }

            backend.set_fail_on_sync(false);
            store.put(&Term::Integer(3), &record(3))?;
            drop(store);

            let recovered = recover(&backend, StoreConfig::default())?;
            if recovered.exists(&Term::Integer(2))? {
                return Ok(Err((recovered.count()?, "failed write was replayed".into())));
            }
            Ok(Ok(recovered.count()?))
        })
    }

    /// Tests that the sequence counter never repeats across a crash.
    pub fn test_seq_survives_crash(&mut self) -> CrashRecoveryResult {
        self.run("sequence counter resumes after a crash", 0, || {
            let backend = CrashableBackend::new();
            let store = open_crashable(&backend, StoreConfig::default())?;
            for _ in 0..3 {
                store.seq()?;
            }

            backend.crash_after(3);
            if store.seq().is_ok() {
                return Ok(Err((0, "counter advanced past the crash point".into())));
            }
            drop(store);

            let recovered = recover(&backend, StoreConfig::default())?;
            if recovered.seq()? != Term::Integer(4) {
                return Ok(Err((0, "counter did not resume at 4".into())));
            }
            Ok(Ok(recovered.count()?))
        })
    }

    /// Runs all crash recovery tests.
    pub fn run_all_tests(&mut self) -> Vec<CrashRecoveryResult> {
        self.results.clear();

        self.test_committed_data_survives();
        self.test_torn_batch_is_atomic();
        self.test_crash_during_compaction();
        self.test_failed_sync_rolls_back();
        self.test_seq_survives_crash();

        self.results.clone()
    }

    /// Returns a summary of test results.
    pub fn summary(&self) -> String {
        let passed = self.results.iter().filter(|r| r.passed).count();
        let total = self.results.len();

        let mut summary = format!(
            "\n=== Crash Recovery Test Summary ===\n\
             Passed: {passed}/{total}\n\n"
        );

        for result in &self.results {
            let status = if result.passed { "ok" } else { "FAILED" };
            summary.push_str(&format!(
                "[{status}] {}\n  Expected: {} records, Actual: {} records\n",
                result.description, result.expected_records, result.actual_records
            ));
            if let Some(error) = &result.error {
                summary.push_str(&format!("  Error: {error}\n"));
            }
        }

        summary
    }

    /// Returns whether all tests passed.
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }
}
