//! # termstore core
//!
//! A record store layered over a sorted key-value engine.
//!
//! This crate provides:
//! - the [`OrderedEngine`] adapter: point access, bidirectional cursors and
//!   atomic batches with preconditions
//! - [`MemoryEngine`] and the journaled [`LogEngine`]
//! - [`range`] operations on encoded bytes: top, bot, next, prev, take,
//!   drop and prefix cut
//! - the [`RecordStore`] facade over [`Term`] keys and values, with
//!   deduplicating append, a secondary index and a sequence counter
//!
//! ```
//! use termstore_core::{MemoryEngine, RecordStore, StoreConfig, Term};
//!
//! let store = RecordStore::new(MemoryEngine::new(), StoreConfig::default());
//! for key in ["a1", "a2", "b1"] {
//!     store.put(&Term::from(key), &Term::Integer(0)).unwrap();
//! }
//!
//! assert_eq!(store.cut(&Term::from("a")).unwrap(), 2);
//! assert_eq!(store.dir().unwrap(), vec![Term::from("b1")]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod index;
pub mod range;
mod store;

pub use config::{EngineConfig, StoreConfig};
pub use engine::{
    Batch, BatchOp, Cursor, LogEngine, MemoryCursor, MemoryEngine, OrderedEngine, Precondition,
    Space, WriteBatch,
};
pub use error::{EngineError, EngineResult, StoreError, StoreResult};
pub use index::{field_value, IndexSpec};
pub use range::RawEntry;
pub use store::RecordStore;
pub use termstore_codec::{Term, TermKind};
