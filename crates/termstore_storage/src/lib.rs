//! # termstore storage
//!
//! Byte-log backends underneath the persistent termstore engine.
//!
//! A backend is an **opaque, append-only byte log**. It knows nothing about
//! journal framing, terms or keyspaces; the engine in `termstore_core` owns
//! all interpretation of the bytes.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - for tests and throwaway stores
//! - [`FileBackend`] - a single file guarded by an exclusive lock file
//!
//! ## Example
//!
//! ```rust
//! use termstore_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"journal record").unwrap();
//! assert_eq!(backend.read_at(offset, 7).unwrap(), b"journal");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
