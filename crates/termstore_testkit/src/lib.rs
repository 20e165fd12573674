//! # termstore testkit
//!
//! Test utilities for termstore.
//!
//! This crate provides:
//! - Store fixtures over the memory and journaled engines
//! - Property-based test generators using proptest
//! - Golden encoding vectors shared as JSON
//! - A crash-simulating storage backend for recovery tests
//!
//! ## Usage
//!
//! ```rust
//! use termstore_testkit::prelude::*;
//! use termstore_core::Term;
//!
//! with_temp_store(|store| {
//!     store.put(&Term::from("k"), &Term::Integer(1)).unwrap();
//!     assert_eq!(store.count().unwrap(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::vectors::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
pub use vectors::*;
