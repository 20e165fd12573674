//! Property-based test generators using proptest.
//!
//! Provides strategies for generating terms, keys and store operations,
//! plus the store laws checked against a `BTreeMap` model.

use proptest::prelude::*;
use termstore_core::Term;

/// Strategy for generating scalar terms (never NaN).
pub fn leaf_term_strategy() -> impl Strategy<Value = Term> {
    prop_oneof![
        any::<i64>().prop_map(Term::Integer),
        any::<f64>()
            .prop_filter("NaN is not encodable", |x| !x.is_nan())
            .prop_map(Term::Float),
        prop::string::string_regex("[a-z][a-z0-9_]{0,11}")
            .expect("Invalid regex")
            .prop_map(Term::Atom),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Term::Binary),
    ]
}

/// Strategy for generating arbitrary encodable terms.
pub fn term_strategy() -> impl Strategy<Value = Term> {
    leaf_term_strategy().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Term::Tuple),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Term::List),
            prop::collection::btree_map(inner.clone(), inner, 0..4)
                .prop_map(|entries| Term::Map(entries.into_iter().collect())),
        ]
    })
}

/// Strategy for generating binary keys over a tiny alphabet.
///
/// Short keys from two letters collide and nest often, which exercises
/// overwrite, prefix and boundary behavior.
pub fn key_strategy() -> impl Strategy<Value = Term> {
    prop::string::string_regex("[ab]{0,4}")
        .expect("Invalid regex")
        .prop_map(Term::from)
}

/// A store operation.
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Store a value.
    Put {
        /// Key
        key: Term,
        /// Value
        value: Term,
    },
    /// Insert unless present.
    Append {
        /// Candidate key
        key: Term,
        /// Value
        value: Term,
    },
    /// Delete a key.
    Delete {
        /// Key
        key: Term,
    },
    /// Delete up to `n` records from `start`.
    Drop {
        /// Start key
        start: Term,
        /// Maximum number of records
        n: usize,
    },
    /// Delete a prefix.
    Cut {
        /// Prefix
        prefix: Term,
    },
}

/// Strategy for generating store operations.
pub fn store_operation_strategy() -> impl Strategy<Value = StoreOperation> {
    prop_oneof![
        4 => (key_strategy(), any::<i64>())
            .prop_map(|(key, v)| StoreOperation::Put { key, value: Term::Integer(v) }),
        2 => (key_strategy(), any::<i64>())
            .prop_map(|(key, v)| StoreOperation::Append { key, value: Term::Integer(v) }),
        2 => key_strategy().prop_map(|key| StoreOperation::Delete { key }),
        1 => (key_strategy(), 0..4usize).prop_map(|(start, n)| StoreOperation::Drop { start, n }),
        1 => key_strategy().prop_map(|prefix| StoreOperation::Cut { prefix }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOperation>> {
    prop::collection::vec(store_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
