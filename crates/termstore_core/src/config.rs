//! Store and engine configuration.

use termstore_codec::Term;

/// Configuration of a [`crate::RecordStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Record fields maintained in the secondary index.
    ///
    /// For map values a field is a map key; for tuple values it is a
    /// 1-based `Term::Integer` position.
    pub index_fields: Vec<Term>,

    /// How many times a read-modify-write is retried after losing a race
    /// to a concurrent writer.
    pub max_write_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            index_fields: Vec::new(),
            max_write_retries: 16,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field to the secondary index.
    #[must_use]
    pub fn index_field(mut self, field: impl Into<Term>) -> Self {
        self.index_fields.push(field.into());
        self
    }

    /// Sets the retry budget for read-modify-write operations.
    #[must_use]
    pub const fn max_write_retries(mut self, retries: u32) -> Self {
        self.max_write_retries = retries;
        self
    }
}

/// Configuration of a [`crate::LogEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Whether to create the journal if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to sync the journal on every committed batch (safer but slower).
    pub sync_on_commit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_commit: true,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the journal if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let store = StoreConfig::default();
        assert!(store.index_fields.is_empty());
        assert_eq!(store.max_write_retries, 16);

        let engine = EngineConfig::default();
        assert!(engine.create_if_missing);
        assert!(engine.sync_on_commit);
    }

    #[test]
    fn builder_pattern() {
        let store = StoreConfig::new()
            .index_field(Term::atom("email"))
            .index_field(2i64)
            .max_write_retries(3);
        assert_eq!(
            store.index_fields,
            vec![Term::atom("email"), Term::Integer(2)]
        );
        assert_eq!(store.max_write_retries, 3);

        let engine = EngineConfig::new()
            .create_if_missing(false)
            .sync_on_commit(false);
        assert!(!engine.create_if_missing);
        assert!(!engine.sync_on_commit);
    }
}
