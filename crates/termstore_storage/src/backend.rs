//! Storage backend trait definition.

use crate::error::StorageResult;

/// An append-only byte log.
///
/// # Invariants
///
/// - `append` returns the offset where the data starts
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `sync` makes every appended byte durable
/// - `replace` swaps the whole content in one step; readers never observe a
///   half-written replacement
///
/// Implementations must be `Send + Sync` so an engine can share them behind
/// its own lock.
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ReadPastEnd`] if the range extends past
    /// the end of the log, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the log and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Makes all appended data durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current size of the log in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Cuts the log back to `new_size` bytes.
    ///
    /// Used to discard a torn record at the tail after a crash.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::InvalidTruncate`] if `new_size` is
    /// larger than the current size.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Replaces the whole log with `data`.
    ///
    /// The default implementation truncates and re-appends, which is only
    /// atomic for backends without crash semantics.
    ///
    /// # Errors
    ///
    /// Returns an error if any underlying operation fails.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        self.truncate(0)?;
        self.append(data)?;
        self.sync()
    }

    /// Reads the whole log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        let len = usize::try_from(size).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("log of {size} bytes does not fit in memory"),
            )
        })?;
        self.read_at(0, len)
    }
}
