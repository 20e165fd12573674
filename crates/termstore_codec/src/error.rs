//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding a term.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// NaN has no position in the key order.
    #[error("NaN floats cannot be encoded")]
    NaNForbidden,

    /// Atom exceeds the maximum length.
    #[error("atom of {len} characters exceeds the limit of {max}")]
    AtomTooLong {
        /// Length of the offending atom in characters.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// A map holds the same key twice.
    #[error("duplicate map key {key}")]
    DuplicateMapKey {
        /// Rendering of the duplicated key.
        key: String,
    },

    /// Terms nest deeper than the codec allows.
    #[error("term nesting exceeds {max} levels")]
    DepthLimitExceeded {
        /// Maximum nesting depth.
        max: usize,
    },

    /// Input ended in the middle of a term.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof {
        /// Offset where more input was expected.
        offset: usize,
    },

    /// A tag byte does not name any term kind.
    #[error("unknown tag 0x{tag:02x} at offset {offset}")]
    UnknownTag {
        /// The tag byte.
        tag: u8,
        /// Offset of the tag byte.
        offset: usize,
    },

    /// Malformed escape sequence inside an atom or binary.
    #[error("invalid escape sequence at offset {offset}")]
    InvalidEscape {
        /// Offset of the escape byte.
        offset: usize,
    },

    /// Atom payload is not valid UTF-8.
    #[error("atom at offset {offset} is not valid UTF-8")]
    InvalidUtf8 {
        /// Offset of the atom tag.
        offset: usize,
    },

    /// Bytes remain after a complete term.
    #[error("{count} trailing bytes after term")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        count: usize,
    },

    /// Input decodes but is not the canonical encoding of its term.
    #[error("non-canonical encoding: {message}")]
    NonCanonical {
        /// What made the input non-canonical.
        message: String,
    },
}

impl CodecError {
    /// Create a non-canonical encoding error.
    pub fn non_canonical(message: impl Into<String>) -> Self {
        Self::NonCanonical {
            message: message.into(),
        }
    }
}
