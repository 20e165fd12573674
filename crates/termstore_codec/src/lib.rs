//! # termstore codec
//!
//! Order-preserving encoding of [`Term`]s to byte strings.
//!
//! Every range operation of a termstore is defined by bytewise key
//! comparison, so the encoding guarantees:
//! - determinism: a term has exactly one encoding
//! - round trip: `decode(encode(t)) == t`
//! - order preservation: `a < b` implies `encode(a) < encode(b)`
//!
//! ## Byte layout
//!
//! | kind    | tag  | payload                                               |
//! |---------|------|-------------------------------------------------------|
//! | integer | `10` | 8 bytes big-endian, sign bit flipped                  |
//! | float   | `20` | 8 bytes big-endian, sign bit flipped (all bits if negative) |
//! | atom    | `30` | escaped UTF-8, then `00 00`                           |
//! | binary  | `40` | escaped bytes, then `00 00`                           |
//! | tuple   | `50` | elements, then `00`                                   |
//! | list    | `60` | elements, then `00`                                   |
//! | map     | `70` | key/value pairs sorted by key, then `00`              |
//!
//! Escapes: `00 → 00 FF`, `FE → FE 01`, `FF → FE 02`.
//!
//! ## Usage
//!
//! ```
//! use termstore_codec::{decode, encode, encode_prefix, Term};
//!
//! let key = Term::tuple([Term::atom("feed"), Term::Integer(42)]);
//! let bytes = encode(&key).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), key);
//!
//! let feed = encode_prefix(&Term::tuple([Term::atom("feed")])).unwrap();
//! assert!(bytes.starts_with(&feed));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod term;

pub use decoder::{decode, KeyDecoder};
pub use encoder::{encode, encode_prefix, KeyEncoder, MAX_ATOM_CHARS, MAX_DEPTH};
pub use error::{CodecError, CodecResult};
pub use term::{Term, TermKind};
