//! Order-preserving term encoder.

use crate::error::{CodecError, CodecResult};
use crate::term::{Term, TermKind};

/// Tag bytes. `END` terminates containers and is below every kind tag, so a
/// shorter container sorts before any extension of it.
pub(crate) mod tag {
    pub const END: u8 = 0x00;
    pub const INTEGER: u8 = 0x10;
    pub const FLOAT: u8 = 0x20;
    pub const ATOM: u8 = 0x30;
    pub const BINARY: u8 = 0x40;
    pub const TUPLE: u8 = 0x50;
    pub const LIST: u8 = 0x60;
    pub const MAP: u8 = 0x70;
}

/// Escape bytes used inside atom and binary payloads.
pub(crate) mod escape {
    /// `00` is written as `00 FF`; `00 00` terminates the payload.
    pub const NUL: u8 = 0x00;
    pub const NUL_ESCAPED: u8 = 0xFF;
    /// `FE` and `FF` are written as `FE 01` and `FE 02`.
    pub const HIGH: u8 = 0xFE;
    pub const HIGH_FE: u8 = 0x01;
    pub const HIGH_FF: u8 = 0x02;
}

/// Maximum nesting depth of tuples, lists and maps.
pub const MAX_DEPTH: usize = 128;

/// Maximum atom length in characters.
pub const MAX_ATOM_CHARS: usize = 255;

const SIGN_BIT: u64 = 1 << 63;

/// Encode a term to its order-preserving byte form.
///
/// # Errors
///
/// Fails on NaN floats, over-long atoms, duplicate map keys and nesting
/// deeper than [`MAX_DEPTH`].
pub fn encode(term: &Term) -> CodecResult<Vec<u8>> {
    let mut encoder = KeyEncoder::new();
    encoder.encode(term)?;
    Ok(encoder.into_bytes())
}

/// Encode a term as an open-ended prefix.
///
/// The result is [`encode`] without the outermost terminator, so it is a byte
/// prefix of the encoding of every term that extends `term`: binaries and
/// atoms that start with the same bytes, tuples/lists/maps that start with
/// the same elements. Integers and floats are returned fully encoded.
///
/// No encoded key continues a prefix with the byte `FF`, so
/// `encode_prefix(t) ++ [0xFF]` bounds every such key from above.
///
/// # Errors
///
/// Same as [`encode`].
pub fn encode_prefix(term: &Term) -> CodecResult<Vec<u8>> {
    let mut bytes = encode(term)?;
    let terminator = match term.kind() {
        TermKind::Integer | TermKind::Float => 0,
        TermKind::Atom | TermKind::Binary => 2,
        TermKind::Tuple | TermKind::List | TermKind::Map => 1,
    };
    bytes.truncate(bytes.len() - terminator);
    Ok(bytes)
}

/// An order-preserving term encoder.
///
/// Several terms can be written back to back; each encoding is
/// self-delimiting.
#[derive(Debug, Default)]
pub struct KeyEncoder {
    buffer: Vec<u8>,
}

impl KeyEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Append the encoding of `term`.
    ///
    /// On error the buffer may hold a partial encoding.
    pub fn encode(&mut self, term: &Term) -> CodecResult<()> {
        self.encode_at(term, 0)
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    fn encode_at(&mut self, term: &Term, depth: usize) -> CodecResult<()> {
        if depth > MAX_DEPTH {
            return Err(CodecError::DepthLimitExceeded { max: MAX_DEPTH });
        }

        match term {
            Term::Integer(n) => {
                self.buffer.push(tag::INTEGER);
                #[allow(clippy::cast_sign_loss)]
                let ordered = (*n as u64) ^ SIGN_BIT;
                self.buffer.extend_from_slice(&ordered.to_be_bytes());
            }
            Term::Float(x) => {
                if x.is_nan() {
                    return Err(CodecError::NaNForbidden);
                }
                self.buffer.push(tag::FLOAT);
                let bits = x.to_bits();
                let ordered = if bits & SIGN_BIT == 0 {
                    bits | SIGN_BIT
                } else {
                    !bits
                };
                self.buffer.extend_from_slice(&ordered.to_be_bytes());
            }
            Term::Atom(name) => {
                let len = name.chars().count();
                if len > MAX_ATOM_CHARS {
                    return Err(CodecError::AtomTooLong {
                        len,
                        max: MAX_ATOM_CHARS,
                    });
                }
                self.buffer.push(tag::ATOM);
                self.encode_escaped(name.as_bytes());
            }
            Term::Binary(bytes) => {
                self.buffer.push(tag::BINARY);
                self.encode_escaped(bytes);
            }
            Term::Tuple(elements) => {
                self.buffer.push(tag::TUPLE);
                self.encode_elements(elements, depth)?;
            }
            Term::List(elements) => {
                self.buffer.push(tag::LIST);
                self.encode_elements(elements, depth)?;
            }
            Term::Map(pairs) => {
                self.buffer.push(tag::MAP);
                self.encode_map(pairs, depth)?;
            }
        }
        Ok(())
    }

    fn encode_escaped(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            match byte {
                escape::NUL => self
                    .buffer
                    .extend_from_slice(&[escape::NUL, escape::NUL_ESCAPED]),
                0xFE => self.buffer.extend_from_slice(&[escape::HIGH, escape::HIGH_FE]),
                0xFF => self.buffer.extend_from_slice(&[escape::HIGH, escape::HIGH_FF]),
                other => self.buffer.push(other),
            }
        }
        self.buffer.extend_from_slice(&[escape::NUL, escape::NUL]);
    }

    fn encode_elements(&mut self, elements: &[Term], depth: usize) -> CodecResult<()> {
        for element in elements {
            self.encode_at(element, depth + 1)?;
        }
        self.buffer.push(tag::END);
        Ok(())
    }

    fn encode_map(&mut self, pairs: &[(Term, Term)], depth: usize) -> CodecResult<()> {
        // Term order on keys is the byte order of their encodings, so sorting
        // the terms yields the canonical layout.
        let mut sorted: Vec<&(Term, Term)> = pairs.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        if let Some(pair) = sorted.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(CodecError::DuplicateMapKey {
                key: pair[0].0.to_string(),
            });
        }

        for (key, value) in sorted {
            self.encode_at(key, depth + 1)?;
            self.encode_at(value, depth + 1)?;
        }
        self.buffer.push(tag::END);
        Ok(())
    }
}
