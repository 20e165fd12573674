//! Term decoder.

use crate::encoder::{escape, tag, MAX_ATOM_CHARS, MAX_DEPTH};
use crate::error::{CodecError, CodecResult};
use crate::term::Term;

const SIGN_BIT: u64 = 1 << 63;

/// Decode a term that spans exactly `bytes`.
///
/// # Errors
///
/// Returns an error on truncated or ill-formed input, on input that is not
/// the canonical encoding of its term, or if bytes remain after the term.
pub fn decode(bytes: &[u8]) -> CodecResult<Term> {
    let mut decoder = KeyDecoder::new(bytes);
    let term = decoder.decode()?;
    if !decoder.is_empty() {
        return Err(CodecError::TrailingBytes {
            count: decoder.remaining().len(),
        });
    }
    Ok(term)
}

/// A term decoder over a byte slice.
///
/// Decodes terms one at a time, which lets callers read several
/// self-delimiting encodings written back to back.
pub struct KeyDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> KeyDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decode the next term.
    pub fn decode(&mut self) -> CodecResult<Term> {
        self.decode_at(0)
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn decode_at(&mut self, depth: usize) -> CodecResult<Term> {
        if depth > MAX_DEPTH {
            return Err(CodecError::DepthLimitExceeded { max: MAX_DEPTH });
        }

        let offset = self.pos;
        match self.read_byte()? {
            tag::INTEGER => {
                let ordered = self.read_u64()?;
                #[allow(clippy::cast_possible_wrap)]
                let n = (ordered ^ SIGN_BIT) as i64;
                Ok(Term::Integer(n))
            }
            tag::FLOAT => {
                let ordered = self.read_u64()?;
                let bits = if ordered & SIGN_BIT != 0 {
                    ordered & !SIGN_BIT
                } else {
                    !ordered
                };
                let x = f64::from_bits(bits);
                if x.is_nan() {
                    return Err(CodecError::non_canonical("NaN float"));
                }
                Ok(Term::Float(x))
            }
            tag::ATOM => {
                let bytes = self.read_escaped()?;
                let name =
                    String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8 { offset })?;
                if name.chars().count() > MAX_ATOM_CHARS {
                    return Err(CodecError::non_canonical("atom exceeds length limit"));
                }
                Ok(Term::Atom(name))
            }
            tag::BINARY => Ok(Term::Binary(self.read_escaped()?)),
            tag::TUPLE => Ok(Term::Tuple(self.decode_elements(depth)?)),
            tag::LIST => Ok(Term::List(self.decode_elements(depth)?)),
            tag::MAP => self.decode_map(depth),
            other => Err(CodecError::UnknownTag { tag: other, offset }),
        }
    }

    #[inline]
    fn read_byte(&mut self) -> CodecResult<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(CodecError::UnexpectedEof { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn peek_byte(&self) -> CodecResult<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(CodecError::UnexpectedEof { offset: self.pos })
    }

    fn read_u64(&mut self) -> CodecResult<u64> {
        let end = self.pos + 8;
        let bytes: [u8; 8] = self
            .data
            .get(self.pos..end)
            .and_then(|slice| slice.try_into().ok())
            .ok_or(CodecError::UnexpectedEof {
                offset: self.data.len(),
            })?;
        self.pos = end;
        Ok(u64::from_be_bytes(bytes))
    }

    fn read_escaped(&mut self) -> CodecResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let offset = self.pos;
            match self.read_byte()? {
                escape::NUL => match self.read_byte()? {
                    escape::NUL => return Ok(out),
                    escape::NUL_ESCAPED => out.push(0x00),
                    _ => return Err(CodecError::InvalidEscape { offset }),
                },
                escape::HIGH => match self.read_byte()? {
                    escape::HIGH_FE => out.push(0xFE),
                    escape::HIGH_FF => out.push(0xFF),
                    _ => return Err(CodecError::InvalidEscape { offset }),
                },
                0xFF => return Err(CodecError::InvalidEscape { offset }),
                byte => out.push(byte),
            }
        }
    }

    fn decode_elements(&mut self, depth: usize) -> CodecResult<Vec<Term>> {
        let mut elements = Vec::new();
        while self.peek_byte()? != tag::END {
            elements.push(self.decode_at(depth + 1)?);
        }
        self.pos += 1;
        Ok(elements)
    }

    fn decode_map(&mut self, depth: usize) -> CodecResult<Term> {
        let mut pairs: Vec<(Term, Term)> = Vec::new();
        while self.peek_byte()? != tag::END {
            let key = self.decode_at(depth + 1)?;
            if let Some((previous, _)) = pairs.last() {
                if previous >= &key {
                    return Err(CodecError::non_canonical(
                        "map keys not in strictly ascending order",
                    ));
                }
            }
            let value = self.decode_at(depth + 1)?;
            pairs.push((key, value));
        }
        self.pos += 1;
        Ok(Term::Map(pairs))
    }
}
