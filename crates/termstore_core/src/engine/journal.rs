//! Journal record framing.
//!
//! Each committed batch becomes one record:
//!
//! ```text
//! | magic "TSJ1" (4) | payload_len (4, LE) | payload | crc32 (4, LE) |
//!
//! payload = op_count (4, LE) then per op:
//!   kind (1) | space (1) | key_len (4, LE) | key | [value_len (4, LE) | value]
//! ```
//!
//! The checksum covers magic, length and payload.

use super::{BatchOp, Space};
use crate::error::{EngineError, EngineResult};
use bytes::Bytes;

/// Magic bytes opening every journal record.
pub(crate) const MAGIC: [u8; 4] = *b"TSJ1";

const HEADER_SIZE: usize = 8;
const CRC_SIZE: usize = 4;

const OP_PUT: u8 = 1;
const OP_DELETE: u8 = 2;

/// Outcome of reading one record.
#[derive(Debug)]
pub(crate) enum Frame {
    /// A complete, verified record spanning `len` bytes.
    Record { ops: Vec<BatchOp>, len: usize },
    /// The data ends inside a record.
    Torn,
}

/// Frames a batch as a journal record.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn encode_record(ops: &[BatchOp]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(ops.len() as u32).to_le_bytes());
    for op in ops {
        match op {
            BatchOp::Put { space, key, value } => {
                payload.push(OP_PUT);
                payload.push(space.as_byte());
                put_bytes(&mut payload, key);
                put_bytes(&mut payload, value);
            }
            BatchOp::Delete { space, key } => {
                payload.push(OP_DELETE);
                payload.push(space.as_byte());
                put_bytes(&mut payload, key);
            }
        }
    }

    let mut record = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
    record.extend_from_slice(&MAGIC);
    record.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    record.extend_from_slice(&payload);
    let crc = compute_crc32(&record);
    record.extend_from_slice(&crc.to_le_bytes());
    record
}

#[allow(clippy::cast_possible_truncation)]
fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

/// Reads the record starting at `offset` of `data`.
///
/// # Errors
///
/// A record with a wrong magic, a failed checksum or a malformed payload
/// is corruption, not a torn write.
pub(crate) fn read_record(data: &[u8], offset: usize) -> EngineResult<Frame> {
    let rest = &data[offset..];
    if rest.len() < HEADER_SIZE {
        return Ok(Frame::Torn);
    }
    if rest[..4] != MAGIC {
        return Err(EngineError::corrupted(offset as u64, "bad record magic"));
    }

    let payload_len = read_u32(&rest[4..8]) as usize;
    let body_end = HEADER_SIZE + payload_len;
    let len = body_end + CRC_SIZE;
    if rest.len() < len {
        return Ok(Frame::Torn);
    }

    let expected = read_u32(&rest[body_end..len]);
    let actual = compute_crc32(&rest[..body_end]);
    if expected != actual {
        return Err(EngineError::ChecksumMismatch {
            offset: offset as u64,
            expected,
            actual,
        });
    }

    let ops = decode_payload(&rest[HEADER_SIZE..body_end])
        .ok_or_else(|| EngineError::corrupted(offset as u64, "malformed record payload"))?;
    Ok(Frame::Record { ops, len })
}

fn decode_payload(payload: &[u8]) -> Option<Vec<BatchOp>> {
    let mut reader = Reader { data: payload, pos: 0 };
    let count = reader.u32()? as usize;
    let mut ops = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let kind = reader.byte()?;
        let space = Space::from_byte(reader.byte()?)?;
        let key = reader.bytes()?;
        let op = match kind {
            OP_PUT => BatchOp::Put {
                space,
                key,
                value: reader.bytes()?,
            },
            OP_DELETE => BatchOp::Delete { space, key },
            _ => return None,
        };
        ops.push(op);
    }
    (reader.pos == payload.len()).then_some(ops)
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take(&mut self, n: usize) -> Option<&[u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn byte(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u32(&mut self) -> Option<u32> {
        self.take(4).map(read_u32)
    }

    fn bytes(&mut self) -> Option<Bytes> {
        let len = self.u32()? as usize;
        self.take(len).map(Bytes::copy_from_slice)
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Computes the IEEE CRC32 of `data`.
#[must_use]
pub(crate) fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            #[allow(clippy::cast_possible_truncation)]
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}
