//! Low-level pieces of the opcode stream.
//!
//! Lengths are written as zig-zag signed varints (the same bytes Go's
//! `binary.PutVarint` produces), so streams written by older tools load
//! unchanged.

use std::io::{self, Read};

/// Opens a node without a value: `+ varint(len) prefix`.
pub const OP_BRANCH: u8 = b'+';
/// Opens a node with a value: `= varint(len) prefix varint(len) value`.
pub const OP_KEYED: u8 = b'=';
/// Closes the most recently opened node.
pub const OP_CLOSE: u8 = b'-';

/// First two bytes of every gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Longest encoding of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Encode a u64 as a variable-length integer.
///
/// Uses 1-10 bytes depending on the value:
/// - 0-127: 1 byte
/// - 128-16383: 2 bytes
/// - etc.
pub fn encode_uvarint(mut value: u64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        buf[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    buf[i] = value as u8;
    i + 1
}

/// Encode an i64 with zig-zag mapping so small negative numbers stay short.
pub fn encode_varint(value: i64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    encode_uvarint(zigzag(value), buf)
}

/// Calculate the number of bytes needed to encode a value as uvarint.
pub fn varint_size(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros() as usize;
    (bits + 6) / 7
}

/// Append a signed-varint length followed by the bytes themselves.
pub fn encode_bytes(data: &[u8], out: &mut Vec<u8>) {
    let len = data.len() as i64;
    out.reserve(varint_size(zigzag(len)) + data.len());
    let mut len_buf = [0u8; MAX_VARINT_LEN];
    let n = encode_varint(len, &mut len_buf);
    out.extend_from_slice(&len_buf[..n]);
    out.extend_from_slice(data);
}

/// Why a varint could not be read.
#[derive(Debug)]
pub enum VarintError {
    /// The reader ran dry before the final byte.
    Eof,
    /// More than ten bytes, or the tenth byte overflows 64 bits.
    Overflow,
    /// Any other reader failure.
    Io(io::Error),
}

/// Read an unsigned varint. Returns `(value, bytes_consumed)`.
pub fn read_uvarint<R: Read>(reader: &mut R) -> Result<(u64, usize), VarintError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    let mut byte = [0u8; 1];

    for i in 0..MAX_VARINT_LEN {
        if let Err(e) = reader.read_exact(&mut byte) {
            return Err(match e.kind() {
                io::ErrorKind::UnexpectedEof => VarintError::Eof,
                _ => VarintError::Io(e),
            });
        }
        let b = byte[0];
        if b < 0x80 {
            if i == MAX_VARINT_LEN - 1 && b > 1 {
                return Err(VarintError::Overflow);
            }
            return Ok((value | (u64::from(b) << shift), i + 1));
        }
        value |= u64::from(b & 0x7f) << shift;
        shift += 7;
    }

    Err(VarintError::Overflow)
}

/// Read a zig-zag signed varint. Returns `(value, bytes_consumed)`.
pub fn read_varint<R: Read>(reader: &mut R) -> Result<(i64, usize), VarintError> {
    let (raw, n) = read_uvarint(reader)?;
    Ok((unzigzag(raw), n))
}

#[inline]
fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
fn unzigzag(raw: u64) -> i64 {
    ((raw >> 1) as i64) ^ -((raw & 1) as i64)
}
