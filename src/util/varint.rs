//! Little-endian base-128 variable-length integers.
//!
//! Every binary layer of the cache (LevelDB blocks and write batches, IndexedDB
//! keys and value envelopes, the object-graph stream) uses this encoding: seven
//! payload bits per byte, least significant group first, with the high bit set
//! on every byte except the last.

use thiserror::Error;

/// Longest encoding of a `u64` (ceil(64 / 7)).
pub const MAX_VARINT_LEN: usize = 10;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while decoding a varint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VarintError {
    /// Input ended before a byte without the continuation bit was seen.
    #[error("malformed varint: input exhausted mid-sequence")]
    Truncated,

    /// The continuation chain is longer than a `u64` can hold.
    #[error("malformed varint: value overflows 64 bits")]
    Overflow,
}

/// Result type for varint operations.
pub type Result<T> = std::result::Result<T, VarintError>;

// =============================================================================
// Decoding
// =============================================================================

/// Decode a varint starting at `offset`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode(bytes: &[u8], offset: usize) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut consumed = 0;

    loop {
        let byte = *bytes.get(offset + consumed).ok_or(VarintError::Truncated)?;
        if consumed == MAX_VARINT_LEN - 1 && byte > 0x01 {
            // The tenth byte may only contribute the 64th bit.
            return Err(VarintError::Overflow);
        }
        value |= u64::from(byte & 0x7F) << (7 * consumed);
        consumed += 1;

        if byte & 0x80 == 0 {
            return Ok((value, consumed));
        }
    }
}

/// Decode a varint that must fit in 32 bits.
pub fn decode_u32(bytes: &[u8], offset: usize) -> Result<(u32, usize)> {
    let (value, consumed) = decode(bytes, offset)?;
    let value = u32::try_from(value).map_err(|_| VarintError::Overflow)?;
    Ok((value, consumed))
}

// =============================================================================
// Encoding
// =============================================================================

/// Append the varint encoding of `value` to `out`, returning the bytes written.
pub fn encode_into(mut value: u64, out: &mut Vec<u8>) -> usize {
    let start = out.len();
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
    out.len() - start
}

/// Encode `value` as a standalone varint.
pub fn encode(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_VARINT_LEN);
    encode_into(value, &mut out);
    out
}

// =============================================================================
// Zig-zag
// =============================================================================

/// Map a zig-zag encoded 32-bit value back to its signed form.
pub fn zigzag_decode_32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Zig-zag encode a signed 32-bit value.
pub fn zigzag_encode_32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}
