//! Table blocks: handles, trailers, compression and prefix-compressed entries.

use crate::util::varint;

use super::error::FormatError;

/// Size of the trailer following every block: compression type + crc32.
pub const BLOCK_TRAILER_SIZE: usize = 5;

const COMPRESSION_NONE: u8 = 0;
const COMPRESSION_SNAPPY: u8 = 1;

/// Upper bound on Snappy output per input byte; a 3-byte copy emits at most 64.
const MAX_SNAPPY_EXPANSION: usize = 32;

// =============================================================================
// BlockHandle
// =============================================================================

/// Location of a block within a table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    pub offset: u64,
    pub size: u64,
}

impl BlockHandle {
    /// Decode a handle at `pos`, returning it and the bytes consumed.
    pub fn decode(bytes: &[u8], pos: usize) -> Result<(Self, usize), FormatError> {
        let (offset, a) = varint::decode(bytes, pos)?;
        let (size, b) = varint::decode(bytes, pos + a)?;
        Ok((Self { offset, size }, a + b))
    }

    /// Append the encoded handle to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        varint::encode_into(self.offset, out);
        varint::encode_into(self.size, out);
    }
}

/// Read the contents of the block at `handle`, decompressing if needed.
pub fn read_block(file: &[u8], handle: BlockHandle) -> Result<Vec<u8>, FormatError> {
    let start = usize::try_from(handle.offset).map_err(|_| FormatError::Truncated("block"))?;
    let size = usize::try_from(handle.size).map_err(|_| FormatError::Truncated("block"))?;
    let end = start
        .checked_add(size)
        .ok_or(FormatError::Truncated("block"))?;
    let trailer_end = end
        .checked_add(BLOCK_TRAILER_SIZE)
        .ok_or(FormatError::Truncated("block"))?;

    if trailer_end > file.len() {
        return Err(FormatError::Truncated("block"));
    }

    let data = &file[start..end];
    match file[end] {
        COMPRESSION_NONE => Ok(data.to_vec()),
        COMPRESSION_SNAPPY => {
            let declared =
                snap::raw::decompress_len(data).map_err(|e| FormatError::Snappy(e.to_string()))?;
            if declared > data.len().saturating_mul(MAX_SNAPPY_EXPANSION) {
                return Err(FormatError::Snappy(format!(
                    "declared length {} is impossible for {} input bytes",
                    declared,
                    data.len()
                )));
            }
            snap::raw::Decoder::new()
                .decompress_vec(data)
                .map_err(|e| FormatError::Snappy(e.to_string()))
        }
        other => Err(FormatError::UnsupportedCompression(other)),
    }
}

// =============================================================================
// Block entries
// =============================================================================

/// A key/value pair stored in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Entries parsed from one block plus the number of corrupt regions skipped.
#[derive(Debug, Default)]
pub struct BlockContents {
    pub entries: Vec<BlockEntry>,
    pub corrupt: usize,
}

/// Parse the prefix-compressed entries of a decompressed block.
///
/// When an entry is malformed, parsing resumes at the next restart point,
/// where keys are stored in full.
pub fn parse_block(block: &[u8]) -> Result<BlockContents, FormatError> {
    if block.len() < 4 {
        return Err(FormatError::Truncated("block restart count"));
    }
    let num_restarts = read_u32_le(block, block.len() - 4) as usize;
    let restarts_start = num_restarts
        .checked_mul(4)
        .and_then(|n| (block.len() - 4).checked_sub(n))
        .ok_or(FormatError::Truncated("block restart array"))?;

    let restarts: Vec<usize> = (0..num_restarts)
        .map(|i| read_u32_le(block, restarts_start + i * 4) as usize)
        .collect();

    let mut contents = BlockContents::default();
    let mut pos = 0;
    let mut last_key: Vec<u8> = Vec::new();

    while pos < restarts_start {
        match parse_entry(block, pos, restarts_start, &last_key) {
            Ok((entry, next)) => {
                last_key.clone_from(&entry.key);
                contents.entries.push(entry);
                pos = next;
            }
            Err(_) => {
                contents.corrupt += 1;
                match restarts.iter().find(|&&r| r > pos && r < restarts_start) {
                    Some(&restart) => {
                        pos = restart;
                        last_key.clear();
                    }
                    None => break,
                }
            }
        }
    }

    Ok(contents)
}

fn parse_entry(
    block: &[u8],
    pos: usize,
    limit: usize,
    last_key: &[u8],
) -> Result<(BlockEntry, usize), FormatError> {
    let data = &block[..limit];
    let (shared, a) = varint::decode_u32(data, pos)?;
    let (non_shared, b) = varint::decode_u32(data, pos + a)?;
    let (value_len, c) = varint::decode_u32(data, pos + a + b)?;
    let (shared, non_shared, value_len) =
        (shared as usize, non_shared as usize, value_len as usize);

    if shared > last_key.len() {
        return Err(FormatError::Truncated("shared key prefix"));
    }

    let key_start = pos + a + b + c;
    let value_start = key_start + non_shared;
    let end = value_start + value_len;
    if end > limit {
        return Err(FormatError::Truncated("block entry"));
    }

    let mut key = Vec::with_capacity(shared + non_shared);
    key.extend_from_slice(&last_key[..shared]);
    key.extend_from_slice(&data[key_start..value_start]);

    Ok((
        BlockEntry {
            key,
            value: data[value_start..end].to_vec(),
        },
        end,
    ))
}

pub(crate) fn read_u32_le(bytes: &[u8], pos: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[pos..pos + 4]);
    u32::from_le_bytes(buf)
}

pub(crate) fn read_u64_le(bytes: &[u8], pos: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[pos..pos + 8]);
    u64::from_le_bytes(buf)
}
