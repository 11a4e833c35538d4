//! Sorted table files (`NNNNNN.ldb` / `NNNNNN.sst`).
//!
//! A table ends with a fixed-size footer pointing at the index block. Each index
//! entry points at a data block whose keys are internal keys: the user key
//! followed by an 8-byte trailer packing the sequence number and value kind.

use super::block::{parse_block, read_block, read_u64_le, BlockHandle};
use super::error::FormatError;
use super::record::{KeyState, RawRecord};

pub const FOOTER_SIZE: usize = 48;
pub const TABLE_MAGIC: u64 = 0xdb47_7524_8b80_fb57;

const INTERNAL_KEY_TRAILER_SIZE: usize = 8;
const KIND_DELETION: u8 = 0;
const KIND_VALUE: u8 = 1;

/// Records recovered from a table plus the number of corrupt units skipped.
#[derive(Debug, Default)]
pub struct TableContents {
    pub records: Vec<RawRecord>,
    pub corrupt: usize,
}

/// Read every entry of a table file.
///
/// Fails only when the footer or index block is unusable; broken data blocks
/// and entries are skipped and counted.
pub fn read_table(bytes: &[u8]) -> Result<TableContents, FormatError> {
    if bytes.len() < FOOTER_SIZE {
        return Err(FormatError::Truncated("table footer"));
    }
    let footer_start = bytes.len() - FOOTER_SIZE;
    let magic = read_u64_le(bytes, bytes.len() - 8);
    if magic != TABLE_MAGIC {
        return Err(FormatError::BadMagic(magic));
    }

    let footer = &bytes[footer_start..bytes.len() - 8];
    let (_metaindex, consumed) = BlockHandle::decode(footer, 0)?;
    let (index_handle, _) = BlockHandle::decode(footer, consumed)?;

    let index_block = read_block(bytes, index_handle)?;
    let index = parse_block(&index_block)?;

    let mut contents = TableContents {
        records: Vec::new(),
        corrupt: index.corrupt,
    };

    for entry in index.entries {
        let handle = match BlockHandle::decode(&entry.value, 0) {
            Ok((handle, _)) => handle,
            Err(e) => {
                tracing::debug!("skipping bad index entry: {}", e);
                contents.corrupt += 1;
                continue;
            }
        };

        let block = match read_block(bytes, handle).and_then(|data| parse_block(&data)) {
            Ok(block) => block,
            Err(e) => {
                tracing::debug!("skipping data block at offset {}: {}", handle.offset, e);
                contents.corrupt += 1;
                continue;
            }
        };
        contents.corrupt += block.corrupt;

        for entry in block.entries {
            match split_internal_key(entry.key) {
                Ok((key, sequence, state)) => {
                    let value = if state == KeyState::Live {
                        entry.value
                    } else {
                        Vec::new()
                    };
                    contents.records.push(RawRecord {
                        key,
                        value,
                        sequence,
                        state,
                    });
                }
                Err(e) => {
                    tracing::debug!("skipping table entry: {}", e);
                    contents.corrupt += 1;
                }
            }
        }
    }

    Ok(contents)
}

/// Split an internal key into user key, sequence number and state.
fn split_internal_key(mut key: Vec<u8>) -> Result<(Vec<u8>, u64, KeyState), FormatError> {
    if key.len() < INTERNAL_KEY_TRAILER_SIZE {
        return Err(FormatError::Truncated("internal key"));
    }
    let trailer_start = key.len() - INTERNAL_KEY_TRAILER_SIZE;
    let trailer = read_u64_le(&key, trailer_start);
    key.truncate(trailer_start);

    let state = match (trailer & 0xFF) as u8 {
        KIND_VALUE => KeyState::Live,
        KIND_DELETION => KeyState::Deleted,
        other => return Err(FormatError::UnknownKind(other)),
    };

    Ok((key, trailer >> 8, state))
}
