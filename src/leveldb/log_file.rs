//! Write-ahead log files (`NNNNNN.log`).
//!
//! A log is a sequence of 32 KiB blocks holding physical chunks. Chunks are
//! reassembled into logical payloads, each of which is a write batch.

use crate::util::varint;

use super::block::{read_u32_le, read_u64_le};
use super::error::FormatError;
use super::record::{KeyState, RawRecord};

pub const LOG_BLOCK_SIZE: usize = 32 * 1024;
pub const CHUNK_HEADER_SIZE: usize = 7;

const CHUNK_ZERO: u8 = 0;
const CHUNK_FULL: u8 = 1;
const CHUNK_FIRST: u8 = 2;
const CHUNK_MIDDLE: u8 = 3;
const CHUNK_LAST: u8 = 4;

const BATCH_HEADER_SIZE: usize = 12;
const BATCH_TAG_DELETION: u8 = 0;
const BATCH_TAG_VALUE: u8 = 1;

/// Records recovered from a log file plus the number of corrupt units skipped.
#[derive(Debug, Default)]
pub struct LogContents {
    pub records: Vec<RawRecord>,
    pub corrupt: usize,
}

/// Read every write batch in a log file.
pub fn read_log(bytes: &[u8]) -> LogContents {
    let mut contents = LogContents::default();

    for payload in reassemble_chunks(bytes, &mut contents.corrupt) {
        if let Err(e) = parse_write_batch(&payload, &mut contents.records) {
            tracing::debug!("skipping malformed write batch: {}", e);
            contents.corrupt += 1;
        }
    }

    contents
}

/// Split the log into logical payloads, dropping broken fragments.
fn reassemble_chunks(bytes: &[u8], corrupt: &mut usize) -> Vec<Vec<u8>> {
    let mut payloads = Vec::new();
    let mut pending: Option<Vec<u8>> = None;

    for block in bytes.chunks(LOG_BLOCK_SIZE) {
        let mut pos = 0;

        while pos + CHUNK_HEADER_SIZE <= block.len() {
            let length = u16::from_le_bytes([block[pos + 4], block[pos + 5]]) as usize;
            let chunk_type = block[pos + 6];
            let data_start = pos + CHUNK_HEADER_SIZE;
            let data_end = data_start + length;

            if chunk_type == CHUNK_ZERO && length == 0 {
                // Preallocated space; nothing more in this block.
                break;
            }
            if data_end > block.len() {
                *corrupt += 1;
                pending = None;
                break;
            }

            let data = &block[data_start..data_end];
            match chunk_type {
                CHUNK_FULL => {
                    if pending.take().is_some() {
                        *corrupt += 1;
                    }
                    payloads.push(data.to_vec());
                }
                CHUNK_FIRST => {
                    if pending.replace(data.to_vec()).is_some() {
                        *corrupt += 1;
                    }
                }
                CHUNK_MIDDLE => match pending.as_mut() {
                    Some(buf) => buf.extend_from_slice(data),
                    None => *corrupt += 1,
                },
                CHUNK_LAST => match pending.take() {
                    Some(mut buf) => {
                        buf.extend_from_slice(data);
                        payloads.push(buf);
                    }
                    None => *corrupt += 1,
                },
                _ => {
                    *corrupt += 1;
                    pending = None;
                }
            }

            pos = data_end;
        }
    }

    if pending.is_some() {
        // A batch whose tail never made it to disk.
        *corrupt += 1;
    }

    payloads
}

/// Parse a write batch, appending its entries to `out`.
///
/// Entries decoded before a malformed one are kept.
pub fn parse_write_batch(batch: &[u8], out: &mut Vec<RawRecord>) -> Result<(), FormatError> {
    if batch.len() < BATCH_HEADER_SIZE {
        return Err(FormatError::Truncated("write batch header"));
    }
    let base_sequence = read_u64_le(batch, 0);
    let count = read_u32_le(batch, 8) as u64;

    let mut pos = BATCH_HEADER_SIZE;
    for index in 0..count {
        let tag = *batch
            .get(pos)
            .ok_or(FormatError::Truncated("write batch entry"))?;
        pos += 1;

        let key = read_length_prefixed(batch, &mut pos)?;
        let sequence = base_sequence.wrapping_add(index);

        match tag {
            BATCH_TAG_VALUE => {
                let value = read_length_prefixed(batch, &mut pos)?;
                out.push(RawRecord {
                    key,
                    value,
                    sequence,
                    state: KeyState::Live,
                });
            }
            BATCH_TAG_DELETION => out.push(RawRecord {
                key,
                value: Vec::new(),
                sequence,
                state: KeyState::Deleted,
            }),
            other => return Err(FormatError::Batch(format!("unknown entry tag {}", other))),
        }
    }

    Ok(())
}

fn read_length_prefixed(bytes: &[u8], pos: &mut usize) -> Result<Vec<u8>, FormatError> {
    let (len, consumed) = varint::decode_u32(bytes, *pos)?;
    let start = *pos + consumed;
    let end = start + len as usize;
    if end > bytes.len() {
        return Err(FormatError::Truncated("write batch slice"));
    }
    *pos = end;
    Ok(bytes[start..end].to_vec())
}
