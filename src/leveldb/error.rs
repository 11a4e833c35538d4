//! Error types for LevelDB reading.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::VarintError;

/// Errors that make a LevelDB store unreadable as a whole.
#[derive(Debug, Error)]
pub enum LevelDbError {
    /// The store directory does not exist.
    #[error("store not found: {0}")]
    StoreNotFound(PathBuf),

    /// The store exists but none of its data could be parsed.
    #[error("corrupt store {path}: {message}")]
    CorruptStore { path: PathBuf, message: String },

    /// An I/O error occurred while listing the store.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for LevelDB store operations.
pub type Result<T> = std::result::Result<T, LevelDbError>;

/// Errors in the on-disk encoding of a single file, block or entry.
///
/// These are recovered from locally: the offending unit is skipped and counted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Data ended before a structure was complete.
    #[error("truncated {0}")]
    Truncated(&'static str),

    /// The table footer does not carry the LevelDB magic number.
    #[error("bad table magic {0:#018x}")]
    BadMagic(u64),

    /// The block uses a compression scheme this reader does not handle.
    #[error("unsupported block compression type {0}")]
    UnsupportedCompression(u8),

    /// Snappy decompression of a block failed.
    #[error("snappy decompression failed: {0}")]
    Snappy(String),

    /// A length or handle field is not a valid varint.
    #[error("{0}")]
    Varint(#[from] VarintError),

    /// An internal key carries an unknown value kind.
    #[error("unknown value kind {0}")]
    UnknownKind(u8),

    /// A write batch is structurally invalid.
    #[error("malformed write batch: {0}")]
    Batch(String),
}
