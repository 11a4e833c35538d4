//! Error types for value decoding.

use thiserror::Error;

use crate::util::VarintError;

/// Why a single record value could not be decoded.
///
/// Decoding errors never escape the build: the record is skipped and counted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A length, count, id or version field is not a valid varint.
    #[error("malformed varint: {0}")]
    MalformedVarint(#[from] VarintError),

    /// The value ended before the structure being read was complete.
    #[error("unexpected end of value data")]
    UnexpectedEof,

    /// The value does not use the expected wrapper envelope.
    #[error("unsupported value wrapper tag {0:#04x}")]
    UnsupportedWrapper(u8),

    /// The object-graph stream contains a tag this decoder does not handle.
    #[error("unsupported object-graph tag {0:#04x}")]
    UnsupportedTag(u8),

    /// A back-reference names an object that has not been read.
    #[error("back-reference to unknown object {0}")]
    InvalidReference(u32),

    /// String data has an impossible length.
    #[error("invalid string data")]
    InvalidString,

    /// A property key is not a string or number.
    #[error("invalid property key of type {0}")]
    InvalidPropertyKey(&'static str),

    /// A container's trailer disagrees with what was read.
    #[error("container declares {declared} entries but holds {actual}")]
    CountMismatch { declared: u32, actual: usize },

    /// Containers are nested beyond the supported depth.
    #[error("object graph nested deeper than {0} levels")]
    TooDeep(usize),
}

impl DecodeError {
    /// Short category name used when counting skipped records.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::UnsupportedWrapper(_) => "unsupported_wrapper",
            DecodeError::UnsupportedTag(_) => "unsupported_tag",
            DecodeError::MalformedVarint(_) => "malformed_varint",
            _ => "malformed_value",
        }
    }
}

/// Result type for value decoding.
pub type Result<T> = std::result::Result<T, DecodeError>;
