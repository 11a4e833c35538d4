//! IndexedDB key prefixes and key-embedded strings.
//!
//! Every IndexedDB key in the backing store begins with a prefix naming the
//! database, object store and index it belongs to. The first byte packs the
//! byte widths of the three ids; the ids follow as little-endian integers.

use thiserror::Error;

use crate::util::{varint, VarintError};

/// Index id marking object-store data rows.
pub const OBJECT_STORE_DATA_INDEX_ID: u64 = 1;

/// Type byte of global database-name entries.
pub const GLOBAL_DATABASE_NAME_TYPE: u8 = 0xC9;

/// Type byte introducing object-store metadata under a database prefix.
pub const OBJECT_STORE_META_TYPE: u8 = 50;

/// Database ids above this value are reserved and never hold user data.
pub const MAX_USER_DATABASE_ID: u64 = 0x7F;

// =============================================================================
// Error Types
// =============================================================================

/// Errors decoding key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("truncated key: {0}")]
    Truncated(&'static str),

    #[error("{0}")]
    Varint(#[from] VarintError),

    #[error("invalid UTF-16 string")]
    InvalidUtf16,
}

/// Result type for key decoding.
pub type Result<T> = std::result::Result<T, KeyError>;

// =============================================================================
// KeyPrefix
// =============================================================================

/// The (database, object store, index) triple heading every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPrefix {
    pub database_id: u64,
    pub object_store_id: u64,
    pub index_id: u64,
}

impl KeyPrefix {
    pub fn new(database_id: u64, object_store_id: u64, index_id: u64) -> Self {
        Self {
            database_id,
            object_store_id,
            index_id,
        }
    }

    /// Prefix of global metadata keys.
    pub fn global() -> Self {
        Self::new(0, 0, 0)
    }

    /// Prefix of a database's metadata keys.
    pub fn database(database_id: u64) -> Self {
        Self::new(database_id, 0, 0)
    }

    /// Prefix of an object store's data rows.
    pub fn object_store_data(database_id: u64, object_store_id: u64) -> Self {
        Self::new(database_id, object_store_id, OBJECT_STORE_DATA_INDEX_ID)
    }

    /// Encode with the narrowest width for each id.
    pub fn encode(&self) -> Vec<u8> {
        let db = minimal_le_bytes(self.database_id, 8);
        let store = minimal_le_bytes(self.object_store_id, 8);
        let index = minimal_le_bytes(self.index_id, 4);

        let mut out = Vec::with_capacity(1 + db.len() + store.len() + index.len());
        out.push(
            (((db.len() - 1) as u8) << 5)
                | (((store.len() - 1) as u8) << 2)
                | (index.len() - 1) as u8,
        );
        out.extend_from_slice(&db);
        out.extend_from_slice(&store);
        out.extend_from_slice(&index);
        out
    }

    /// Decode a prefix from the start of `key`, returning it and its length.
    pub fn decode(key: &[u8]) -> Result<(Self, usize)> {
        let first = *key.first().ok_or(KeyError::Truncated("key prefix"))?;
        let db_len = ((first >> 5) & 0x07) as usize + 1;
        let store_len = ((first >> 2) & 0x07) as usize + 1;
        let index_len = (first & 0x03) as usize + 1;

        let total = 1 + db_len + store_len + index_len;
        if key.len() < total {
            return Err(KeyError::Truncated("key prefix ids"));
        }

        let mut pos = 1;
        let database_id = read_le(&key[pos..pos + db_len]);
        pos += db_len;
        let object_store_id = read_le(&key[pos..pos + store_len]);
        pos += store_len;
        let index_id = read_le(&key[pos..pos + index_len]);

        Ok((Self::new(database_id, object_store_id, index_id), total))
    }
}

fn minimal_le_bytes(value: u64, max_width: usize) -> Vec<u8> {
    let bytes = value.to_le_bytes();
    let width = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(1)
        .min(max_width);
    bytes[..width].to_vec()
}

fn read_le(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

// =============================================================================
// Strings
// =============================================================================

/// Decode a big-endian UTF-16 string occupying all of `bytes`.
pub fn decode_utf16_be(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(KeyError::Truncated("UTF-16 string"));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| KeyError::InvalidUtf16)
}

/// Decode a varint-length-prefixed big-endian UTF-16 string at `pos`.
///
/// The length counts UTF-16 code units. Returns the string and bytes consumed.
pub fn decode_string_with_length(bytes: &[u8], pos: usize) -> Result<(String, usize)> {
    let (units, consumed) = varint::decode(bytes, pos)?;
    let start = pos + consumed;
    let byte_len = usize::try_from(units)
        .ok()
        .and_then(|u| u.checked_mul(2))
        .ok_or(KeyError::Truncated("string length"))?;
    let end = start
        .checked_add(byte_len)
        .filter(|&end| end <= bytes.len())
        .ok_or(KeyError::Truncated("string body"))?;

    Ok((decode_utf16_be(&bytes[start..end])?, consumed + byte_len))
}

/// Encode a string as big-endian UTF-16 without a length.
pub fn encode_utf16_be(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
}

/// Encode a string as varint code-unit count followed by big-endian UTF-16.
pub fn encode_string_with_length(s: &str) -> Vec<u8> {
    let body = encode_utf16_be(s);
    let mut out = varint::encode((body.len() / 2) as u64);
    out.extend_from_slice(&body);
    out
}
