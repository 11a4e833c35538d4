//! Decoding of IndexedDB record values.
//!
//! A stored value is an envelope (value version, wrapper tag, wrapper version and
//! an optional trailer block) around a structured-clone object graph. The graph
//! is a tag-prefixed stream; containers that carry an identity are numbered in
//! the order their headers are read, and later back-references name them by
//! that number.

use std::sync::Arc;

use crate::util::varint;

use super::decoded_value::{DecodedGraph, DecodedValue, ObjectProperties};
use super::error::{DecodeError, Result};

// =============================================================================
// Envelope
// =============================================================================

/// Tag that introduces the wrapper envelope and the object-graph header.
pub const WRAPPER_TAG: u8 = 0xFF;
/// Tag of the optional trailer-offset block that follows the wrapper version.
pub const TRAILER_OFFSET_TAG: u8 = 0xFE;
/// Trailer tag, offset and size.
const TRAILER_BLOCK_SIZE: usize = 1 + 8 + 4;

/// Containers nested deeper than this are rejected.
pub const MAX_DEPTH: usize = 256;

/// Largest sparse array decoded as a padded [`DecodedValue::Array`].
pub const MAX_PADDED_SPARSE_LENGTH: usize = 1 << 16;

// =============================================================================
// Object-graph tags
// =============================================================================

const TAG_PADDING: u8 = 0x00;
const TAG_VERIFY_OBJECT_COUNT: u8 = b'?';
const TAG_THE_HOLE: u8 = b'-';
const TAG_UNDEFINED: u8 = b'_';
const TAG_NULL: u8 = b'0';
const TAG_TRUE: u8 = b'T';
const TAG_FALSE: u8 = b'F';
const TAG_INT32: u8 = b'I';
const TAG_UINT32: u8 = b'U';
const TAG_DOUBLE: u8 = b'N';
const TAG_UTF8_STRING: u8 = b'S';
const TAG_ONE_BYTE_STRING: u8 = b'"';
const TAG_TWO_BYTE_STRING: u8 = b'c';
const TAG_OBJECT_REFERENCE: u8 = b'^';
const TAG_BEGIN_JS_OBJECT: u8 = b'o';
const TAG_END_JS_OBJECT: u8 = b'{';
const TAG_BEGIN_SPARSE_ARRAY: u8 = b'a';
const TAG_END_SPARSE_ARRAY: u8 = b'@';
const TAG_BEGIN_DENSE_ARRAY: u8 = b'A';
const TAG_END_DENSE_ARRAY: u8 = b'$';
const TAG_DATE: u8 = b'D';
const TAG_TRUE_OBJECT: u8 = b'y';
const TAG_FALSE_OBJECT: u8 = b'x';
const TAG_NUMBER_OBJECT: u8 = b'n';
const TAG_STRING_OBJECT: u8 = b's';
const TAG_REGEXP: u8 = b'R';
const TAG_BEGIN_MAP: u8 = b';';
const TAG_END_MAP: u8 = b':';
const TAG_BEGIN_SET: u8 = b'\'';
const TAG_END_SET: u8 = b',';

/// Decode a stored record value into its object graph.
pub fn decode_record_value(value: &[u8]) -> Result<DecodedGraph> {
    let (_value_version, mut pos) = varint::decode(value, 0)?;

    let wrapper = *value.get(pos).ok_or(DecodeError::UnexpectedEof)?;
    if wrapper != WRAPPER_TAG {
        return Err(DecodeError::UnsupportedWrapper(wrapper));
    }
    pos += 1;

    let (_wrapper_version, len) = varint::decode(value, pos)?;
    pos += len;

    if value.get(pos) == Some(&TRAILER_OFFSET_TAG) {
        pos += TRAILER_BLOCK_SIZE;
        if pos > value.len() {
            return Err(DecodeError::UnexpectedEof);
        }
    }

    read_object_graph(&value[pos..])
}

/// Decode a bare object-graph stream, with or without its version header.
pub fn read_object_graph(data: &[u8]) -> Result<DecodedGraph> {
    let mut reader = ObjectGraphReader::new(data);
    reader.read_header()?;
    let root = reader.read_value()?;
    Ok(reader.finish(root))
}

// =============================================================================
// ObjectGraphReader
// =============================================================================

struct ObjectGraphReader<'a> {
    data: &'a [u8],
    pos: usize,
    objects: Vec<Option<DecodedValue>>,
    depth: usize,
}

impl<'a> ObjectGraphReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            objects: Vec::new(),
            depth: 0,
        }
    }

    fn read_header(&mut self) -> Result<()> {
        if self.data.get(self.pos) == Some(&WRAPPER_TAG) {
            self.pos += 1;
            self.read_varint()?;
        }
        Ok(())
    }

    fn finish(self, root: DecodedValue) -> DecodedGraph {
        let objects = self
            .objects
            .into_iter()
            .map(|slot| slot.unwrap_or(DecodedValue::Undefined))
            .collect();
        DecodedGraph::new(root, objects)
    }

    // -------------------------------------------------------------------------
    // Primitive reads
    // -------------------------------------------------------------------------

    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or(DecodeError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::InvalidString)?;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(DecodeError::UnexpectedEof)?;
        self.pos = end;
        Ok(bytes)
    }

    fn read_varint(&mut self) -> Result<u64> {
        let (value, len) = varint::decode(self.data, self.pos)?;
        self.pos += len;
        Ok(value)
    }

    fn read_varint_u32(&mut self) -> Result<u32> {
        let (value, len) = varint::decode_u32(self.data, self.pos)?;
        self.pos += len;
        Ok(value)
    }

    fn read_length(&mut self) -> Result<usize> {
        usize::try_from(self.read_varint()?).map_err(|_| DecodeError::InvalidString)
    }

    fn read_f64(&mut self) -> Result<f64> {
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(raw))
    }

    /// Next non-padding tag.
    fn read_tag(&mut self) -> Result<u8> {
        loop {
            let tag = self.read_u8()?;
            if tag != TAG_PADDING {
                return Ok(tag);
            }
        }
    }

    fn read_utf8(&mut self) -> Result<String> {
        let len = self.read_length()?;
        Ok(String::from_utf8_lossy(self.read_bytes(len)?).into_owned())
    }

    fn read_latin1(&mut self) -> Result<String> {
        let len = self.read_length()?;
        Ok(self.read_bytes(len)?.iter().map(|&b| b as char).collect())
    }

    fn read_utf16(&mut self) -> Result<String> {
        let len = self.read_length()?;
        if len % 2 != 0 {
            return Err(DecodeError::InvalidString);
        }
        let units: Vec<u16> = self
            .read_bytes(len)?
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(String::from_utf16_lossy(&units))
    }

    // -------------------------------------------------------------------------
    // Object table
    // -------------------------------------------------------------------------

    fn reserve_id(&mut self) -> usize {
        self.objects.push(None);
        self.objects.len() - 1
    }

    fn complete(&mut self, id: usize, value: DecodedValue) -> DecodedValue {
        self.objects[id] = Some(value.clone());
        value
    }

    // -------------------------------------------------------------------------
    // Values
    // -------------------------------------------------------------------------

    fn read_value(&mut self) -> Result<DecodedValue> {
        let tag = self.read_tag()?;
        self.read_tagged(tag)
    }

    fn read_tagged(&mut self, tag: u8) -> Result<DecodedValue> {
        match tag {
            TAG_VERIFY_OBJECT_COUNT => {
                self.read_varint()?;
                self.read_value()
            }
            TAG_UNDEFINED | TAG_THE_HOLE => Ok(DecodedValue::Undefined),
            TAG_NULL => Ok(DecodedValue::Null),
            TAG_TRUE => Ok(DecodedValue::Bool(true)),
            TAG_FALSE => Ok(DecodedValue::Bool(false)),
            TAG_INT32 => {
                let raw = self.read_varint_u32()?;
                Ok(DecodedValue::Int(varint::zigzag_decode_32(raw) as i64))
            }
            TAG_UINT32 => Ok(DecodedValue::Int(self.read_varint_u32()? as i64)),
            TAG_DOUBLE => Ok(DecodedValue::Double(self.read_f64()?)),
            TAG_UTF8_STRING => Ok(DecodedValue::Str(self.read_utf8()?)),
            TAG_ONE_BYTE_STRING => Ok(DecodedValue::Str(self.read_latin1()?)),
            TAG_TWO_BYTE_STRING => Ok(DecodedValue::Str(self.read_utf16()?)),
            TAG_OBJECT_REFERENCE => {
                let id = self.read_varint_u32()?;
                if (id as usize) < self.objects.len() {
                    Ok(DecodedValue::Reference(id))
                } else {
                    Err(DecodeError::InvalidReference(id))
                }
            }
            TAG_DATE => {
                let id = self.reserve_id();
                let millis = self.read_f64()?;
                Ok(self.complete(id, DecodedValue::Date(millis)))
            }
            TAG_TRUE_OBJECT | TAG_FALSE_OBJECT => {
                let id = self.reserve_id();
                Ok(self.complete(id, DecodedValue::Bool(tag == TAG_TRUE_OBJECT)))
            }
            TAG_NUMBER_OBJECT => {
                let id = self.reserve_id();
                let number = self.read_f64()?;
                Ok(self.complete(id, DecodedValue::Double(number)))
            }
            TAG_STRING_OBJECT => {
                let id = self.reserve_id();
                let inner = self.read_string_value()?;
                Ok(self.complete(id, DecodedValue::Str(inner)))
            }
            TAG_REGEXP => {
                let id = self.reserve_id();
                let pattern = self.read_string_value()?;
                self.read_varint()?; // flags
                Ok(self.complete(id, DecodedValue::Str(pattern)))
            }
            TAG_BEGIN_JS_OBJECT => self.nested(Self::read_object),
            TAG_BEGIN_DENSE_ARRAY => self.nested(Self::read_dense_array),
            TAG_BEGIN_SPARSE_ARRAY => self.nested(Self::read_sparse_array),
            TAG_BEGIN_MAP => self.nested(Self::read_map),
            TAG_BEGIN_SET => self.nested(Self::read_set),
            other => Err(DecodeError::UnsupportedTag(other)),
        }
    }

    fn nested(&mut self, read: fn(&mut Self) -> Result<DecodedValue>) -> Result<DecodedValue> {
        if self.depth >= MAX_DEPTH {
            return Err(DecodeError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let value = read(self);
        self.depth -= 1;
        value
    }

    /// A string-valued child, as used by string wrappers and regexps.
    fn read_string_value(&mut self) -> Result<String> {
        match self.read_value()? {
            DecodedValue::Str(s) => Ok(s),
            other => Err(DecodeError::InvalidPropertyKey(other.type_name())),
        }
    }

    /// Key/value pairs up to `end_tag`; the end tag is consumed.
    fn read_properties(&mut self, end_tag: u8) -> Result<ObjectProperties> {
        let mut properties = Vec::new();
        loop {
            let tag = self.read_tag()?;
            if tag == end_tag {
                return Ok(properties);
            }
            let key = property_key(&self.read_tagged(tag)?)?;
            let value = self.read_value()?;
            properties.push((key, value));
        }
    }

    fn expect_count(&mut self, actual: usize) -> Result<()> {
        let declared = self.read_varint_u32()?;
        if declared as usize != actual {
            return Err(DecodeError::CountMismatch { declared, actual });
        }
        Ok(())
    }

    fn read_object(&mut self) -> Result<DecodedValue> {
        let id = self.reserve_id();
        let properties = self.read_properties(TAG_END_JS_OBJECT)?;
        self.expect_count(properties.len())?;
        Ok(self.complete(id, DecodedValue::Object(Arc::new(properties))))
    }

    fn read_dense_array(&mut self) -> Result<DecodedValue> {
        let id = self.reserve_id();
        let length = self.read_length()?;

        let mut items = Vec::with_capacity(length.min(self.data.len()));
        for _ in 0..length {
            items.push(self.read_value()?);
        }

        // Non-index properties on arrays are read and dropped.
        let extra = self.read_properties(TAG_END_DENSE_ARRAY)?;
        self.expect_count(extra.len())?;
        self.read_varint()?;

        Ok(self.complete(id, DecodedValue::Array(Arc::new(items))))
    }

    fn read_sparse_array(&mut self) -> Result<DecodedValue> {
        let id = self.reserve_id();
        let length = self.read_length()?;
        let properties = self.read_properties(TAG_END_SPARSE_ARRAY)?;
        self.expect_count(properties.len())?;
        self.read_varint()?;

        let indexed: Vec<(usize, DecodedValue)> = properties
            .into_iter()
            .filter_map(|(key, value)| {
                key.parse::<usize>()
                    .ok()
                    .filter(|index| *index < length)
                    .map(|index| (index, value))
            })
            .collect();
        let size = indexed.iter().map(|(index, _)| index + 1).max().unwrap_or(0);

        // Arrays too sparse to pad are kept as an object keyed by index.
        if size > MAX_PADDED_SPARSE_LENGTH {
            let mut indexed = indexed;
            indexed.sort_by_key(|(index, _)| *index);
            let entries: ObjectProperties = indexed
                .into_iter()
                .map(|(index, value)| (index.to_string(), value))
                .collect();
            return Ok(self.complete(id, DecodedValue::Object(Arc::new(entries))));
        }

        let mut items = vec![DecodedValue::Undefined; size];
        for (index, value) in indexed {
            items[index] = value;
        }
        Ok(self.complete(id, DecodedValue::Array(Arc::new(items))))
    }

    fn read_map(&mut self) -> Result<DecodedValue> {
        let id = self.reserve_id();
        let mut entries = Vec::new();
        loop {
            let tag = self.read_tag()?;
            if tag == TAG_END_MAP {
                break;
            }
            let key = self.read_tagged(tag)?;
            let value = self.read_value()?;
            entries.push((display_key(&key), value));
        }
        self.expect_count(entries.len() * 2)?;
        Ok(self.complete(id, DecodedValue::Object(Arc::new(entries))))
    }

    fn read_set(&mut self) -> Result<DecodedValue> {
        let id = self.reserve_id();
        let mut items = Vec::new();
        loop {
            let tag = self.read_tag()?;
            if tag == TAG_END_SET {
                break;
            }
            items.push(self.read_tagged(tag)?);
        }
        self.expect_count(items.len())?;
        Ok(self.complete(id, DecodedValue::Array(Arc::new(items))))
    }
}

fn property_key(key: &DecodedValue) -> Result<String> {
    match key {
        DecodedValue::Str(s) => Ok(s.clone()),
        DecodedValue::Int(i) => Ok(i.to_string()),
        DecodedValue::Double(d) => Ok(format_number(*d)),
        other => Err(DecodeError::InvalidPropertyKey(other.type_name())),
    }
}

/// String form of an arbitrary map key.
fn display_key(key: &DecodedValue) -> String {
    match key {
        DecodedValue::Null => "null".to_string(),
        DecodedValue::Undefined => "undefined".to_string(),
        DecodedValue::Bool(b) => b.to_string(),
        DecodedValue::Int(i) => i.to_string(),
        DecodedValue::Double(d) | DecodedValue::Date(d) => format_number(*d),
        DecodedValue::Str(s) => s.clone(),
        DecodedValue::Array(_) | DecodedValue::Object(_) | DecodedValue::Reference(_) => {
            "[object Object]".to_string()
        }
    }
}

fn format_number(d: f64) -> String {
    if d.is_finite() && d.fract() == 0.0 && d.abs() < 1e15 {
        format!("{}", d as i64)
    } else {
        d.to_string()
    }
}
