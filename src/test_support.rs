//! Fixture writers for tests: LevelDB blocks, logs and tables, IndexedDB keys,
//! and structured-clone object graphs.

use std::collections::BTreeMap;

use serde_json::Value as Json;

use crate::indexeddb::{
    encode_string_with_length, encode_utf16_be, KeyPrefix, GLOBAL_DATABASE_NAME_TYPE,
    OBJECT_STORE_META_TYPE,
};
use crate::leveldb::{BlockHandle, RawRecord, LOG_BLOCK_SIZE, TABLE_MAGIC};
use crate::util::varint;

// =============================================================================
// LevelDB blocks
// =============================================================================

/// Encode a sorted block with prefix compression and a restart array.
pub fn build_block(entries: &[(Vec<u8>, Vec<u8>)], restart_interval: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut restarts = Vec::new();
    let mut last_key: &[u8] = &[];

    for (i, (key, value)) in entries.iter().enumerate() {
        let shared = if i % restart_interval == 0 {
            restarts.push(out.len() as u32);
            0
        } else {
            key.iter()
                .zip(last_key.iter())
                .take_while(|(a, b)| a == b)
                .count()
        };
        varint::encode_into(shared as u64, &mut out);
        varint::encode_into((key.len() - shared) as u64, &mut out);
        varint::encode_into(value.len() as u64, &mut out);
        out.extend_from_slice(&key[shared..]);
        out.extend_from_slice(value);
        last_key = key;
    }

    if restarts.is_empty() {
        restarts.push(0);
    }
    for restart in &restarts {
        out.extend_from_slice(&restart.to_le_bytes());
    }
    out.extend_from_slice(&(restarts.len() as u32).to_le_bytes());
    out
}

// =============================================================================
// LevelDB logs
// =============================================================================

const CHUNK_HEADER: usize = 7;

/// Lay out payloads as log chunks, fragmenting across 32 KiB blocks.
pub fn build_log(payloads: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();

    for payload in payloads {
        let mut remaining: &[u8] = payload;
        let mut first = true;
        loop {
            let block_offset = out.len() % LOG_BLOCK_SIZE;
            let leftover = LOG_BLOCK_SIZE - block_offset;
            if leftover < CHUNK_HEADER {
                out.extend(std::iter::repeat(0u8).take(leftover));
                continue;
            }

            let available = leftover - CHUNK_HEADER;
            let fragment = remaining.len().min(available);
            let last = fragment == remaining.len();
            let chunk_type = match (first, last) {
                (true, true) => 1,
                (true, false) => 2,
                (false, false) => 3,
                (false, true) => 4,
            };

            out.extend_from_slice(&[0u8; 4]);
            out.extend_from_slice(&(fragment as u16).to_le_bytes());
            out.push(chunk_type);
            out.extend_from_slice(&remaining[..fragment]);

            remaining = &remaining[fragment..];
            first = false;
            if last {
                break;
            }
        }
    }

    out
}

/// One write-batch operation.
#[derive(Debug, Clone)]
pub enum BatchOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// Builds a write-batch payload.
#[derive(Debug)]
pub struct WriteBatchBuilder {
    sequence: u64,
    ops: Vec<BatchOp>,
}

impl WriteBatchBuilder {
    pub fn new(sequence: u64) -> Self {
        Self {
            sequence,
            ops: Vec::new(),
        }
    }

    pub fn put(self, key: &[u8], value: &[u8]) -> Self {
        self.op(BatchOp::Put(key.to_vec(), value.to_vec()))
    }

    pub fn delete(self, key: &[u8]) -> Self {
        self.op(BatchOp::Delete(key.to_vec()))
    }

    pub fn op(mut self, op: BatchOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.sequence.to_le_bytes());
        out.extend_from_slice(&(self.ops.len() as u32).to_le_bytes());
        for op in self.ops {
            match op {
                BatchOp::Put(key, value) => {
                    out.push(1);
                    varint::encode_into(key.len() as u64, &mut out);
                    out.extend_from_slice(&key);
                    varint::encode_into(value.len() as u64, &mut out);
                    out.extend_from_slice(&value);
                }
                BatchOp::Delete(key) => {
                    out.push(0);
                    varint::encode_into(key.len() as u64, &mut out);
                    out.extend_from_slice(&key);
                }
            }
        }
        out
    }
}

// =============================================================================
// LevelDB tables
// =============================================================================

/// A table entry before internal-key encoding.
#[derive(Debug, Clone)]
pub struct TableEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub sequence: u64,
    pub kind: u8,
}

impl TableEntry {
    pub fn put(key: &[u8], value: &[u8], sequence: u64) -> Self {
        Self {
            key: key.to_vec(),
            value: value.to_vec(),
            sequence,
            kind: 1,
        }
    }

    pub fn delete(key: &[u8], sequence: u64) -> Self {
        Self {
            key: key.to_vec(),
            value: Vec::new(),
            sequence,
            kind: 0,
        }
    }

    fn internal_key(&self) -> Vec<u8> {
        let mut key = self.key.clone();
        key.extend_from_slice(&((self.sequence << 8) | self.kind as u64).to_le_bytes());
        key
    }
}

fn append_block(out: &mut Vec<u8>, block: &[u8], snappy: bool) -> BlockHandle {
    let (data, compression) = if snappy {
        let compressed = snap::raw::Encoder::new()
            .compress_vec(block)
            .expect("snappy compression");
        (compressed, 1u8)
    } else {
        (block.to_vec(), 0u8)
    };
    let handle = BlockHandle {
        offset: out.len() as u64,
        size: data.len() as u64,
    };
    out.extend_from_slice(&data);
    out.push(compression);
    out.extend_from_slice(&[0u8; 4]);
    handle
}

/// Write a complete table file holding `entries`.
pub fn build_table(entries: &[TableEntry], snappy: bool, entries_per_block: usize) -> Vec<u8> {
    build_table_with_extra_handles(entries, snappy, entries_per_block, &[])
}

/// Like [`build_table`], with `extra` handles appended to the index block.
pub fn build_table_with_extra_handles(
    entries: &[TableEntry],
    snappy: bool,
    entries_per_block: usize,
    extra: &[BlockHandle],
) -> Vec<u8> {
    let mut out = Vec::new();
    let mut index_entries = Vec::new();

    for chunk in entries.chunks(entries_per_block.max(1)) {
        let encoded: Vec<(Vec<u8>, Vec<u8>)> = chunk
            .iter()
            .map(|entry| (entry.internal_key(), entry.value.clone()))
            .collect();
        let last_key = encoded.last().map(|(k, _)| k.clone()).unwrap_or_default();
        let handle = append_block(&mut out, &build_block(&encoded, 16), snappy);

        let mut handle_bytes = Vec::new();
        handle.encode_into(&mut handle_bytes);
        index_entries.push((last_key, handle_bytes));
    }
    for (i, handle) in extra.iter().enumerate() {
        let mut handle_bytes = Vec::new();
        handle.encode_into(&mut handle_bytes);
        index_entries.push((vec![0xFF, i as u8], handle_bytes));
    }

    let metaindex = append_block(&mut out, &build_block(&[], 1), false);
    let index = append_block(&mut out, &build_block(&index_entries, 1), snappy);

    let mut footer = Vec::new();
    metaindex.encode_into(&mut footer);
    index.encode_into(&mut footer);
    footer.resize(40, 0);
    footer.extend_from_slice(&TABLE_MAGIC.to_le_bytes());
    out.extend_from_slice(&footer);
    out
}

// =============================================================================
// IndexedDB
// =============================================================================

const TEST_ORIGIN: &str = "https_teams.microsoft.com_0@1";

/// Builds the raw records of an IndexedDB backing store.
///
/// Every write gets the next sequence number, so later calls supersede earlier ones.
#[derive(Debug, Default)]
pub struct IndexedDbBuilder {
    records: Vec<RawRecord>,
    sequence: u64,
    max_store_ids: BTreeMap<u64, u64>,
}

impl IndexedDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        let sequence = self.next_sequence();
        self.records.push(RawRecord::live(key, value, sequence));
    }

    pub fn database(&mut self, id: u64, name: &str) {
        let mut key = KeyPrefix::global().encode();
        key.push(GLOBAL_DATABASE_NAME_TYPE);
        key.extend_from_slice(&encode_string_with_length(TEST_ORIGIN));
        key.extend_from_slice(&encode_string_with_length(name));
        self.put(key, varint::encode(id));
    }

    /// Declare a store, raising the database's maximum store id when needed.
    pub fn object_store(&mut self, database_id: u64, store_id: u64, name: &str) {
        self.rename_object_store(database_id, store_id, name);
        let max = self.max_store_ids.get(&database_id).copied().unwrap_or(0);
        if store_id > max {
            self.set_maximum_object_store_id(database_id, store_id);
        }
    }

    pub fn rename_object_store(&mut self, database_id: u64, store_id: u64, name: &str) {
        let mut key = KeyPrefix::database(database_id).encode();
        key.push(OBJECT_STORE_META_TYPE);
        varint::encode_into(store_id, &mut key);
        key.push(0);
        self.put(key, encode_utf16_be(name));
    }

    pub fn set_maximum_object_store_id(&mut self, database_id: u64, max: u64) {
        let mut key = KeyPrefix::database(database_id).encode();
        key.push(3);
        self.put(key, varint::encode(max));
        self.max_store_ids.insert(database_id, max);
    }

    pub fn data_key(database_id: u64, store_id: u64, key: &[u8]) -> Vec<u8> {
        let mut full = KeyPrefix::object_store_data(database_id, store_id).encode();
        full.extend_from_slice(key);
        full
    }

    pub fn put_raw(&mut self, database_id: u64, store_id: u64, key: &[u8], value: Vec<u8>) {
        self.put(Self::data_key(database_id, store_id, key), value);
    }

    /// Store `value` encoded the way the browser writes it.
    pub fn put_json(&mut self, database_id: u64, store_id: u64, key: &[u8], value: &Json) {
        let mut writer = GraphWriter::new();
        writer.json(value);
        self.put_raw(database_id, store_id, key, wrap_value(&writer.finish(), false));
    }

    pub fn delete(&mut self, database_id: u64, store_id: u64, key: &[u8]) {
        let sequence = self.next_sequence();
        self.records.push(RawRecord::deleted(
            Self::data_key(database_id, store_id, key),
            sequence,
        ));
    }

    pub fn into_records(self) -> Vec<RawRecord> {
        self.records
    }
}

// =============================================================================
// Object graphs
// =============================================================================

/// Wrap an object-graph stream in the IndexedDB value envelope.
pub fn wrap_value(graph: &[u8], with_trailer: bool) -> Vec<u8> {
    let mut out = Vec::new();
    varint::encode_into(1, &mut out);
    out.push(0xFF);
    varint::encode_into(21, &mut out);
    if with_trailer {
        out.push(0xFE);
        out.extend_from_slice(&[0u8; 12]);
    }
    out.extend_from_slice(graph);
    out
}

/// Writes a structured-clone object-graph stream tag by tag.
#[derive(Debug)]
pub struct GraphWriter {
    buf: Vec<u8>,
}

impl GraphWriter {
    pub fn new() -> Self {
        Self {
            buf: vec![0xFF, 0x0F],
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    fn tag_varint(&mut self, tag: u8, value: u64) -> &mut Self {
        self.buf.push(tag);
        varint::encode_into(value, &mut self.buf);
        self
    }

    pub fn null(&mut self) -> &mut Self {
        self.raw(b"0")
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.raw(if value { b"T" } else { b"F" })
    }

    pub fn int(&mut self, value: i32) -> &mut Self {
        self.tag_varint(b'I', varint::zigzag_encode_32(value) as u64)
    }

    pub fn uint(&mut self, value: u32) -> &mut Self {
        self.tag_varint(b'U', value as u64)
    }

    pub fn double(&mut self, value: f64) -> &mut Self {
        self.buf.push(b'N');
        self.raw(&value.to_le_bytes())
    }

    pub fn date(&mut self, millis: f64) -> &mut Self {
        self.buf.push(b'D');
        self.raw(&millis.to_le_bytes())
    }

    pub fn utf8(&mut self, s: &str) -> &mut Self {
        self.tag_varint(b'S', s.len() as u64);
        self.raw(s.as_bytes())
    }

    /// Latin-1 string; every char must be at most U+00FF.
    pub fn latin1(&mut self, s: &str) -> &mut Self {
        let bytes: Vec<u8> = s.chars().map(|c| c as u32 as u8).collect();
        self.tag_varint(b'"', bytes.len() as u64);
        self.raw(&bytes)
    }

    pub fn utf16(&mut self, s: &str) -> &mut Self {
        let bytes: Vec<u8> = s.encode_utf16().flat_map(u16::to_le_bytes).collect();
        self.tag_varint(b'c', bytes.len() as u64);
        self.raw(&bytes)
    }

    /// A string in the narrowest encoding the browser would pick.
    pub fn string(&mut self, s: &str) -> &mut Self {
        if s.chars().all(|c| (c as u32) <= 0xFF) {
            self.latin1(s)
        } else {
            self.utf16(s)
        }
    }

    pub fn key(&mut self, key: &str) -> &mut Self {
        self.string(key)
    }

    pub fn key_int(&mut self, key: i32) -> &mut Self {
        self.int(key)
    }

    pub fn reference(&mut self, id: u32) -> &mut Self {
        self.tag_varint(b'^', id as u64)
    }

    pub fn hole(&mut self) -> &mut Self {
        self.raw(b"-")
    }

    pub fn begin_object(&mut self) -> &mut Self {
        self.raw(b"o")
    }

    pub fn end_object(&mut self, properties: u32) -> &mut Self {
        self.tag_varint(b'{', properties as u64)
    }

    pub fn begin_dense_array(&mut self, length: u32) -> &mut Self {
        self.tag_varint(b'A', length as u64)
    }

    pub fn end_dense_array(&mut self, properties: u32, length: u32) -> &mut Self {
        self.tag_varint(b'$', properties as u64);
        varint::encode_into(length as u64, &mut self.buf);
        self
    }

    pub fn begin_sparse_array(&mut self, length: u32) -> &mut Self {
        self.tag_varint(b'a', length as u64)
    }

    pub fn end_sparse_array(&mut self, properties: u32, length: u32) -> &mut Self {
        self.tag_varint(b'@', properties as u64);
        varint::encode_into(length as u64, &mut self.buf);
        self
    }

    pub fn begin_map(&mut self) -> &mut Self {
        self.raw(b";")
    }

    pub fn end_map(&mut self, entries_times_two: u32) -> &mut Self {
        self.tag_varint(b':', entries_times_two as u64)
    }

    pub fn begin_set(&mut self) -> &mut Self {
        self.raw(b"'")
    }

    pub fn end_set(&mut self, items: u32) -> &mut Self {
        self.tag_varint(b',', items as u64)
    }

    /// Encode a JSON value as objects, dense arrays and primitives.
    pub fn json(&mut self, value: &Json) -> &mut Self {
        match value {
            Json::Null => self.null(),
            Json::Bool(b) => self.bool(*b),
            Json::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
                Some(small) => self.int(small),
                None => self.double(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => self.string(s),
            Json::Array(items) => {
                self.begin_dense_array(items.len() as u32);
                for item in items {
                    self.json(item);
                }
                self.end_dense_array(0, items.len() as u32)
            }
            Json::Object(map) => {
                self.begin_object();
                for (key, item) in map {
                    self.key(key);
                    self.json(item);
                }
                self.end_object(map.len() as u32)
            }
        }
    }
}

// =============================================================================
// Teams-shaped stores
// =============================================================================

pub const CONVERSATIONS_DB: u64 = 1;
pub const REPLYCHAINS_DB: u64 = 2;
pub const CONVERSATIONS_STORE: u64 = 1;
pub const PEOPLE_STORE: u64 = 2;
pub const SETTINGS_STORE: u64 = 3;
pub const REPLYCHAINS_STORE: u64 = 1;

/// A backing store laid out like the desktop client's cache.
///
/// Database 1 holds `conversations`, `people` and `settings`; database 2 holds
/// `replychains`.
#[derive(Debug)]
pub struct TeamsFixture {
    builder: IndexedDbBuilder,
    next_key: usize,
}

impl TeamsFixture {
    pub fn new() -> Self {
        let mut builder = IndexedDbBuilder::new();
        builder.database(CONVERSATIONS_DB, "Teams:conversation-manager:react-web-client");
        builder.object_store(CONVERSATIONS_DB, CONVERSATIONS_STORE, "conversations");
        builder.object_store(CONVERSATIONS_DB, PEOPLE_STORE, "people");
        builder.object_store(CONVERSATIONS_DB, SETTINGS_STORE, "settings");
        builder.database(REPLYCHAINS_DB, "Teams:replychain-manager:react-web-client");
        builder.object_store(REPLYCHAINS_DB, REPLYCHAINS_STORE, "replychains");
        Self {
            builder,
            next_key: 0,
        }
    }

    fn key(&mut self) -> Vec<u8> {
        self.next_key += 1;
        format!("k{:06}", self.next_key).into_bytes()
    }

    pub fn conversation(&mut self, value: Json) -> &mut Self {
        let key = self.key();
        self.builder
            .put_json(CONVERSATIONS_DB, CONVERSATIONS_STORE, &key, &value);
        self
    }

    pub fn reply_chain(&mut self, value: Json) -> &mut Self {
        let key = self.key();
        self.builder
            .put_json(REPLYCHAINS_DB, REPLYCHAINS_STORE, &key, &value);
        self
    }

    /// Store a value in the unprojected `settings` store.
    pub fn setting(&mut self, value: Json) -> &mut Self {
        let key = self.key();
        self.builder.put_json(CONVERSATIONS_DB, SETTINGS_STORE, &key, &value);
        self
    }

    pub fn raw_conversation(&mut self, value: Vec<u8>) -> &mut Self {
        let key = self.key();
        self.builder
            .put_raw(CONVERSATIONS_DB, CONVERSATIONS_STORE, &key, value);
        self
    }

    pub fn into_records(self) -> Vec<RawRecord> {
        self.builder.into_records()
    }
}

/// A conversation member with a display-name hint.
pub fn member(id: &str, display_name: &str) -> Json {
    serde_json::json!({ "id": id, "nameHint": { "displayName": display_name } })
}

/// A message as found in a reply chain's message map.
pub fn message(
    conversation_id: &str,
    from: &str,
    display_name: &str,
    arrival_ms: i64,
    message_type: &str,
    content: &str,
) -> Json {
    serde_json::json!({
        "conversationId": conversation_id,
        "from": from,
        "imDisplayName": display_name,
        "originalArrivalTime": arrival_ms,
        "messageType": message_type,
        "content": content,
    })
}

/// A reply chain holding `messages` keyed by position.
pub fn reply_chain(messages: Vec<Json>) -> Json {
    let map: serde_json::Map<String, Json> = messages
        .into_iter()
        .enumerate()
        .map(|(i, m)| (format!("msg{i}"), m))
        .collect();
    serde_json::json!({ "messageMap": map })
}
