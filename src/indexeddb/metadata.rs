//! Database and object-store metadata resolution.
//!
//! Resolution runs over a [`LogicalView`], so every metadata entry is already the
//! highest-sequence live version of its key.

use std::collections::BTreeMap;

use crate::leveldb::{LogicalView, RawRecord};
use crate::util::varint;

use super::key_prefix::{
    decode_string_with_length, decode_utf16_be, KeyPrefix, GLOBAL_DATABASE_NAME_TYPE,
    MAX_USER_DATABASE_ID, OBJECT_STORE_META_TYPE,
};

// =============================================================================
// Metadata type tags
// =============================================================================

/// Database-level metadata types (the byte after a database prefix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatabaseMetadataType {
    OriginName,
    DatabaseName,
    IdbVersionString,
    MaximumObjectStoreId,
    IdbVersion,
    BlobNumberGeneratorCurrentNumber,
}

impl DatabaseMetadataType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::OriginName),
            1 => Some(Self::DatabaseName),
            2 => Some(Self::IdbVersionString),
            3 => Some(Self::MaximumObjectStoreId),
            4 => Some(Self::IdbVersion),
            5 => Some(Self::BlobNumberGeneratorCurrentNumber),
            _ => None,
        }
    }
}

/// Object-store-level metadata types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectStoreMetadataType {
    StoreName,
    KeyPath,
    AutoIncrement,
    IsEvictable,
    LastVersion,
    MaximumIndexId,
    HasKeyPath,
    KeyGeneratorCurrentNumber,
}

impl ObjectStoreMetadataType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::StoreName),
            1 => Some(Self::KeyPath),
            2 => Some(Self::AutoIncrement),
            3 => Some(Self::IsEvictable),
            4 => Some(Self::LastVersion),
            5 => Some(Self::MaximumIndexId),
            6 => Some(Self::HasKeyPath),
            7 => Some(Self::KeyGeneratorCurrentNumber),
            _ => None,
        }
    }
}

// =============================================================================
// GlobalMetadata
// =============================================================================

/// A logical database registered in global metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseId {
    pub id: u64,
    pub origin: String,
    pub name: String,
}

/// The set of logical databases in the backing store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalMetadata {
    pub databases: Vec<DatabaseId>,
}

impl GlobalMetadata {
    /// Collect database-name entries under the global prefix.
    ///
    /// Entries that fail to decode, and reserved ids, are skipped.
    pub fn resolve(view: &LogicalView) -> Self {
        let mut prefix = KeyPrefix::global().encode();
        prefix.push(GLOBAL_DATABASE_NAME_TYPE);

        let mut databases: Vec<DatabaseId> = view
            .scan_prefix(&prefix)
            .filter_map(|record| match decode_database_name(record, prefix.len()) {
                Some(db) if db.id <= MAX_USER_DATABASE_ID => Some(db),
                Some(db) => {
                    tracing::debug!("skipping reserved database id {}", db.id);
                    None
                }
                None => {
                    tracing::debug!("skipping undecodable database-name entry");
                    None
                }
            })
            .collect();

        databases.sort_by_key(|db| db.id);
        databases.dedup_by_key(|db| db.id);
        Self { databases }
    }

    pub fn database_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.databases.iter().map(|db| db.id)
    }
}

fn decode_database_name(record: &RawRecord, prefix_len: usize) -> Option<DatabaseId> {
    let (origin, a) = decode_string_with_length(&record.key, prefix_len).ok()?;
    let (name, _) = decode_string_with_length(&record.key, prefix_len + a).ok()?;
    let (id, _) = varint::decode(&record.value, 0).ok()?;
    Some(DatabaseId { id, origin, name })
}

// =============================================================================
// DatabaseMetadata
// =============================================================================

/// Per-database metadata values keyed by (database id, type).
#[derive(Debug, Clone, Default)]
pub struct DatabaseMetadata {
    entries: BTreeMap<(u64, DatabaseMetadataType), Vec<u8>>,
}

impl DatabaseMetadata {
    pub fn resolve(view: &LogicalView, database_ids: &[u64]) -> Self {
        let mut entries = BTreeMap::new();

        for &db_id in database_ids {
            let prefix = KeyPrefix::database(db_id).encode();
            for record in view.scan_prefix(&prefix) {
                // Exactly one type byte follows; longer keys belong to other scopes.
                if record.key.len() != prefix.len() + 1 {
                    continue;
                }
                if let Some(meta_type) = DatabaseMetadataType::from_byte(record.key[prefix.len()]) {
                    entries.insert((db_id, meta_type), record.value.clone());
                }
            }
        }

        Self { entries }
    }

    /// The raw value of a metadata entry.
    pub fn get_raw(&self, db_id: u64, meta_type: DatabaseMetadataType) -> Option<&[u8]> {
        self.entries.get(&(db_id, meta_type)).map(Vec::as_slice)
    }

    /// Highest object-store id ever allocated in the database.
    pub fn maximum_object_store_id(&self, db_id: u64) -> Option<u64> {
        let raw = self.get_raw(db_id, DatabaseMetadataType::MaximumObjectStoreId)?;
        varint::decode(raw, 0).ok().map(|(value, _)| value)
    }
}

// =============================================================================
// ObjectStoreMetadata
// =============================================================================

/// Per-object-store metadata values keyed by (database id, store id, type).
#[derive(Debug, Clone, Default)]
pub struct ObjectStoreMetadata {
    entries: BTreeMap<(u64, u64, ObjectStoreMetadataType), Vec<u8>>,
}

impl ObjectStoreMetadata {
    pub fn resolve(view: &LogicalView, database_ids: &[u64]) -> Self {
        let mut entries = BTreeMap::new();

        for &db_id in database_ids {
            let mut prefix = KeyPrefix::database(db_id).encode();
            prefix.push(OBJECT_STORE_META_TYPE);

            for record in view.scan_prefix(&prefix) {
                let Ok((store_id, consumed)) = varint::decode(&record.key, prefix.len()) else {
                    continue;
                };
                let Some(&type_byte) = record.key.get(prefix.len() + consumed) else {
                    continue;
                };
                if let Some(meta_type) = ObjectStoreMetadataType::from_byte(type_byte) {
                    entries.insert((db_id, store_id, meta_type), record.value.clone());
                }
            }
        }

        Self { entries }
    }

    pub fn get_raw(
        &self,
        db_id: u64,
        store_id: u64,
        meta_type: ObjectStoreMetadataType,
    ) -> Option<&[u8]> {
        self.entries
            .get(&(db_id, store_id, meta_type))
            .map(Vec::as_slice)
    }

    /// Human-readable name of an object store.
    pub fn store_name(&self, db_id: u64, store_id: u64) -> Option<String> {
        let raw = self.get_raw(db_id, store_id, ObjectStoreMetadataType::StoreName)?;
        decode_utf16_be(raw).ok()
    }

    /// Named object stores of a database, in store-id order.
    ///
    /// Names that fail to decode are skipped.
    pub fn store_names(&self, db_id: u64) -> impl Iterator<Item = (u64, String)> + '_ {
        let first = (db_id, 0, ObjectStoreMetadataType::StoreName);
        let last = (db_id, u64::MAX, ObjectStoreMetadataType::KeyGeneratorCurrentNumber);
        self.entries
            .range(first..=last)
            .filter(|((_, _, meta_type), _)| *meta_type == ObjectStoreMetadataType::StoreName)
            .filter_map(|((_, store_id, _), raw)| Some((*store_id, decode_utf16_be(raw).ok()?)))
    }
}

// =============================================================================
// MetadataResolver
// =============================================================================

/// An object store selected for decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreRef {
    pub database_id: u64,
    pub object_store_id: u64,
    pub name: String,
}

impl ObjectStoreRef {
    /// Key prefix shared by this store's data rows.
    pub fn data_prefix(&self) -> Vec<u8> {
        KeyPrefix::object_store_data(self.database_id, self.object_store_id).encode()
    }

    /// Non-empty data rows of this store, in key order.
    pub fn records<'a>(
        &self,
        view: &'a LogicalView,
    ) -> impl Iterator<Item = &'a RawRecord> + 'a {
        view.scan_prefix(&self.data_prefix())
            .filter(|record| !record.value.is_empty())
    }
}

/// All metadata needed to locate object stores.
#[derive(Debug, Clone, Default)]
pub struct ResolvedMetadata {
    pub global: GlobalMetadata,
    pub databases: DatabaseMetadata,
    pub object_stores: ObjectStoreMetadata,
}

/// Resolves IndexedDB metadata from a logical view.
pub struct MetadataResolver;

impl MetadataResolver {
    /// Run both resolution passes.
    pub fn resolve(view: &LogicalView) -> ResolvedMetadata {
        let global = GlobalMetadata::resolve(view);
        let ids: Vec<u64> = global.database_ids().collect();

        ResolvedMetadata {
            databases: DatabaseMetadata::resolve(view, &ids),
            object_stores: ObjectStoreMetadata::resolve(view, &ids),
            global,
        }
    }
}

impl ResolvedMetadata {
    /// Object stores whose name is in `interest`, ordered by database then store id.
    ///
    /// Store ids above a database's declared maximum are ignored.
    pub fn stores_of_interest(&self, interest: &[String]) -> Vec<ObjectStoreRef> {
        let mut stores = Vec::new();

        for db_id in self.global.database_ids() {
            let Some(max_store_id) = self.databases.maximum_object_store_id(db_id) else {
                tracing::debug!("database {} has no maximum object store id", db_id);
                continue;
            };

            let named = self
                .object_stores
                .store_names(db_id)
                .take_while(|(store_id, _)| *store_id <= max_store_id);
            for (store_id, name) in named {
                if store_id == 0 {
                    continue;
                }
                if interest.iter().any(|wanted| *wanted == name) {
                    stores.push(ObjectStoreRef {
                        database_id: db_id,
                        object_store_id: store_id,
                        name,
                    });
                }
            }
        }

        stores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::IndexedDbBuilder;

    fn interest() -> Vec<String> {
        vec!["conversations".to_string(), "replychains".to_string()]
    }

    #[test]
    fn test_resolves_databases_and_stores() {
        let mut builder = IndexedDbBuilder::new();
        builder.database(1, "Teams:conversation-manager");
        builder.object_store(1, 1, "conversations");
        builder.object_store(1, 2, "settings");
        builder.database(2, "Teams:replychain-manager");
        builder.object_store(2, 1, "replychains");

        let view = LogicalView::resolve(builder.into_records());
        let metadata = MetadataResolver::resolve(&view);

        assert_eq!(metadata.global.database_ids().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(metadata.global.databases[1].name, "Teams:replychain-manager");
        assert_eq!(metadata.databases.maximum_object_store_id(1), Some(2));
        assert_eq!(
            metadata.object_stores.store_name(1, 2).as_deref(),
            Some("settings")
        );

        let stores = metadata.stores_of_interest(&interest());
        assert_eq!(
            stores,
            vec![
                ObjectStoreRef {
                    database_id: 1,
                    object_store_id: 1,
                    name: "conversations".to_string()
                },
                ObjectStoreRef {
                    database_id: 2,
                    object_store_id: 1,
                    name: "replychains".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_reserved_database_ids_skipped() {
        let mut builder = IndexedDbBuilder::new();
        builder.database(0x80, "reserved");
        builder.object_store(0x80, 1, "conversations");

        let view = LogicalView::resolve(builder.into_records());
        let metadata = MetadataResolver::resolve(&view);

        assert!(metadata.global.databases.is_empty());
        assert!(metadata.stores_of_interest(&interest()).is_empty());
    }

    #[test]
    fn test_store_ids_above_maximum_ignored() {
        let mut builder = IndexedDbBuilder::new();
        builder.database(1, "db");
        builder.object_store(1, 1, "people");
        builder.object_store(1, 2, "conversations");
        builder.set_maximum_object_store_id(1, 1);

        let view = LogicalView::resolve(builder.into_records());
        let metadata = MetadataResolver::resolve(&view);
        assert!(metadata.stores_of_interest(&interest()).is_empty());
    }

    #[test]
    fn test_huge_maximum_store_id_only_visits_named_stores() {
        let mut builder = IndexedDbBuilder::new();
        builder.database(1, "db");
        builder.object_store(1, 3, "conversations");
        builder.object_store(1, 7, "replychains");
        builder.set_maximum_object_store_id(1, u64::MAX);

        let view = LogicalView::resolve(builder.into_records());
        let metadata = MetadataResolver::resolve(&view);
        assert_eq!(metadata.databases.maximum_object_store_id(1), Some(u64::MAX));

        let stores = metadata.stores_of_interest(&interest());
        let ids: Vec<u64> = stores.iter().map(|s| s.object_store_id).collect();
        assert_eq!(ids, vec![3, 7]);
    }

    #[test]
    fn test_latest_store_name_wins() {
        let mut builder = IndexedDbBuilder::new();
        builder.database(1, "db");
        builder.object_store(1, 1, "drafts");
        builder.rename_object_store(1, 1, "conversations");

        let view = LogicalView::resolve(builder.into_records());
        let metadata = MetadataResolver::resolve(&view);
        let stores = metadata.stores_of_interest(&interest());
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].name, "conversations");
    }

    #[test]
    fn test_store_records_in_key_order() {
        let mut builder = IndexedDbBuilder::new();
        builder.database(1, "db");
        builder.object_store(1, 1, "conversations");
        builder.put_raw(1, 1, b"b", b"second".to_vec());
        builder.put_raw(1, 1, b"a", b"first".to_vec());
        builder.put_raw(1, 1, b"c", Vec::new());

        let view = LogicalView::resolve(builder.into_records());
        let metadata = MetadataResolver::resolve(&view);
        let store = &metadata.stores_of_interest(&interest())[0];

        let values: Vec<&[u8]> = store.records(&view).map(|r| r.value.as_slice()).collect();
        assert_eq!(values, vec![b"first".as_slice(), b"second"]);
    }
}
