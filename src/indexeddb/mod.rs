//! IndexedDB structure on top of a LevelDB logical view.
//!
//! [`KeyPrefix`] decodes the (database, object store, index) header of every key;
//! [`MetadataResolver`] uses it to find logical databases, their maximum object
//! store ids and the names of their stores, and selects the stores of interest.

mod key_prefix;
mod metadata;

pub use key_prefix::{
    decode_string_with_length, decode_utf16_be, encode_string_with_length, encode_utf16_be,
    KeyError, KeyPrefix, GLOBAL_DATABASE_NAME_TYPE, MAX_USER_DATABASE_ID,
    OBJECT_STORE_DATA_INDEX_ID, OBJECT_STORE_META_TYPE,
};
pub use metadata::{
    DatabaseId, DatabaseMetadata, DatabaseMetadataType, GlobalMetadata, MetadataResolver,
    ObjectStoreMetadata, ObjectStoreMetadataType, ObjectStoreRef, ResolvedMetadata,
};
