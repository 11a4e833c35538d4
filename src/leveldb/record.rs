//! Raw LevelDB records and last-writer-wins resolution.
//!
//! The same user key can appear many times across log files and compaction
//! generations. [`LogicalView`] keeps only the authoritative version of each key:
//! the one with the highest sequence number, and only if that version is live.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Whether a record stores a value or marks its key as deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Live,
    Deleted,
}

/// One key/value version as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub sequence: u64,
    pub state: KeyState,
}

impl RawRecord {
    /// Create a live record.
    pub fn live(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>, sequence: u64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            sequence,
            state: KeyState::Live,
        }
    }

    /// Create a deletion marker.
    pub fn deleted(key: impl Into<Vec<u8>>, sequence: u64) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
            sequence,
            state: KeyState::Deleted,
        }
    }

    pub fn is_live(&self) -> bool {
        self.state == KeyState::Live
    }
}

// =============================================================================
// LogicalView
// =============================================================================

/// The logical contents of a store after version resolution.
///
/// Keys are held in byte order, so prefix scans visit records deterministically.
#[derive(Debug, Default, Clone)]
pub struct LogicalView {
    live: BTreeMap<Vec<u8>, RawRecord>,
    superseded: usize,
    deleted: usize,
}

impl LogicalView {
    /// Resolve raw records into the latest live version per key.
    pub fn resolve<I>(records: I) -> Self
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut latest: BTreeMap<Vec<u8>, RawRecord> = BTreeMap::new();
        let mut superseded = 0;

        for record in records {
            match latest.entry(record.key.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(mut slot) => {
                    superseded += 1;
                    if slot.get().sequence < record.sequence {
                        slot.insert(record);
                    }
                }
            }
        }

        let before = latest.len();
        latest.retain(|_, record| record.is_live());
        let deleted = before - latest.len();

        Self {
            live: latest,
            superseded,
            deleted,
        }
    }

    /// The authoritative record for `key`, if the key is present.
    pub fn get(&self, key: &[u8]) -> Option<&RawRecord> {
        self.live.get(key)
    }

    /// All live records whose key starts with `prefix`, in key order.
    pub fn scan_prefix<'a>(&'a self, prefix: &[u8]) -> impl Iterator<Item = &'a RawRecord> + 'a {
        let prefix = prefix.to_vec();
        self.live
            .range::<[u8], _>((Bound::Included(prefix.as_slice()), Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(&prefix))
            .map(|(_, record)| record)
    }

    /// Iterate every live record in key order.
    pub fn iter(&self) -> impl Iterator<Item = &RawRecord> {
        self.live.values()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Number of record versions discarded because a newer or equal version existed.
    pub fn superseded_count(&self) -> usize {
        self.superseded
    }

    /// Number of keys whose newest version is a deletion.
    pub fn deleted_count(&self) -> usize {
        self.deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_sequence_wins() {
        let view = LogicalView::resolve(vec![
            RawRecord::live(b"k".to_vec(), b"new".to_vec(), 9),
            RawRecord::live(b"k".to_vec(), b"old".to_vec(), 3),
        ]);

        assert_eq!(view.len(), 1);
        assert_eq!(view.get(b"k").unwrap().value, b"new");
        assert_eq!(view.superseded_count(), 1);
    }

    #[test]
    fn test_order_of_arrival_does_not_matter() {
        let view = LogicalView::resolve(vec![
            RawRecord::live(b"k".to_vec(), b"old".to_vec(), 3),
            RawRecord::live(b"k".to_vec(), b"new".to_vec(), 9),
        ]);
        assert_eq!(view.get(b"k").unwrap().value, b"new");
    }

    #[test]
    fn test_newest_deletion_removes_key() {
        let view = LogicalView::resolve(vec![
            RawRecord::live(b"k".to_vec(), b"value".to_vec(), 3),
            RawRecord::deleted(b"k".to_vec(), 4),
            RawRecord::live(b"other".to_vec(), b"x".to_vec(), 1),
        ]);

        assert!(view.get(b"k").is_none());
        assert_eq!(view.len(), 1);
        assert_eq!(view.deleted_count(), 1);
    }

    #[test]
    fn test_older_deletion_is_ignored() {
        let view = LogicalView::resolve(vec![
            RawRecord::deleted(b"k".to_vec(), 2),
            RawRecord::live(b"k".to_vec(), b"value".to_vec(), 5),
        ]);
        assert_eq!(view.get(b"k").unwrap().value, b"value");
    }

    #[test]
    fn test_scan_prefix() {
        let view = LogicalView::resolve(vec![
            RawRecord::live(vec![0, 1, 2], b"a".to_vec(), 1),
            RawRecord::live(vec![0, 1, 3], b"b".to_vec(), 2),
            RawRecord::live(vec![0, 2, 0], b"c".to_vec(), 3),
            RawRecord::live(vec![0, 1], b"d".to_vec(), 4),
        ]);

        let values: Vec<&[u8]> = view
            .scan_prefix(&[0, 1])
            .map(|r| r.value.as_slice())
            .collect();
        assert_eq!(values, vec![b"d".as_slice(), b"a", b"b"]);

        assert_eq!(view.scan_prefix(&[9]).count(), 0);
    }
}
