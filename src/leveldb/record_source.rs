//! Sources of raw LevelDB records.
//!
//! The [`RecordSource`] trait decouples the build pipeline from where records come
//! from: [`LevelDbDirectory`] reads an on-disk store, while
//! [`MemoryRecordSource`] serves a fixed record list.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::error::{LevelDbError, Result};
use super::reader::{iterate_records, LevelDbContents, ReadStats};
use super::record::RawRecord;

/// Something that can produce every raw record of a store.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human-readable location of the store.
    fn location(&self) -> String;

    /// Read all records. Called once per build.
    async fn read_records(&self) -> Result<LevelDbContents>;
}

// =============================================================================
// LevelDbDirectory
// =============================================================================

/// An on-disk LevelDB directory, opened read-only for each scan.
pub struct LevelDbDirectory {
    path: PathBuf,
}

impl LevelDbDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSource for LevelDbDirectory {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn read_records(&self) -> Result<LevelDbContents> {
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || iterate_records(&path))
            .await
            .map_err(|e| LevelDbError::CorruptStore {
                path: self.path.clone(),
                message: format!("reader task failed: {}", e),
            })?
    }
}

// =============================================================================
// MemoryRecordSource
// =============================================================================

/// A fixed set of records held in memory.
///
/// Counts how many times it has been scanned.
pub struct MemoryRecordSource {
    records: Vec<RawRecord>,
    scans: AtomicUsize,
}

impl MemoryRecordSource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records,
            scans: AtomicUsize::new(0),
        }
    }

    /// Number of times [`RecordSource::read_records`] has been called.
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    fn location(&self) -> String {
        "memory".to_string()
    }

    async fn read_records(&self) -> Result<LevelDbContents> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        Ok(LevelDbContents {
            records: self.records.clone(),
            stats: ReadStats {
                files_read: 1,
                records: self.records.len(),
                ..ReadStats::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_source_counts_scans() {
        let source =
            MemoryRecordSource::new(vec![RawRecord::live(b"k".to_vec(), b"v".to_vec(), 1)]);

        let contents = source.read_records().await.unwrap();
        assert_eq!(contents.records.len(), 1);
        assert_eq!(contents.stats.records, 1);

        source.read_records().await.unwrap();
        assert_eq!(source.scan_count(), 2);
    }

    #[tokio::test]
    async fn test_directory_source_missing() {
        let source = LevelDbDirectory::new("/nonexistent/leveldb");
        assert_eq!(source.location(), "/nonexistent/leveldb");

        let err = source.read_records().await.unwrap_err();
        assert!(matches!(err, LevelDbError::StoreNotFound(_)));
    }
}
