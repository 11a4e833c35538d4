//! Reading every record from a LevelDB directory.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::{LevelDbError, Result};
use super::log_file::read_log;
use super::record::RawRecord;
use super::table_file::read_table;

/// Kind of data file found in the store directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataFileKind {
    Log,
    Table,
}

/// A data file with its file number.
#[derive(Debug, Clone)]
struct DataFile {
    number: u64,
    kind: DataFileKind,
    path: PathBuf,
}

/// Counters describing one pass over a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Data files parsed.
    pub files_read: usize,
    /// Data files that could not be opened or parsed at all.
    pub files_skipped: usize,
    /// Raw records produced, including deletions and superseded versions.
    pub records: usize,
    /// Blocks, chunks, batches and entries skipped as malformed.
    pub corrupt_entries: usize,
}

/// Every raw record in a store plus read statistics.
#[derive(Debug, Clone, Default)]
pub struct LevelDbContents {
    pub records: Vec<RawRecord>,
    pub stats: ReadStats,
}

/// Read all records from the LevelDB directory at `path`.
///
/// Files are read in ascending file number. Records are produced eagerly; the
/// caller resolves versions with [`LogicalView`](super::LogicalView).
pub fn iterate_records(path: &Path) -> Result<LevelDbContents> {
    if !path.exists() {
        return Err(LevelDbError::StoreNotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(LevelDbError::CorruptStore {
            path: path.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let files = list_data_files(path)?;
    if files.is_empty() {
        return Err(LevelDbError::CorruptStore {
            path: path.to_path_buf(),
            message: "no log or table files".to_string(),
        });
    }

    let mut contents = LevelDbContents::default();

    for file in &files {
        let bytes = match fs::read(&file.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("skipping unreadable file {}: {}", file.path.display(), e);
                contents.stats.files_skipped += 1;
                continue;
            }
        };

        let (records, corrupt) = match file.kind {
            DataFileKind::Log => {
                let log = read_log(&bytes);
                (log.records, log.corrupt)
            }
            DataFileKind::Table => match read_table(&bytes) {
                Ok(table) => (table.records, table.corrupt),
                Err(e) => {
                    tracing::warn!("skipping table {}: {}", file.path.display(), e);
                    contents.stats.files_skipped += 1;
                    continue;
                }
            },
        };

        if corrupt > 0 {
            tracing::debug!(
                "{}: skipped {} malformed entries",
                file.path.display(),
                corrupt
            );
        }
        tracing::debug!(
            "read {} records from file {} ({:?})",
            records.len(),
            file.number,
            file.kind
        );

        contents.stats.files_read += 1;
        contents.stats.corrupt_entries += corrupt;
        contents.stats.records += records.len();
        contents.records.extend(records);
    }

    if contents.stats.files_read == 0 {
        return Err(LevelDbError::CorruptStore {
            path: path.to_path_buf(),
            message: format!("none of {} data files could be read", files.len()),
        });
    }

    Ok(contents)
}

/// List `.log`, `.ldb` and `.sst` files sorted by file number.
fn list_data_files(dir: &Path) -> Result<Vec<DataFile>> {
    let io_err = |source| LevelDbError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        if let Some((number, kind)) = classify(&path) {
            files.push(DataFile { number, kind, path });
        }
    }

    files.sort_by_key(|f| f.number);
    Ok(files)
}

fn classify(path: &Path) -> Option<(u64, DataFileKind)> {
    let stem = path.file_stem()?.to_str()?;
    let number: u64 = stem.parse().ok()?;
    let kind = match path.extension()?.to_str()? {
        "log" => DataFileKind::Log,
        "ldb" | "sst" => DataFileKind::Table,
        _ => return None,
    };
    Some((number, kind))
}
