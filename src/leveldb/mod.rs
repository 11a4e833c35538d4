//! Read-only access to LevelDB stores.
//!
//! ## Layers
//!
//! 1. **Files** - [`log_file`] reassembles write-ahead log chunks into write
//!    batches; [`table_file`] walks the index and data blocks of sorted tables.
//! 2. **Store** - [`iterate_records`] reads every data file of a directory into
//!    a flat list of [`RawRecord`]s.
//! 3. **Resolution** - [`LogicalView`] keeps the highest-sequence live version of
//!    each key.
//!
//! Malformed units inside readable files are skipped and counted in
//! [`ReadStats`]; only a store with no readable data is an error.

mod block;
mod error;
mod log_file;
mod reader;
mod record;
mod record_source;
mod table_file;

pub use block::{BlockEntry, BlockHandle};
pub use error::{FormatError, LevelDbError, Result};
pub use log_file::{parse_write_batch, read_log, LogContents, LOG_BLOCK_SIZE};
pub use reader::{iterate_records, LevelDbContents, ReadStats};
pub use record::{KeyState, LogicalView, RawRecord};
pub use record_source::{LevelDbDirectory, MemoryRecordSource, RecordSource};
pub use table_file::{read_table, TableContents, TABLE_MAGIC};
