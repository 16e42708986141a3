//! Chunk log store.
//!
//! Owns the ordered on-disk sequence of chunk records for one world:
//! - bulk generation of blank records in canonical order
//! - sequential read / scratch write cursors for a merge pass
//! - atomic replacement of the log by a fully written scratch file

use anyhow::Result;
use voxlog_record::ChunkRecord;

pub mod config;
pub mod cursor;
pub mod memory;
pub mod store;

pub use config::{StoreConfig, WorldMeta};
pub use cursor::{RecordReader, ScratchWriter};
pub use store::{ChunkLog, Records, VerifyReport};
pub use memory::{MemorySink, MemorySource};

/// Forward-only stream of chunk records.
pub trait RecordSource {
    /// Next record, or `None` at end-of-stream.
    fn next_record(&mut self) -> Result<Option<ChunkRecord>>;
}

/// Append-only destination for chunk records.
pub trait RecordSink {
    fn write_record(&mut self, record: &ChunkRecord) -> Result<()>;
}
