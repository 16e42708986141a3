//! In-memory record streams.
//!
//! Same contract as the file cursors; lets a merge run without touching disk.

use anyhow::Result;
use voxlog_record::{ChunkRecord, WorldLayout};

use crate::{RecordSink, RecordSource};

pub struct MemorySource {
    records: std::vec::IntoIter<ChunkRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<ChunkRecord>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }

    /// Blank records for every chunk of `layout`, in canonical order.
    pub fn blank(layout: &WorldLayout) -> Self {
        Self::new(
            layout
                .canonical_positions()
                .map(|pos| ChunkRecord::blank(pos, layout))
                .collect(),
        )
    }
}

impl RecordSource for MemorySource {
    fn next_record(&mut self) -> Result<Option<ChunkRecord>> {
        Ok(self.records.next())
    }
}

#[derive(Default)]
pub struct MemorySink {
    pub records: Vec<ChunkRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_records(self) -> Vec<ChunkRecord> {
        self.records
    }
}

impl RecordSink for MemorySink {
    fn write_record(&mut self, record: &ChunkRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
