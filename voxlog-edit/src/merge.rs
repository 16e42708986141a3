//! Single-pass merge of prepared edits into a chunk record stream.
//!
//! Both inputs are ordered by [`CanonicalOrder`]: records as they sit in the
//! log, edits after [`crate::EditBuffer::take_prepared`]. The engine walks them
//! in lock-step, copying untouched records through, applying all edits of a
//! chunk to its record, and finally draining the rest of the log. Memory use
//! is one record plus the edits; the log is read exactly once.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use thiserror::Error;
use voxlog_record::{CanonicalOrder, ChunkPos, ChunkRecord, WorldLayout};
use voxlog_storage::{ChunkLog, RecordSink, RecordSource};

use crate::edit::PreparedEdits;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("edit buffer is empty, nothing to merge")]
    Empty,
    #[error("edit targets chunk {pos}, which is not in the store")]
    MissingChunk { pos: ChunkPos },
    #[error("store ended after {found} of {expected} records")]
    Truncated { expected: u64, found: u64 },
    #[error("store holds more than the expected {expected} records")]
    ExcessRecords { expected: u64 },
    #[error("store is corrupt: {0}")]
    Corrupt(String),
    #[error("merge failed: {0:#}")]
    Io(anyhow::Error),
}

impl From<anyhow::Error> for MergeError {
    fn from(e: anyhow::Error) -> Self {
        MergeError::Io(e)
    }
}

impl MergeError {
    /// The "nothing to do" outcome, as opposed to a real failure.
    pub fn is_noop(&self) -> bool {
        matches!(self, MergeError::Empty)
    }

    /// The store disagrees with the layout or the edits.
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            MergeError::MissingChunk { .. }
                | MergeError::Truncated { .. }
                | MergeError::ExcessRecords { .. }
                | MergeError::Corrupt(_)
        )
    }
}

/// Summary of a successful pass.
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub records_written: u64,
    pub records_modified: usize,
    pub edits_applied: usize,
    /// Chunks that received edits, in canonical order.
    pub touched: Vec<ChunkPos>,
    pub elapsed: Duration,
}

/// Drives one merge pass over a source / sink pair.
pub struct MergeEngine<'a> {
    layout: &'a WorldLayout,
    expected: u64,
    read: u64,
    written: u64,
}

impl<'a> MergeEngine<'a> {
    pub fn new(layout: &'a WorldLayout) -> Self {
        Self {
            layout,
            expected: layout.chunk_count(),
            read: 0,
            written: 0,
        }
    }

    /// Next record from the source, checked against the chunk the layout puts
    /// at this file position. A later chunk of the layout means the expected
    /// one is missing; anything else is corruption.
    fn pull<S: RecordSource>(&mut self, source: &mut S) -> Result<Option<ChunkRecord>, MergeError> {
        let Some(record) = source.next_record()? else {
            return Ok(None);
        };
        let Some(expected) = self.layout.canonical_position(self.read) else {
            return Err(MergeError::ExcessRecords {
                expected: self.expected,
            });
        };
        if record.pos != expected {
            let skipped = self.layout.contains_chunk(record.pos)
                && CanonicalOrder::cmp(&record.pos, &expected) == Ordering::Greater;
            if skipped {
                return Err(MergeError::MissingChunk { pos: expected });
            }
            return Err(MergeError::Corrupt(format!(
                "record #{} is chunk {}, layout expects {}",
                self.read, record.pos, expected
            )));
        }
        if record.size() != self.layout.chunk_size() {
            return Err(MergeError::Corrupt(format!(
                "chunk {} has size {:?}, layout says {:?}",
                record.pos,
                record.size(),
                self.layout.chunk_size()
            )));
        }
        self.read += 1;
        Ok(Some(record))
    }

    fn push<K: RecordSink>(&mut self, sink: &mut K, record: &ChunkRecord) -> Result<(), MergeError> {
        sink.write_record(record)?;
        self.written += 1;
        Ok(())
    }

    /// End of stream while edits are still pending.
    fn exhausted(&self, pending: ChunkPos) -> MergeError {
        if self.written < self.expected {
            MergeError::Truncated {
                expected: self.expected,
                found: self.written,
            }
        } else {
            MergeError::MissingChunk { pos: pending }
        }
    }

    /// Stream `source` into `sink`, applying `edits`.
    ///
    /// The sink is only complete when this returns `Ok`; callers must not
    /// publish it otherwise.
    pub fn run<S: RecordSource, K: RecordSink>(
        mut self,
        source: &mut S,
        sink: &mut K,
        mut edits: PreparedEdits,
    ) -> Result<MergeReport, MergeError> {
        if edits.is_empty() {
            return Err(MergeError::Empty);
        }
        let start = Instant::now();
        let mut report = MergeReport::default();

        while let Some(target) = edits.next_chunk() {
            if !self.layout.contains_chunk(target) {
                return Err(MergeError::MissingChunk { pos: target });
            }

            // Copy records through until we reach the edit's chunk.
            let mut current = loop {
                let record = self.pull(source)?.ok_or_else(|| self.exhausted(target))?;
                match CanonicalOrder::cmp(&record.pos, &target) {
                    Ordering::Less => self.push(sink, &record)?,
                    Ordering::Equal => break record,
                    // The stream is ordered, so the chunk cannot come later.
                    Ordering::Greater => return Err(MergeError::MissingChunk { pos: target }),
                }
            };

            let batch = edits.take_for(target);
            for edit in batch {
                current
                    .set(edit.local, edit.block)
                    .map_err(|e| MergeError::Corrupt(format!("{:#}", e)))?;
            }
            log::debug!("Applied {} edits to chunk {}", batch.len(), target);
            report.edits_applied += batch.len();
            report.records_modified += 1;
            report.touched.push(target);

            self.push(sink, &current)?;
        }

        // No edits left: copy the tail unchanged.
        while self.written < self.expected {
            match self.pull(source)? {
                Some(record) => self.push(sink, &record)?,
                None => {
                    return Err(MergeError::Truncated {
                        expected: self.expected,
                        found: self.written,
                    });
                }
            }
        }
        if self.pull(source)?.is_some() {
            return Err(MergeError::ExcessRecords {
                expected: self.expected,
            });
        }

        report.records_written = self.written;
        report.elapsed = start.elapsed();
        Ok(report)
    }
}

/// Run a full pass against a chunk log and commit the result.
///
/// The original log is only replaced after every record has been written;
/// on any error the scratch file is discarded and the log is untouched.
pub fn merge_into_log(log: &ChunkLog, edits: PreparedEdits) -> Result<MergeReport, MergeError> {
    if edits.is_empty() {
        return Err(MergeError::Empty);
    }
    let (mut reader, mut writer) = log.open_for_merge()?;
    let mut report = MergeEngine::new(log.layout()).run(&mut reader, &mut writer, edits)?;
    drop(reader);

    let commit_start = Instant::now();
    log.commit(writer)?;
    report.elapsed += commit_start.elapsed();
    Ok(report)
}
