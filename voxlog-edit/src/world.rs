//! World facade: one chunk log plus the edits pending against it.

use std::sync::Arc;

use anyhow::Result;
use voxlog_benchmark::BenchmarkMetrics;
use voxlog_record::{BlockType, WorldLayout, WorldPos};
use voxlog_storage::{ChunkLog, StoreConfig};

use crate::edit::EditBuffer;
use crate::merge::{MergeError, MergeReport, merge_into_log};

pub struct World {
    log: ChunkLog,
    buffer: EditBuffer,
    metrics: Arc<BenchmarkMetrics>,
}

fn summary(layout: &WorldLayout) -> String {
    format!("chunk_size={:?}, dim={:?}", layout.chunk_size(), layout.dim())
}

impl World {
    /// Generate a blank store and open it.
    pub fn create(config: StoreConfig, layout: WorldLayout) -> Result<Self> {
        let metrics = Arc::new(BenchmarkMetrics::new(summary(&layout)));
        let log = ChunkLog::generate_with_metrics(config, layout, Some(metrics.clone()))?;
        Ok(Self::from_log(log, metrics))
    }

    /// Open an existing store.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let log = ChunkLog::open(config)?;
        let metrics = Arc::new(BenchmarkMetrics::new(summary(log.layout())));
        Ok(Self::from_log(log, metrics))
    }

    fn from_log(log: ChunkLog, metrics: Arc<BenchmarkMetrics>) -> Self {
        let log = log.with_metrics(metrics.clone());
        let buffer = EditBuffer::new(*log.layout());
        Self {
            log,
            buffer,
            metrics,
        }
    }

    pub fn layout(&self) -> &WorldLayout {
        self.log.layout()
    }

    pub fn log(&self) -> &ChunkLog {
        &self.log
    }

    pub fn metrics(&self) -> &Arc<BenchmarkMetrics> {
        &self.metrics
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    /// Direct access for producers that work on the buffer.
    pub fn buffer_mut(&mut self) -> &mut EditBuffer {
        &mut self.buffer
    }

    pub fn pending_edits(&self) -> usize {
        self.buffer.len()
    }

    /// Enqueue a block change in world space. False when out of bounds.
    pub fn add_edit(&mut self, pos: WorldPos, block: BlockType) -> bool {
        self.buffer.add(pos, block)
    }

    /// Apply all pending edits in one pass over the log.
    ///
    /// Any pass that gets past the empty check consumes the buffer, whether
    /// it commits or not.
    pub fn try_evaluate(&mut self) -> Result<MergeReport, MergeError> {
        if self.buffer.is_empty() {
            self.metrics.record_noop_merge();
            log::warn!("Edit buffer is empty, nothing to evaluate");
            return Err(MergeError::Empty);
        }

        let prepared = self.buffer.take_prepared();
        let edits = prepared.remaining();
        match merge_into_log(&self.log, prepared) {
            Ok(report) => {
                self.metrics
                    .record_merge(report.elapsed, report.records_modified, report.edits_applied);
                log::info!(
                    "Merged {} edits into {} of {} chunks in {:.2?}",
                    report.edits_applied,
                    report.records_modified,
                    report.records_written,
                    report.elapsed
                );
                Ok(report)
            }
            Err(e) => {
                self.metrics.record_failed_merge();
                log::error!("Merge of {} edits failed, store left unchanged: {}", edits, e);
                Err(e)
            }
        }
    }

    /// Boolean form: true on commit, false on no-op or failure.
    pub fn evaluate(&mut self) -> bool {
        self.try_evaluate().is_ok()
    }
}
