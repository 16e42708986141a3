//! Sequential cursors over log files.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use voxlog_benchmark::BenchmarkMetrics;
use voxlog_record::{ChunkRecord, Compression, encode_record, read_record_sized};

use crate::{RecordSink, RecordSource};

/// Buffered forward-only reader over a log file.
pub struct RecordReader {
    input: BufReader<File>,
    path: PathBuf,
    records: u64,
    metrics: Option<Arc<BenchmarkMetrics>>,
}

impl RecordReader {
    pub fn open(path: &Path, metrics: Option<Arc<BenchmarkMetrics>>) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open chunk log {}", path.display()))?;
        Ok(Self {
            input: BufReader::new(file),
            path: path.to_path_buf(),
            records: 0,
            metrics,
        })
    }

    /// Records returned so far.
    pub fn position(&self) -> u64 {
        self.records
    }
}

impl RecordSource for RecordReader {
    fn next_record(&mut self) -> Result<Option<ChunkRecord>> {
        let start = Instant::now();
        let next = read_record_sized(&mut self.input).with_context(|| {
            format!("Bad record #{} in {}", self.records, self.path.display())
        })?;
        Ok(next.map(|(record, bytes)| {
            self.records += 1;
            if let Some(m) = &self.metrics {
                m.record_read(bytes, start.elapsed());
            }
            record
        }))
    }
}

/// Writer for the scratch file a merge (or generation) builds.
///
/// The scratch file is removed on drop unless it was handed to
/// [`ScratchWriter::finish`] and then committed.
pub struct ScratchWriter {
    output: Option<BufWriter<File>>,
    path: PathBuf,
    compression: Compression,
    records: u64,
    metrics: Option<Arc<BenchmarkMetrics>>,
    keep: bool,
}

impl ScratchWriter {
    pub fn create(
        path: &Path,
        compression: Compression,
        metrics: Option<Arc<BenchmarkMetrics>>,
    ) -> Result<Self> {
        if path.exists() {
            log::warn!("Discarding stale scratch file {}", path.display());
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create scratch file {}", path.display()))?;
        Ok(Self {
            output: Some(BufWriter::new(file)),
            path: path.to_path_buf(),
            compression,
            records: 0,
            metrics,
            keep: false,
        })
    }

    /// Records written so far.
    pub fn written(&self) -> u64 {
        self.records
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and fsync. After this the file is complete on disk.
    pub(crate) fn finish(&mut self) -> Result<()> {
        let output = self
            .output
            .take()
            .context("scratch writer already finished")?;
        let file = output
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync {}", self.path.display()))?;
        Ok(())
    }

    /// Called once the scratch file has been renamed into place.
    pub(crate) fn mark_committed(&mut self) {
        self.keep = true;
    }
}

impl RecordSink for ScratchWriter {
    fn write_record(&mut self, record: &ChunkRecord) -> Result<()> {
        let start = Instant::now();
        let frame = encode_record(record, self.compression)?;
        let output = self
            .output
            .as_mut()
            .context("write to finished scratch file")?;
        output
            .write_all(&frame)
            .with_context(|| format!("Failed to write chunk {} to {}", record.pos, self.path.display()))?;
        self.records += 1;
        if let Some(m) = &self.metrics {
            m.record_write(frame.len(), start.elapsed());
        }
        Ok(())
    }
}

impl Drop for ScratchWriter {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        // Close before unlinking.
        self.output.take();
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove scratch file {}: {}", self.path.display(), e);
            }
        } else {
            log::debug!("Removed uncommitted scratch file {}", self.path.display());
        }
    }
}
