//! The on-disk chunk log of one world.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use voxlog_benchmark::BenchmarkMetrics;
use voxlog_record::{CanonicalOrder, ChunkPos, ChunkRecord, WorldLayout};

use crate::config::{StoreConfig, WorldMeta};
use crate::cursor::{RecordReader, ScratchWriter};
use crate::{RecordSink, RecordSource};

/// Handle to a generated chunk log and its layout.
pub struct ChunkLog {
    config: StoreConfig,
    meta: WorldMeta,
    metrics: Option<Arc<BenchmarkMetrics>>,
}

impl ChunkLog {
    /// Bulk-initialize a store with one blank record per chunk, in canonical order.
    ///
    /// Refuses to run over an existing log; call [`ChunkLog::wipe`] first.
    pub fn generate(config: StoreConfig, layout: WorldLayout) -> Result<Self> {
        Self::generate_with_metrics(config, layout, None)
    }

    pub fn generate_with_metrics(
        config: StoreConfig,
        layout: WorldLayout,
        metrics: Option<Arc<BenchmarkMetrics>>,
    ) -> Result<Self> {
        let region = config.region_path();
        if region.exists() {
            bail!(
                "chunk log {} already exists; wipe it before generating",
                region.display()
            );
        }
        fs::create_dir_all(&config.dir)
            .with_context(|| format!("Failed to create {}", config.dir.display()))?;

        let meta = WorldMeta::new(layout);
        meta.save(&config.meta_path())?;

        let log = Self {
            config,
            meta,
            metrics,
        };

        let start = Instant::now();
        let mut scratch = log.scratch()?;
        for pos in layout.canonical_positions() {
            scratch.write_record(&ChunkRecord::blank(pos, &layout))?;
        }
        let written = scratch.written();
        log.commit(scratch)?;

        if let Some(m) = &log.metrics {
            m.record_generation(written as usize, start.elapsed());
        }
        log::info!(
            "Generated {} blank chunks ({:?} x {:?}) in {:.2?}",
            written,
            layout.dim(),
            layout.chunk_size(),
            start.elapsed()
        );
        Ok(log)
    }

    /// Open an existing store.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let meta = WorldMeta::load(&config.meta_path())?;
        let region = config.region_path();
        if !region.is_file() {
            bail!("chunk log {} not found", region.display());
        }
        Ok(Self {
            config,
            meta,
            metrics: None,
        })
    }

    /// Remove the log, any scratch file and the metadata.
    pub fn wipe(config: &StoreConfig) -> Result<()> {
        for path in [config.region_path(), config.scratch_path(), config.meta_path()] {
            remove_if_exists(&path)?;
        }
        log::info!("Wiped chunk log in {}", config.dir.display());
        Ok(())
    }

    pub fn with_metrics(mut self, metrics: Arc<BenchmarkMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn layout(&self) -> &WorldLayout {
        &self.meta.layout
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn meta(&self) -> &WorldMeta {
        &self.meta
    }

    /// Number of records a complete log holds.
    pub fn expected_records(&self) -> u64 {
        self.meta.record_count
    }

    fn scratch(&self) -> Result<ScratchWriter> {
        ScratchWriter::create(
            &self.config.scratch_path(),
            self.config.compression,
            self.metrics.clone(),
        )
    }

    /// Sequential reader over the current log plus a fresh scratch destination.
    pub fn open_for_merge(&self) -> Result<(RecordReader, ScratchWriter)> {
        let reader = RecordReader::open(&self.config.region_path(), self.metrics.clone())?;
        let writer = self.scratch()?;
        Ok((reader, writer))
    }

    /// Replace the log with a fully written scratch file.
    ///
    /// The rename is the only step that touches the original log, so a failure
    /// anywhere before it leaves the log as it was.
    pub fn commit(&self, mut scratch: ScratchWriter) -> Result<()> {
        if scratch.written() != self.expected_records() {
            bail!(
                "refusing to commit scratch with {} records (expected {})",
                scratch.written(),
                self.expected_records()
            );
        }
        scratch.finish()?;
        let region = self.config.region_path();
        fs::rename(scratch.path(), &region).with_context(|| {
            format!(
                "Failed to replace {} with {}",
                region.display(),
                scratch.path().display()
            )
        })?;
        scratch.mark_committed();
        sync_dir(&self.config.dir);
        Ok(())
    }

    /// Sequential reader over the log, for inspection.
    pub fn reader(&self) -> Result<RecordReader> {
        RecordReader::open(&self.config.region_path(), None)
    }

    /// Iterate over every record in file order.
    pub fn records(&self) -> Result<Records> {
        Ok(Records {
            reader: self.reader()?,
        })
    }

    /// Scan for the record at `pos`. Stops as soon as the stream passes it.
    pub fn find(&self, pos: ChunkPos) -> Result<Option<ChunkRecord>> {
        if !self.layout().contains_chunk(pos) {
            return Ok(None);
        }
        let mut reader = self.reader()?;
        while let Some(record) = reader.next_record()? {
            match CanonicalOrder::cmp(&record.pos, &pos) {
                std::cmp::Ordering::Less => continue,
                std::cmp::Ordering::Equal => return Ok(Some(record)),
                std::cmp::Ordering::Greater => return Ok(None),
            }
        }
        Ok(None)
    }

    /// Raw bytes of the log file.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        let path = self.config.region_path();
        fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Check the log against its layout: order, uniqueness, sizes and count.
    pub fn verify(&self) -> Result<VerifyReport> {
        let layout = *self.layout();
        let mut report = VerifyReport {
            records: 0,
            expected: self.expected_records(),
            modified: 0,
            problems: Vec::new(),
        };
        let mut expected_positions = layout.canonical_positions();
        let mut reader = self.reader()?;
        loop {
            let record = match reader.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(e) => {
                    report.problems.push(format!("{:#}", e));
                    break;
                }
            };
            match expected_positions.next() {
                Some(pos) if pos == record.pos => {}
                Some(pos) => report.problems.push(format!(
                    "record #{} is chunk {} but canonical order expects {}",
                    report.records, record.pos, pos
                )),
                None => report.problems.push(format!(
                    "record #{} (chunk {}) is beyond the expected {} records",
                    report.records, record.pos, report.expected
                )),
            }
            if record.size() != layout.chunk_size() {
                report.problems.push(format!(
                    "chunk {} has size {:?}, layout says {:?}",
                    record.pos,
                    record.size(),
                    layout.chunk_size()
                ));
            }
            if record.non_air_count() > 0 {
                report.modified += 1;
            }
            report.records += 1;
        }
        if report.records < report.expected {
            report.problems.push(format!(
                "log ends after {} of {} records",
                report.records, report.expected
            ));
        }
        Ok(report)
    }
}

/// Iterator over the records of a log.
pub struct Records {
    reader: RecordReader,
}

impl Iterator for Records {
    type Item = Result<ChunkRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_record().transpose()
    }
}

/// Outcome of [`ChunkLog::verify`].
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub records: u64,
    pub expected: u64,
    /// Records holding at least one non-air block.
    pub modified: u64,
    pub problems: Vec<String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

// Best effort: persist the rename itself.
fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir) {
        if let Err(e) = handle.sync_all() {
            log::debug!("Directory sync of {} failed: {}", dir.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxlog_record::{BlockType, LocalPos};

    fn layout() -> WorldLayout {
        WorldLayout::cubic(16, [2, 1, 2]).unwrap()
    }

    #[test]
    fn test_generate_canonical_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = ChunkLog::generate(StoreConfig::new(dir.path()), layout()).unwrap();
        let positions: Vec<_> = log.records().unwrap().map(|r| r.unwrap().pos).collect();
        assert_eq!(
            positions,
            vec![
                ChunkPos::new(0, 0, 0),
                ChunkPos::new(0, 0, 1),
                ChunkPos::new(1, 0, 0),
                ChunkPos::new(1, 0, 1),
            ]
        );
        for pair in positions.windows(2) {
            assert!(CanonicalOrder::is_before(&pair[0], &pair[1]));
        }
        assert!(!StoreConfig::new(dir.path()).scratch_path().exists());
    }

    #[test]
    fn test_generate_refuses_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StoreConfig::new(dir.path());
        ChunkLog::generate(cfg.clone(), layout()).unwrap();
        let before = fs::read(cfg.region_path()).unwrap();
        assert!(ChunkLog::generate(cfg.clone(), layout()).is_err());
        assert_eq!(fs::read(cfg.region_path()).unwrap(), before);

        ChunkLog::wipe(&cfg).unwrap();
        assert!(!cfg.region_path().exists());
        ChunkLog::generate(cfg, layout()).unwrap();
    }

    #[test]
    fn test_open_reads_layout() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StoreConfig::new(dir.path());
        ChunkLog::generate(cfg.clone(), layout()).unwrap();
        let log = ChunkLog::open(cfg).unwrap();
        assert_eq!(*log.layout(), layout());
        assert_eq!(log.expected_records(), 4);
    }

    #[test]
    fn test_open_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ChunkLog::open(StoreConfig::new(dir.path())).is_err());
    }

    #[test]
    fn test_commit_replaces_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = ChunkLog::generate(StoreConfig::new(dir.path()), layout()).unwrap();
        let (mut reader, mut writer) = log.open_for_merge().unwrap();
        while let Some(mut record) = reader.next_record().unwrap() {
            record.set(LocalPos::new(0, 0, 0), BlockType::STONE).unwrap();
            writer.write_record(&record).unwrap();
        }
        drop(reader);
        log.commit(writer).unwrap();

        let report = log.verify().unwrap();
        assert!(report.is_ok(), "{:?}", report.problems);
        assert_eq!(report.modified, 4);
        assert!(!log.config().scratch_path().exists());
    }

    #[test]
    fn test_commit_refuses_short_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let log = ChunkLog::generate(StoreConfig::new(dir.path()), layout()).unwrap();
        let before = log.read_bytes().unwrap();
        let (mut reader, mut writer) = log.open_for_merge().unwrap();
        let first = reader.next_record().unwrap().unwrap();
        writer.write_record(&first).unwrap();
        assert!(log.commit(writer).is_err());
        assert_eq!(log.read_bytes().unwrap(), before);
        assert!(!log.config().scratch_path().exists());
    }

    #[test]
    fn test_find() {
        let dir = tempfile::tempdir().unwrap();
        let log = ChunkLog::generate(StoreConfig::new(dir.path()), layout()).unwrap();
        let found = log.find(ChunkPos::new(1, 0, 0)).unwrap().unwrap();
        assert_eq!(found.pos, ChunkPos::new(1, 0, 0));
        assert!(log.find(ChunkPos::new(0, 1, 0)).unwrap().is_none());
    }

    #[test]
    fn test_verify_detects_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StoreConfig::new(dir.path());
        let log = ChunkLog::generate(cfg.clone(), layout()).unwrap();
        let bytes = log.read_bytes().unwrap();
        // Drop the last frame plus a few bytes of the one before it.
        let mut sizes = Vec::new();
        let mut input = std::io::Cursor::new(bytes.clone());
        while let Some((_, size)) = voxlog_record::read_record_sized(&mut input).unwrap() {
            sizes.push(size);
        }
        let keep = sizes[..3].iter().sum::<usize>() - 3;
        fs::write(cfg.region_path(), &bytes[..keep]).unwrap();

        let report = log.verify().unwrap();
        assert!(!report.is_ok());
        assert_eq!(report.records, 2);
    }
}
