use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct BenchmarkMetrics {
    // Generation Stats
    pub total_chunks_generated: AtomicUsize,
    pub total_generation_time_us: AtomicU64,

    // Merge Stats
    pub total_merge_passes: AtomicUsize,
    pub total_failed_passes: AtomicUsize,
    pub total_noop_passes: AtomicUsize,
    pub total_merge_time_us: AtomicU64,
    pub max_merge_time_us: AtomicU64,

    // Record Stream
    pub total_records_read: AtomicUsize,
    pub total_records_written: AtomicUsize,
    pub total_records_modified: AtomicUsize,
    pub total_edits_applied: AtomicUsize,
    pub total_bytes_read: AtomicUsize,
    pub total_bytes_written: AtomicUsize,

    // Codec
    pub total_encode_us: AtomicU64,
    pub total_decode_us: AtomicU64,

    // Session
    pub start_time: Option<Instant>,
    pub config_summary: String,
}

impl BenchmarkMetrics {
    pub fn new(config_summary: String) -> Self {
        Self {
            start_time: Some(Instant::now()),
            config_summary,
            ..Default::default()
        }
    }

    pub fn record_generation(&self, chunks: usize, duration: Duration) {
        self.total_chunks_generated.fetch_add(chunks, Ordering::Relaxed);
        self.total_generation_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_merge(&self, duration: Duration, modified: usize, edits: usize) {
        self.total_merge_passes.fetch_add(1, Ordering::Relaxed);
        self.total_records_modified.fetch_add(modified, Ordering::Relaxed);
        self.total_edits_applied.fetch_add(edits, Ordering::Relaxed);
        let us = duration.as_micros() as u64;
        self.total_merge_time_us.fetch_add(us, Ordering::Relaxed);
        self.max_merge_time_us.fetch_max(us, Ordering::Relaxed);
    }

    pub fn record_failed_merge(&self) {
        self.total_failed_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_noop_merge(&self) {
        self.total_noop_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read(&self, bytes: usize, duration: Duration) {
        self.total_records_read.fetch_add(1, Ordering::Relaxed);
        self.total_bytes_read.fetch_add(bytes, Ordering::Relaxed);
        self.total_decode_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_write(&self, bytes: usize, duration: Duration) {
        self.total_records_written.fetch_add(1, Ordering::Relaxed);
        self.total_bytes_written.fetch_add(bytes, Ordering::Relaxed);
        self.total_encode_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn generate_report(&self) -> String {
        let uptime = self.start_time.unwrap_or_else(Instant::now).elapsed();
        let generated = self.total_chunks_generated.load(Ordering::Relaxed);
        let gen_time = self.total_generation_time_us.load(Ordering::Relaxed) as f64 / 1000.0; // ms

        let passes = self.total_merge_passes.load(Ordering::Relaxed);
        let failed = self.total_failed_passes.load(Ordering::Relaxed);
        let noop = self.total_noop_passes.load(Ordering::Relaxed);
        let merge_time = self.total_merge_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let merge_max = self.max_merge_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let merge_avg = if passes > 0 { merge_time / passes as f64 } else { 0.0 };

        let read = self.total_records_read.load(Ordering::Relaxed);
        let written = self.total_records_written.load(Ordering::Relaxed);
        let modified = self.total_records_modified.load(Ordering::Relaxed);
        let edits = self.total_edits_applied.load(Ordering::Relaxed);

        let decode_avg = if read > 0 {
            self.total_decode_us.load(Ordering::Relaxed) as f64 / 1000.0 / read as f64
        } else { 0.0 };
        let encode_avg = if written > 0 {
            self.total_encode_us.load(Ordering::Relaxed) as f64 / 1000.0 / written as f64
        } else { 0.0 };

        let mb_read = self.total_bytes_read.load(Ordering::Relaxed) as f64 / 1024.0 / 1024.0;
        let mb_written = self.total_bytes_written.load(Ordering::Relaxed) as f64 / 1024.0 / 1024.0;
        let throughput = if merge_time > 0.0 {
            (mb_read + mb_written) / (merge_time / 1000.0)
        } else { 0.0 };

        format!(
            "Voxlog Benchmark Report\n\
             =======================\n\
             Configuration: {}\n\
             Session Duration: {:.2?}\n\n\
             [Generation]\n\
             Chunks Generated: {}\n\
             Total Time: {:.2} ms\n\n\
             [Merge]\n\
             Passes: {} (failed: {}, no-op: {})\n\
             Avg Time: {:.2} ms/pass\n\
             Max Time: {:.2} ms\n\
             Edits Applied: {}\n\
             Records Modified: {}\n\n\
             [Record Stream]\n\
             Records Read: {} ({:.2} MB, {:.3} ms/record decode)\n\
             Records Written: {} ({:.2} MB, {:.3} ms/record encode)\n\
             Merge Throughput: {:.2} MB/s\n",
            self.config_summary,
            uptime,
            generated, gen_time,
            passes, failed, noop,
            merge_avg, merge_max,
            edits, modified,
            read, mb_read, decode_avg,
            written, mb_written, encode_avg,
            throughput
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = BenchmarkMetrics::new("test".to_string());
        metrics.record_merge(Duration::from_millis(3), 2, 5);
        metrics.record_merge(Duration::from_millis(7), 1, 1);
        metrics.record_failed_merge();
        metrics.record_write(100, Duration::from_micros(10));

        assert_eq!(metrics.total_merge_passes.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.total_edits_applied.load(Ordering::Relaxed), 6);
        assert_eq!(metrics.total_records_modified.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.max_merge_time_us.load(Ordering::Relaxed), 7000);
        assert_eq!(metrics.total_bytes_written.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn test_report_mentions_sections() {
        let metrics = BenchmarkMetrics::new("dim=2x1x2".to_string());
        metrics.record_generation(4, Duration::from_millis(1));
        let report = metrics.generate_report();
        assert!(report.contains("dim=2x1x2"));
        assert!(report.contains("Chunks Generated: 4"));
        assert!(report.contains("[Merge]"));
    }
}
