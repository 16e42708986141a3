use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use voxlog_record::{Compression, FORMAT_VERSION, WorldLayout};

/// Where a world's log lives and how records are written.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub dir: PathBuf,
    pub region_file: String,
    pub scratch_suffix: String,
    pub compression: Compression,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("save"),
            region_file: "world.region".to_string(),
            scratch_suffix: ".tmp".to_string(),
            compression: Compression::Zlib,
        }
    }
}

impl StoreConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn region_path(&self) -> PathBuf {
        self.dir.join(&self.region_file)
    }

    pub fn scratch_path(&self) -> PathBuf {
        self.dir.join(format!("{}{}", self.region_file, self.scratch_suffix))
    }

    pub fn meta_path(&self) -> PathBuf {
        self.dir.join("world.json")
    }
}

/// Sidecar written next to the log so it is never read with the wrong layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldMeta {
    pub format_version: u8,
    pub layout: WorldLayout,
    pub record_count: u64,
}

impl WorldMeta {
    pub fn new(layout: WorldLayout) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            layout,
            record_count: layout.chunk_count(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read world metadata {}", path.display()))?;
        let meta: WorldMeta = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse world metadata {}", path.display()))?;
        meta.layout
            .validate()
            .with_context(|| format!("Invalid layout in {}", path.display()))?;
        if meta.format_version != FORMAT_VERSION {
            bail!(
                "world format version {} not supported (expected {})",
                meta.format_version,
                FORMAT_VERSION
            );
        }
        if meta.record_count != meta.layout.chunk_count() {
            bail!(
                "metadata record count {} disagrees with layout ({} chunks)",
                meta.record_count,
                meta.layout.chunk_count()
            );
        }
        Ok(meta)
    }

    /// Write via a temporary file and rename, like the log itself.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(self).context("Failed to serialize world metadata")?;
        fs::write(&tmp, text).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}
