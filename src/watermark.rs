use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::WatermarkError;

#[derive(Debug, Serialize, Deserialize)]
struct WatermarkRecord {
    #[serde(rename = "lastSlot")]
    last_slot: u64,
}

/// Durable store for the single progress watermark: the highest slot fully
/// processed or confirmed permanently absent.
///
/// The store has no independent authority; the monitor loop reads it once at
/// startup to seed its in-memory value and writes it after every advance.
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restore the persisted watermark. Absence or corruption is not fatal:
    /// the caller falls back to its startup policy.
    pub fn load(&self) -> Option<u64> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no watermark file at {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("failed to read watermark file {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<WatermarkRecord>(&content) {
            Ok(record) => Some(record.last_slot),
            Err(e) => {
                warn!(
                    "corrupt watermark file {}, starting fresh: {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    /// Persist the watermark. Writes go through a sibling temp file and a
    /// rename so a crash mid-write cannot leave a torn record.
    pub fn save(&self, slot: u64) -> Result<(), WatermarkError> {
        let content = serde_json::to_string(&WatermarkRecord { last_slot: slot })?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
