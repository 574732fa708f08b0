/*!
 * Resumable progress checkpoints.
 *
 * The runner saves its remaining backlog to a JSON file at regular
 * intervals so an interrupted run can pick up where it stopped. The
 * file is overwritten atomically on every save and deleted when the
 * run completes.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::stats::RunStats;

/// Default checkpoint filename in the working directory
pub const CHECKPOINT_FILENAME: &str = "overnight_progress.json";

/// Saved progress of an overnight run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressCheckpoint {
    /// When the checkpoint was written (ISO 8601)
    pub timestamp: String,
    /// Strings completed so far, per target language
    pub completed: HashMap<String, usize>,
    /// Source texts that fell back to their original text
    pub failed: Vec<String>,
    /// Backlog still to translate, per target language
    pub remaining: HashMap<String, Vec<String>>,
    /// Counters accumulated up to this checkpoint
    pub stats: RunStats,
}

impl ProgressCheckpoint {
    /// Create a checkpoint for the current moment
    pub fn new(
        completed: HashMap<String, usize>,
        failed: Vec<String>,
        remaining: HashMap<String, Vec<String>>,
        stats: RunStats,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            completed,
            failed,
            remaining,
            stats,
        }
    }

    /// Total strings left across all languages
    pub fn remaining_count(&self) -> usize {
        self.remaining.values().map(Vec::len).sum()
    }

    /// Write the checkpoint, replacing any previous one
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize progress checkpoint")?;

        // Write to a sibling temp file first so a crash never leaves a torn checkpoint
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write checkpoint: {:?}", tmp_path))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to replace checkpoint: {:?}", path))?;

        debug!(
            "Saved checkpoint with {} strings remaining",
            self.remaining_count()
        );
        Ok(())
    }

    /// Load a checkpoint if one exists
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read checkpoint: {:?}", path))?;
        let checkpoint: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse checkpoint: {:?}", path))?;

        info!(
            "Found checkpoint from {} with {} strings remaining",
            checkpoint.timestamp,
            checkpoint.remaining_count()
        );
        Ok(Some(checkpoint))
    }

    /// Delete the checkpoint file if it exists
    pub fn remove<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove checkpoint: {:?}", path))?;
            debug!("Removed checkpoint file");
        }
        Ok(())
    }
}
