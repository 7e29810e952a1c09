use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Resume point for the detail phase, persisted next to its output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub start_index: usize,
    /// First link index not yet covered by a checkpoint.
    pub next_index: usize,
    pub end_index: usize,
    pub total_links: usize,
    /// Links whose batch never ran. Resumed runs retry them first.
    #[serde(default)]
    pub failed_indices: BTreeSet<usize>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    pub fn new(
        input_path: PathBuf,
        output_path: PathBuf,
        start_index: usize,
        end_index: usize,
        total_links: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            input_path,
            output_path,
            start_index,
            next_index: start_index,
            end_index,
            total_links,
            failed_indices: BTreeSet::new(),
            started_at: now,
            updated_at: now,
        }
    }

    pub fn advance_to(&mut self, next_index: usize) {
        self.next_index = next_index;
        self.updated_at = Utc::now();
    }

    /// Records the outcome of one batch covering `indices`.
    pub fn record_batch(&mut self, indices: &[usize], failed: bool) {
        for &index in indices {
            if failed {
                self.failed_indices.insert(index);
            } else {
                self.failed_indices.remove(&index);
            }
            if index >= self.next_index && index < self.end_index {
                self.next_index = index + 1;
            }
        }
        self.updated_at = Utc::now();
    }

    /// Shrinks the window to a link file of `link_count` entries.
    pub fn clamp_to(&mut self, link_count: usize) {
        self.end_index = self.end_index.min(link_count);
        self.next_index = self.next_index.min(self.end_index);
        let end = self.end_index;
        self.failed_indices.retain(|&i| i < end);
    }

    /// Failed links first, then the rest of the window.
    pub fn pending_indices(&self) -> Vec<usize> {
        self.failed_indices
            .iter()
            .copied()
            .chain(self.next_index..self.end_index)
            .collect()
    }

    /// Links in the window.
    pub fn window_len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn remaining(&self) -> usize {
        self.end_index.saturating_sub(self.next_index) + self.failed_indices.len()
    }

    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes to a sibling temp file and renames it into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
