use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

pub const RUN_STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub fn run_stamp() -> String {
    stamp_for(&Local::now())
}

pub fn stamp_for(time: &DateTime<Local>) -> String {
    time.format(RUN_STAMP_FORMAT).to_string()
}

/// `name` with `_<run stamp>` inserted before its extension.
pub fn append_timestamp(name: &str) -> String {
    append_stamp(name, &run_stamp())
}

fn append_stamp(name: &str, stamp: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{stamp}.{ext}"),
        _ => format!("{name}_{stamp}"),
    }
}

/// Most recently modified regular file in `dir` whose name starts with
/// `prefix` and ends with `suffix`. A missing directory yields `None`.
pub fn find_newest_file(dir: &Path, prefix: &str, suffix: &str) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {}: {}", dir.display(), e);
            return None;
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(prefix) || !name.ends_with(suffix) {
                return None;
            }
            let meta = entry.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, entry.path()))
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, path)| path)
}

/// Every file in `dir` whose name contains `date` and ends with `suffix`,
/// sorted by name.
pub fn find_files_by_date(dir: &Path, date: &str, suffix: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.contains(date) && name.ends_with(suffix)
            })
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect(),
        Err(_) => Vec::new(),
    };
    found.sort();
    found
}
