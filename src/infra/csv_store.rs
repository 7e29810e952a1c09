use crate::constants::{LINK_COLUMN, REQUIRED_KEYS};
use crate::error::Result;
use crate::types::EventRecord;
use crate::validation::DedupSet;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub type Row = BTreeMap<String, String>;

/// Reads every row of a CSV file keyed by header name. A missing or
/// unreadable file is logged and yields no rows.
pub fn read_rows(path: &Path) -> Vec<Row> {
    match try_read_rows(path) {
        Ok(rows) => rows,
        Err(e) => {
            error!("❌ Could not read {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

fn try_read_rows(path: &Path) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn read_headers(path: &Path) -> Option<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).ok()?;
    let headers = reader.headers().ok()?;
    Some(headers.iter().map(str::to_string).collect())
}

/// Non-blank `event_link` cells, in file order.
pub fn read_links(path: &Path) -> Vec<String> {
    read_rows(path)
        .into_iter()
        .filter_map(|mut row| row.remove(LINK_COLUMN))
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty())
        .collect()
}

/// Complete records from a detail CSV. Rows that no longer validate are
/// skipped with a warning.
pub fn read_records(path: &Path) -> Vec<EventRecord> {
    read_rows(path)
        .iter()
        .enumerate()
        .filter_map(|(i, row)| match EventRecord::from_row(row) {
            Ok(record) => Some(record),
            Err(missing) => {
                warn!("⚠️ Skipping row {} of {}: {} incomplete", i + 1, path.display(), missing.len());
                None
            }
        })
        .collect()
}

pub fn write_links(path: &Path, links: &[String]) -> Result<()> {
    create_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([LINK_COLUMN])?;
    for link in links {
        writer.write_record([link.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Overwrites `path` with a header and one row per record.
pub fn write_records(path: &Path, records: &[EventRecord]) -> Result<()> {
    create_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(REQUIRED_KEYS)?;
    for record in records {
        writer.write_record(record.csv_row())?;
    }
    writer.flush()?;
    Ok(())
}

/// Appends records, writing the header only when the file is new or empty.
pub fn append_records(path: &Path, records: &[EventRecord]) -> Result<()> {
    create_parent(path)?;
    let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::Writer::from_writer(file);
    if needs_header {
        writer.write_record(REQUIRED_KEYS)?;
    }
    for record in records {
        writer.write_record(record.csv_row())?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub files_read: usize,
    pub rows_written: usize,
    pub duplicates_dropped: usize,
}

/// Concatenates `inputs` into `output`. Columns come from the first readable
/// input; with `dedup_key` set, rows whose value in that column was already
/// seen are dropped.
pub fn merge_csv_files(
    inputs: &[PathBuf],
    output: &Path,
    dedup_key: Option<&str>,
) -> Result<MergeSummary> {
    let headers = match inputs.iter().find_map(|p| read_headers(p)) {
        Some(headers) => headers,
        None => {
            warn!("⚠️ None of the {} merge inputs could be read", inputs.len());
            return Ok(MergeSummary::default());
        }
    };

    let mut summary = MergeSummary::default();
    let mut seen = DedupSet::new();
    create_parent(output)?;
    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record(&headers)?;

    for input in inputs {
        let rows = read_rows(input);
        if rows.is_empty() {
            continue;
        }
        summary.files_read += 1;
        for row in rows {
            if let Some(key) = dedup_key {
                let value = row.get(key).map(String::as_str).unwrap_or("");
                if seen.is_duplicate(value) {
                    summary.duplicates_dropped += 1;
                    continue;
                }
                seen.insert(value);
            }
            let cells: Vec<&str> = headers
                .iter()
                .map(|h| row.get(h).map(String::as_str).unwrap_or(""))
                .collect();
            writer.write_record(&cells)?;
            summary.rows_written += 1;
        }
    }
    writer.flush()?;

    info!(
        "🧩 Merged {} rows from {} files into {} ({} duplicates dropped)",
        summary.rows_written,
        summary.files_read,
        output.display(),
        summary.duplicates_dropped
    );
    Ok(summary)
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(n: u32) -> EventRecord {
        EventRecord {
            title: format!("Show {n}"),
            venue: "Comedy Bar".into(),
            summary: "Stand-up, sketch, \"improv\"".into(),
            address: "945 Bloor St W, Toronto".into(),
            email: "Not provided".into(),
            city: "Toronto".into(),
            province: "Ontario".into(),
            producers: "Comedy Bar".into(),
            event_link: format!("https://www.eventbrite.ca/e/show-{n}"),
            date: "2025-11-01".into(),
            price: None,
            capacity: None,
            duration: None,
            performers: None,
            age_restriction: None,
        }
    }

    #[test]
    fn records_survive_a_write_read_cycle() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("details.csv");
        let records = vec![record(1), record(2)];

        write_records(&path, &records).unwrap();
        assert_eq!(read_records(&path), records);
    }

    #[test]
    fn append_writes_header_once() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/details.csv");

        append_records(&path, &[record(1)]).unwrap();
        append_records(&path, &[record(2), record(3)]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("title,venue").count(), 1);
        assert_eq!(read_records(&path).len(), 3);
    }

    #[test]
    fn links_skip_blank_cells() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("links.csv");
        fs::write(&path, "event_link\nhttp://x/1\n\n  \nhttp://x/2\n").unwrap();
        assert_eq!(read_links(&path), vec!["http://x/1", "http://x/2"]);

        let out = tmp.path().join("out.csv");
        write_links(&out, &read_links(&path)).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "event_link\nhttp://x/1\nhttp://x/2\n");
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(read_rows(&tmp.path().join("absent.csv")).is_empty());
    }

    #[test]
    fn merge_dedups_by_key() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.csv");
        let b = tmp.path().join("b.csv");
        write_records(&a, &[record(1), record(2)]).unwrap();
        let mut upper = record(2);
        upper.event_link = upper.event_link.to_uppercase();
        write_records(&b, &[upper, record(3)]).unwrap();

        let out = tmp.path().join("merged.csv");
        let summary = merge_csv_files(&[a, b], &out, Some("event_link")).unwrap();

        assert_eq!(summary, MergeSummary { files_read: 2, rows_written: 3, duplicates_dropped: 1 });
        let titles: Vec<String> = read_records(&out).into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["Show 1", "Show 2", "Show 3"]);
    }
}
