use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::filter::INPUT_DATE_FORMAT;
use crate::model::{AdvisoryRecord, AdvisorySummary};

const RECORD_EXT: &str = "json";
const MANIFEST_FILE: &str = "advisories.json";

/// Write stats returned after completion.
#[derive(Debug, Default)]
pub struct WriteStats {
    pub written: Vec<PathBuf>,
    pub failed: usize,
}

/// Create the output root up front; failure here is a configuration error.
pub fn ensure_output_root(root: &Path) -> Result<()> {
    fs::create_dir_all(root)
        .with_context(|| format!("Output root {:?} is not writable", root))
}

/// Replace path separators so a title can be used as a file name.
pub fn sanitize_title(title: &str) -> String {
    title.replace(['/', '\\'], "_")
}

/// `<root>/<YYYY-MM-DD>/<sanitized-title>-<index>.json`
pub fn record_path(root: &Path, record: &AdvisoryRecord, index: usize) -> PathBuf {
    let date = record
        .summary
        .publication_date
        .format(INPUT_DATE_FORMAT)
        .to_string();
    let name = format!("{}-{}.{}", sanitize_title(&record.summary.title), index, RECORD_EXT);
    root.join(date).join(name)
}

/// Write one JSON file per record, indexed by position in `records`.
///
/// Existing files are overwritten. A record that cannot be written is logged
/// and counted; the rest of the batch is still written.
pub fn write_records(root: &Path, records: &[AdvisoryRecord]) -> WriteStats {
    let mut stats = WriteStats::default();
    for (index, record) in records.iter().enumerate() {
        let path = record_path(root, record, index);
        match write_one(&path, record) {
            Ok(()) => stats.written.push(path),
            Err(e) => {
                warn!("Failed to write {:?}: {:#}", path, e);
                stats.failed += 1;
            }
        }
    }
    info!("Wrote {} records ({} failed) under {:?}", stats.written.len(), stats.failed, root);
    stats
}

fn write_one(path: &Path, record: &AdvisoryRecord) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let json = serde_json::to_string_pretty(record)?;
    fs::write(path, json)?;
    Ok(())
}

/// Write the filtered summaries of a run to `<root>/advisories.json`.
pub fn write_manifest(root: &Path, summaries: &[AdvisorySummary]) -> Result<PathBuf> {
    let path = root.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(summaries)?;
    fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(path)
}

// ── Tests ──
