//! Reading harvested thread data from disk.
//!
//! The scraper writes documents shaped like
//! `{"results": [{"success": true, "data": {"thread_id": ..., "title": ..., "content": ...}}]}`.
//! A corpus path may name one such file or a directory of them (the full
//! harvest plus incremental nightly files). Directory entries are read in
//! sorted path order and a `thread_id` seen earlier wins over later copies.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use forumsage_core::error::{Error, Result};
use forumsage_core::types::ThreadRecord;

#[derive(Debug, Default, Deserialize)]
pub struct ScrapeResults {
    #[serde(default)]
    pub results: Vec<ScrapeEnvelope>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScrapeEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<ThreadRecord>,
}

pub fn load_records(path: &Path) -> Result<Vec<ThreadRecord>> {
    if !path.exists() {
        return Err(Error::NotFound(format!("corpus path {}", path.display())));
    }
    let files = if path.is_dir() { list_json_files(path) } else { vec![path.to_path_buf()] };

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for file in &files {
        let parsed = read_results(file)?;
        debug!(file = %file.display(), entries = parsed.results.len(), "read scrape file");
        for envelope in parsed.results {
            let Some(mut record) = envelope.data else {
                skipped += 1;
                continue;
            };
            if !record.thread_id.is_empty() && !seen.insert(record.thread_id.clone()) {
                skipped += 1;
                continue;
            }
            record.success = envelope.success;
            records.push(record);
        }
    }
    info!(
        path = %path.display(),
        files = files.len(),
        records = records.len(),
        skipped,
        "loaded thread corpus"
    );
    Ok(records)
}

fn read_results(file: &Path) -> Result<ScrapeResults> {
    let raw = fs::read_to_string(file)
        .map_err(|e| Error::CorpusLoad(format!("{}: {}", file.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| Error::CorpusLoad(format!("{}: {}", file.display(), e)))
}

fn list_json_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}
