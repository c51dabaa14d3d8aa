use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{info, warn};

use crate::model::{Collection, Record};

/// Fields the crawler writes for one search result.
#[derive(Debug, Default, Deserialize)]
struct ScrapedResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: String,
    #[serde(default)]
    year: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    url: String,
}

/// Loads `<dir>/<query>/<id>.json` crawler output, one record per unique id.
pub fn load_scraped_records(dir: &Path) -> Result<Vec<Record>> {
    if !dir.exists() {
        warn!(path = %dir.display(), "scraped results directory missing");
        return Ok(Vec::new());
    }

    let mut by_id = BTreeMap::<String, Record>::new();
    for path in discover_result_files(dir)? {
        let id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        let raw = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let result: ScrapedResult = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        by_id.insert(
            id.clone(),
            Record {
                id,
                authors: result.authors,
                year: result.year,
                title: result.title,
                source: result.source,
                url: result.url,
                collection: Collection::Scraped,
            },
        );
    }

    info!(records = by_id.len(), path = %dir.display(), "loaded scraped records");
    Ok(by_id.into_values().collect())
}

fn discover_result_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let query_dir = entry.path();
        if !query_dir.is_dir() {
            continue;
        }

        let inner = fs::read_dir(&query_dir)
            .with_context(|| format!("failed to read {}", query_dir.display()))?;
        for entry in inner {
            let entry = entry
                .with_context(|| format!("failed to read entry in {}", query_dir.display()))?;
            let path = entry.path();
            let is_json = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false);
            if is_json && path.is_file() {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Loads the reference-manager export: `authors, year, title, source` per
/// tab-separated line. Ids are random since the export carries none.
pub fn load_imported_records(path: &Path) -> Result<Vec<Record>> {
    if !path.exists() {
        warn!(path = %path.display(), "imported records file missing");
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let records = parse_imported(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    info!(records = records.len(), path = %path.display(), "loaded imported records");
    Ok(records)
}

pub fn parse_imported(raw: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();

    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let cells = line.split('\t').collect::<Vec<&str>>();
        let [authors, year, title, source] = cells.as_slice() else {
            bail!("line {} has {} cells, expected 4", index + 1, cells.len());
        };

        records.push(Record {
            id: imported_id(),
            authors: authors.to_string(),
            year: year.to_string(),
            title: title.to_string(),
            source: source.to_string(),
            url: String::new(),
            collection: Collection::Imported,
        });
    }

    Ok(records)
}

fn imported_id() -> String {
    format!("imported-{}", rand::random::<u64>())
}
