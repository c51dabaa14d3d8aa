use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::dedupe::{DecisionSet, RecordMap};
use crate::model::{Collection, Record};
use crate::util::{ensure_parent, read_json, write_json_pretty};

pub const TSV_COLUMNS: [&str; 7] = ["id", "authors", "year", "title", "source", "url", "collection"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    Scraped,
    Imported,
    Master,
}

impl Population {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scraped => "scraped",
            Self::Imported => "imported",
            Self::Master => "master",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Overwrite,
    Append,
}

/// On-disk locations of everything a run reads back later.
#[derive(Debug, Clone)]
pub struct StateLayout {
    root: PathBuf,
}

impl StateLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn decisions_path(&self, population: Population) -> PathBuf {
        self.root
            .join("json")
            .join(format!("{}_decisions.json", population.as_str()))
    }

    pub fn whitelist_path(&self, population: Population) -> PathBuf {
        self.root
            .join("lists")
            .join(format!("{}_whitelist.tsv", population.as_str()))
    }

    pub fn blacklist_path(&self, population: Population) -> PathBuf {
        self.root
            .join("lists")
            .join(format!("{}_blacklist.tsv", population.as_str()))
    }

    pub fn processed_ids_path(&self) -> PathBuf {
        self.root.join("lists").join("processed_scraped_ids.txt")
    }

    pub fn deduped_scraped_path(&self) -> PathBuf {
        self.root.join("lists").join("deduped_scraped_records.tsv")
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join("report.txt")
    }
}

pub fn load_decisions(path: &Path) -> Result<DecisionSet> {
    let decisions: DecisionSet = read_json(path)?;
    if !decisions.is_disjoint() {
        bail!(
            "persisted decisions list an id as both unique and duplicate: {}",
            path.display()
        );
    }
    Ok(decisions)
}

pub fn save_decisions(path: &Path, decisions: &DecisionSet) -> Result<()> {
    write_json_pretty(path, decisions)
}

/// Ids of scraped records already handled by an earlier run. A missing log
/// counts as empty.
pub fn load_processed_ids(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        warn!(path = %path.display(), "processed-id log missing, treating every record as new");
        return Ok(HashSet::new());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect())
}

pub fn write_processed_ids<'a>(
    path: &Path,
    ids: impl IntoIterator<Item = &'a str>,
    mode: WriteMode,
) -> Result<()> {
    let mut out = open_for_write(path, mode)?;
    for id in ids {
        writeln!(out, "{id}").with_context(|| format!("failed to write {}", path.display()))?;
    }
    out.flush()
        .with_context(|| format!("failed to flush {}", path.display()))
}

/// Writes one record per line, every column followed by a tab. Tabs and line
/// breaks inside a cell are exported as spaces.
///
/// Appending skips ids already present in the file, so an empty list leaves
/// it untouched; overwriting with an empty list truncates it.
pub fn write_tsv(path: &Path, records: &RecordMap, mode: WriteMode) -> Result<()> {
    let existing = match mode {
        WriteMode::Append => read_tsv_ids(path)?,
        WriteMode::Overwrite => HashSet::new(),
    };
    let pending = records
        .values()
        .filter(|record| !existing.contains(&record.id))
        .collect::<Vec<&Record>>();
    if pending.is_empty() && mode == WriteMode::Append {
        return Ok(());
    }

    let mut out = open_for_write(path, mode)?;
    for record in pending {
        writeln!(out, "{}", tsv_line(record))
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    out.flush()
        .with_context(|| format!("failed to flush {}", path.display()))
}

pub fn tsv_line(record: &Record) -> String {
    let cells = [
        record.id.as_str(),
        record.authors.as_str(),
        record.year.as_str(),
        record.title.as_str(),
        record.source.as_str(),
        record.url.as_str(),
        record.collection.as_str(),
    ];

    let mut line = String::new();
    for (column, cell) in TSV_COLUMNS.iter().zip(cells) {
        let clean = sanitize_cell(cell);
        if clean != cell {
            warn!(
                id = %record.id,
                column = *column,
                "replaced tab or line break with a space in exported cell"
            );
        }
        line.push_str(&clean);
        line.push('\t');
    }
    line
}

pub fn parse_tsv_line(line: &str) -> Result<Record> {
    let cells = line.split('\t').collect::<Vec<&str>>();
    if cells.len() < TSV_COLUMNS.len() {
        bail!(
            "expected {} columns but found {}: {line}",
            TSV_COLUMNS.len(),
            cells.len()
        );
    }

    let collection = Collection::parse(cells[6])
        .with_context(|| format!("unknown collection `{}`", cells[6]))?;

    Ok(Record {
        id: cells[0].to_string(),
        authors: cells[1].to_string(),
        year: cells[2].to_string(),
        title: cells[3].to_string(),
        source: cells[4].to_string(),
        url: cells[5].to_string(),
        collection,
    })
}

pub fn read_tsv(path: &Path) -> Result<Vec<Record>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            parse_tsv_line(line)
                .with_context(|| format!("invalid row {} in {}", index + 1, path.display()))
        })
        .collect()
}

fn read_tsv_ids(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(raw
        .lines()
        .filter_map(|line| line.split('\t').next())
        .filter(|id| !id.trim().is_empty())
        .map(ToOwned::to_owned)
        .collect())
}

/// Non-empty lines in `path`; a missing file has none.
pub fn count_lines(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(raw.lines().filter(|line| !line.trim().is_empty()).count())
}

fn open_for_write(path: &Path, mode: WriteMode) -> Result<BufWriter<fs::File>> {
    ensure_parent(path)?;

    let mut options = OpenOptions::new();
    match mode {
        WriteMode::Overwrite => options.write(true).create(true).truncate(true),
        WriteMode::Append => options.append(true).create(true),
    };
    let file = options
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn sanitize_cell(cell: &str) -> String {
    cell.replace(['\t', '\r', '\n'], " ")
}
