use std::fs::OpenOptions;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::cli::ReportArgs;
use crate::model::{Collection, DedupeCounts};
use crate::state::{Population, StateLayout, WriteMode, count_lines, read_tsv, tsv_line};
use crate::util::{ensure_parent, report_timestamp};

pub fn run(args: ReportArgs) -> Result<()> {
    let layout = StateLayout::new(&args.root);
    let mode = if args.append {
        WriteMode::Append
    } else {
        WriteMode::Overwrite
    };

    let counts = build_report(&layout, mode, args.append)?;
    info!(
        path = %layout.report_path().display(),
        scraped_ids_retrieved = counts.scraped_ids_retrieved,
        retained_after_self_dedup = counts.retained_after_self_dedup,
        retained_after_cross_source = counts.retained_after_cross_source,
        "report written"
    );
    Ok(())
}

/// Counts the exported lists, writes the scraped records that survived both
/// passes and appends or overwrites the plain-text report.
pub fn build_report(layout: &StateLayout, mode: WriteMode, update: bool) -> Result<DedupeCounts> {
    let scraped_whitelisted = count_lines(&layout.whitelist_path(Population::Scraped))?;
    let scraped_blacklisted = count_lines(&layout.blacklist_path(Population::Scraped))?;

    let master_whitelist = layout.whitelist_path(Population::Master);
    let retained = if master_whitelist.exists() {
        read_tsv(&master_whitelist)?
            .into_iter()
            .filter(|record| record.collection == Collection::Scraped)
            .collect()
    } else {
        Vec::new()
    };

    let deduped_path = layout.deduped_scraped_path();
    ensure_parent(&deduped_path)?;
    let deduped = retained
        .iter()
        .map(tsv_line)
        .collect::<Vec<String>>()
        .join("\n");
    std::fs::write(&deduped_path, deduped)
        .with_context(|| format!("failed to write {}", deduped_path.display()))?;

    let counts = DedupeCounts {
        scraped_ids_retrieved: scraped_whitelisted + scraped_blacklisted,
        retained_after_self_dedup: scraped_whitelisted,
        retained_after_cross_source: retained.len(),
    };

    let report_path = layout.report_path();
    ensure_parent(&report_path)?;
    let mut options = OpenOptions::new();
    match mode {
        WriteMode::Overwrite => options.write(true).create(true).truncate(true),
        WriteMode::Append => options.append(true).create(true),
    };
    let mut out = options
        .open(&report_path)
        .with_context(|| format!("failed to open {}", report_path.display()))?;
    out.write_all(render_report(&counts, update, &report_timestamp(Local::now())).as_bytes())
        .with_context(|| format!("failed to write {}", report_path.display()))?;

    Ok(counts)
}

pub fn render_report(counts: &DedupeCounts, update: bool, timestamp: &str) -> String {
    let mut report = String::new();
    if update {
        report.push_str("Database update:\n");
    }
    report.push_str(&format!("Timestamp: {timestamp}\n"));
    report.push_str(&format!(
        "Unique scraped ids retrieved:\t\t{}\n",
        counts.scraped_ids_retrieved
    ));
    report.push_str(&format!(
        "Deduplicated against itself:\t\t{}\n",
        counts.retained_after_self_dedup
    ));
    report.push_str(&format!(
        "Deduplicated against imported:\t\t{}\n\n",
        counts.retained_after_cross_source
    ));
    report
}
