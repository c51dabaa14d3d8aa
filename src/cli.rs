use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{DEFAULT_CEILING, DEFAULT_NUM_PERM, DEFAULT_THRESHOLD};

#[derive(Parser, Debug)]
#[command(
    name = "citedupe",
    version,
    about = "Near-duplicate detection and adjudication for citation records"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Dedupe(DedupeArgs),
    Report(ReportArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DedupeArgs {
    /// Directory holding persisted decisions, exported lists and the report.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Crawler output; one `<id>.json` per record in per-query subdirectories.
    #[arg(long, default_value = "results")]
    pub scraped_dir: PathBuf,

    /// Tab-separated reference-manager export (authors, year, title, source).
    #[arg(long, default_value = "imported.tsv")]
    pub imported_file: PathBuf,

    #[arg(long, default_value_t = false)]
    pub dedupe_scraped: bool,

    #[arg(long, default_value_t = false)]
    pub dedupe_imported: bool,

    #[arg(long, default_value_t = false)]
    pub skip_cross_source: bool,

    /// Only cluster scraped records whose ids are not in the processed-id log.
    #[arg(long, default_value_t = false)]
    pub only_new: bool,

    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    #[arg(long, default_value_t = DEFAULT_CEILING)]
    pub ceiling: f64,

    #[arg(long, default_value_t = DEFAULT_NUM_PERM)]
    pub num_perm: usize,

    /// Truncate every population before clustering (development runs).
    #[arg(long)]
    pub max_records: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Append to the existing report instead of overwriting it.
    #[arg(long, default_value_t = false)]
    pub append: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}
