use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::state::{Population, StateLayout, count_lines, load_decisions, load_processed_ids};
use crate::util::now_utc_string;

pub fn run(args: StatusArgs) -> Result<()> {
    let layout = StateLayout::new(&args.root);

    info!(
        root = %layout.root().display(),
        checked_at = %now_utc_string(),
        "status requested"
    );

    for population in [Population::Scraped, Population::Imported] {
        let path = layout.decisions_path(population);
        if path.exists() {
            let decisions = load_decisions(&path)?;
            info!(
                population = population.as_str(),
                path = %path.display(),
                whitelisted = decisions.whitelist().len(),
                blacklisted = decisions.blacklist().len(),
                "stored decisions"
            );
        } else {
            warn!(
                population = population.as_str(),
                path = %path.display(),
                "stored decisions missing"
            );
        }
    }

    for population in [Population::Scraped, Population::Imported, Population::Master] {
        let whitelist_path = layout.whitelist_path(population);
        let blacklist_path = layout.blacklist_path(population);
        if !whitelist_path.exists() && !blacklist_path.exists() {
            warn!(population = population.as_str(), "exported lists missing");
            continue;
        }

        info!(
            population = population.as_str(),
            whitelist_rows = count_lines(&whitelist_path)?,
            blacklist_rows = count_lines(&blacklist_path)?,
            "exported lists"
        );
    }

    let processed_path = layout.processed_ids_path();
    if processed_path.exists() {
        info!(
            path = %processed_path.display(),
            processed_ids = load_processed_ids(&processed_path)?.len(),
            "processed-id log"
        );
    } else {
        warn!(path = %processed_path.display(), "processed-id log missing");
    }

    let report_path = layout.report_path();
    if !report_path.exists() {
        warn!(path = %report_path.display(), "report missing");
    }

    Ok(())
}
