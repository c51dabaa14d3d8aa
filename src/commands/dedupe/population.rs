use anyhow::Result;
use tracing::info;

use crate::config::DedupeConfig;
use crate::dedupe::{DecisionSet, Prompter, identify_decisions};
use crate::model::Record;
use crate::state::{Population, StateLayout, load_decisions, save_decisions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StateAccess {
    /// Reuse stored decisions when present.
    Read,
    /// Cluster again; merge into stored decisions when `only_new` is set.
    Compute { only_new: bool },
}

/// Decisions for one source population, read from or written to its state
/// file.
///
/// An incremental scraped pass merges into the stored decisions but returns
/// only the decisions for `records`.
pub(super) fn population_decisions(
    records: &[Record],
    population: Population,
    layout: &StateLayout,
    config: &DedupeConfig,
    access: StateAccess,
    prompter: &mut dyn Prompter,
) -> Result<DecisionSet> {
    if records.is_empty() {
        info!(population = population.as_str(), "no records to dedupe");
        return Ok(DecisionSet::new());
    }

    let path = layout.decisions_path(population);
    if path.exists() {
        match access {
            StateAccess::Read => {
                let decisions = load_decisions(&path)?;
                info!(
                    population = population.as_str(),
                    whitelisted = decisions.whitelist().len(),
                    blacklisted = decisions.blacklist().len(),
                    "loaded stored decisions"
                );
                return Ok(decisions);
            }
            StateAccess::Compute { only_new: true } if population == Population::Scraped => {
                let fresh = identify_decisions(records, config, false, prompter)?;
                let mut merged = load_decisions(&path)?;
                merged.merge(fresh.clone());
                save_decisions(&path, &merged)?;
                info!(
                    population = population.as_str(),
                    new_whitelisted = fresh.whitelist().len(),
                    new_blacklisted = fresh.blacklist().len(),
                    path = %path.display(),
                    "merged new decisions into stored decisions"
                );
                return Ok(fresh);
            }
            StateAccess::Compute { .. } => {}
        }
    }

    let decisions = identify_decisions(records, config, false, prompter)?;
    save_decisions(&path, &decisions)?;
    info!(
        population = population.as_str(),
        path = %path.display(),
        "wrote decisions"
    );
    Ok(decisions)
}
