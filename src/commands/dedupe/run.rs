use anyhow::Result;
use tracing::{info, warn};

use super::modes::resolve_modes;
use super::population::{StateAccess, population_decisions};
use crate::cli::DedupeArgs;
use crate::commands::report::build_report;
use crate::config::{DedupeConfig, RunModes};
use crate::dedupe::{DecisionSet, Prompter, StdioPrompter, identify_decisions};
use crate::model::Record;
use crate::sources::{load_imported_records, load_scraped_records};
use crate::state::{
    Population, StateLayout, WriteMode, load_processed_ids, write_processed_ids, write_tsv,
};
use crate::util::ensure_directory;

#[derive(Debug)]
pub(super) struct RunOutcome {
    pub(super) modes: RunModes,
    pub(super) scraped: Option<DecisionSet>,
    pub(super) imported: Option<DecisionSet>,
    pub(super) master: Option<DecisionSet>,
}

pub fn run(args: DedupeArgs) -> Result<()> {
    let mut prompter = StdioPrompter;
    let outcome = run_with_prompter(&args, &mut prompter)?;

    let retained = |decisions: &Option<DecisionSet>| {
        decisions
            .as_ref()
            .map(|decisions| decisions.whitelist().len())
    };
    info!(
        dedupe_scraped = outcome.modes.dedupe_scraped,
        dedupe_imported = outcome.modes.dedupe_imported,
        cross_source = outcome.modes.cross_source,
        only_new = outcome.modes.only_new,
        scraped_retained = ?retained(&outcome.scraped),
        imported_retained = ?retained(&outcome.imported),
        master_retained = ?retained(&outcome.master),
        "dedupe run complete"
    );
    Ok(())
}

pub(super) fn run_with_prompter(
    args: &DedupeArgs,
    prompter: &mut dyn Prompter,
) -> Result<RunOutcome> {
    let config = DedupeConfig::from_args(args)?;
    let layout = StateLayout::new(&args.root);
    ensure_directory(&layout.root().join("json"))?;
    ensure_directory(&layout.root().join("lists"))?;

    let (modes, overrides) = resolve_modes(
        RunModes::from_args(args),
        layout.decisions_path(Population::Scraped).exists(),
        layout.decisions_path(Population::Imported).exists(),
    );
    for mode_override in &overrides {
        warn!(reason = %mode_override, "run settings overridden");
    }

    let write_mode = if modes.only_new {
        WriteMode::Append
    } else {
        WriteMode::Overwrite
    };
    info!(
        dedupe_scraped = modes.dedupe_scraped,
        dedupe_imported = modes.dedupe_imported,
        cross_source = modes.cross_source,
        only_new = modes.only_new,
        threshold = config.threshold,
        ceiling = config.ceiling,
        num_perm = config.num_perm,
        "starting dedupe run"
    );

    let scraped_records = scraped_population(args, &layout, modes.only_new)?;
    let imported_records = if modes.dedupe_imported || modes.cross_source {
        load_imported_records(&args.imported_file)?
    } else {
        Vec::new()
    };

    let scraped = if modes.dedupe_scraped {
        info!("deduping scraped records against themselves");
        let decisions = population_decisions(
            &scraped_records,
            Population::Scraped,
            &layout,
            &config,
            StateAccess::Compute {
                only_new: modes.only_new,
            },
            prompter,
        )?;
        export_lists(&layout, Population::Scraped, &decisions, write_mode)?;
        write_processed_ids(
            &layout.processed_ids_path(),
            scraped_records.iter().map(|record| record.id.as_str()),
            write_mode,
        )?;
        Some(decisions)
    } else {
        None
    };

    let imported = if modes.dedupe_imported {
        info!("deduping imported records against themselves");
        let decisions = population_decisions(
            &imported_records,
            Population::Imported,
            &layout,
            &config,
            StateAccess::Compute { only_new: false },
            prompter,
        )?;
        export_lists(&layout, Population::Imported, &decisions, write_mode)?;
        Some(decisions)
    } else {
        None
    };

    let master = if modes.cross_source {
        let scraped_side = match &scraped {
            Some(decisions) => decisions.clone(),
            None => population_decisions(
                &scraped_records,
                Population::Scraped,
                &layout,
                &config,
                StateAccess::Read,
                prompter,
            )?,
        };
        let imported_side = match &imported {
            Some(decisions) => decisions.clone(),
            None => population_decisions(
                &imported_records,
                Population::Imported,
                &layout,
                &config,
                StateAccess::Read,
                prompter,
            )?,
        };

        if scraped_side.is_empty() || imported_side.is_empty() {
            warn!("one side of the cross-source pass has no decisions");
        }

        let pool = scraped_side
            .whitelist()
            .values()
            .chain(imported_side.whitelist().values())
            .cloned()
            .collect::<Vec<Record>>();
        info!(
            deduped_scraped = scraped_side.whitelist().len(),
            deduped_imported = imported_side.whitelist().len(),
            "deduping scraped records against imported records"
        );

        let decisions = identify_decisions(&pool, &config, true, prompter)?;
        export_lists(&layout, Population::Master, &decisions, write_mode)?;

        let master_lists_present = layout.whitelist_path(Population::Master).exists()
            && layout.blacklist_path(Population::Master).exists();
        if master_lists_present {
            let counts = build_report(&layout, write_mode, modes.only_new)?;
            info!(
                scraped_ids_retrieved = counts.scraped_ids_retrieved,
                retained_after_self_dedup = counts.retained_after_self_dedup,
                retained_after_cross_source = counts.retained_after_cross_source,
                "report written"
            );
        } else {
            warn!("report not generated because master lists are missing");
        }
        Some(decisions)
    } else {
        None
    };

    Ok(RunOutcome {
        modes,
        scraped,
        imported,
        master,
    })
}

fn scraped_population(
    args: &DedupeArgs,
    layout: &StateLayout,
    only_new: bool,
) -> Result<Vec<Record>> {
    let records = load_scraped_records(&args.scraped_dir)?;
    if !only_new {
        return Ok(records);
    }

    let processed = load_processed_ids(&layout.processed_ids_path())?;
    let total = records.len();
    let fresh = records
        .into_iter()
        .filter(|record| !processed.contains(&record.id))
        .collect::<Vec<Record>>();
    info!(
        retrieved = total,
        new = fresh.len(),
        "filtered scraped records to unseen ids"
    );
    Ok(fresh)
}

fn export_lists(
    layout: &StateLayout,
    population: Population,
    decisions: &DecisionSet,
    mode: WriteMode,
) -> Result<()> {
    write_tsv(
        &layout.whitelist_path(population),
        decisions.whitelist(),
        mode,
    )?;
    write_tsv(
        &layout.blacklist_path(population),
        decisions.blacklist(),
        mode,
    )
}
