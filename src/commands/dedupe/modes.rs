use std::fmt;

use crate::config::RunModes;

/// A requested mode that conflicted with what is on disk and was escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ModeOverride {
    /// No stored scraped decisions to read; scraped records are deduped in full.
    ScrapedStateMissing,
    /// New scraped records must be deduped against themselves first.
    ScrapedSelfDedupRequired,
    /// New scraped records must also be deduped against imported records.
    CrossSourceRequired,
    /// No stored imported decisions to read; imported records are deduped.
    ImportedStateMissing,
}

impl fmt::Display for ModeOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::ScrapedStateMissing => {
                "scraped decisions not found on disk, processing all scraped records"
            }
            Self::ScrapedSelfDedupRequired => {
                "overriding settings to first dedupe new scraped records against themselves"
            }
            Self::CrossSourceRequired => {
                "overriding settings to dedupe new scraped records against imported records; \
                 do not interrupt this update or the lists will go out of sync"
            }
            Self::ImportedStateMissing => {
                "imported decisions not found on disk, processing all imported records"
            }
        };
        f.write_str(message)
    }
}

/// Escalates `requested` to a combination that keeps the stored scraped and
/// imported decisions consistent with each other.
pub(super) fn resolve_modes(
    requested: RunModes,
    scraped_state_exists: bool,
    imported_state_exists: bool,
) -> (RunModes, Vec<ModeOverride>) {
    let mut modes = requested;
    let mut overrides = Vec::new();

    if !scraped_state_exists
        && modes.cross_source
        && (!modes.dedupe_scraped || modes.only_new)
    {
        overrides.push(ModeOverride::ScrapedStateMissing);
        modes.dedupe_scraped = true;
        modes.only_new = false;
    }

    if modes.only_new {
        if !modes.dedupe_scraped {
            overrides.push(ModeOverride::ScrapedSelfDedupRequired);
            modes.dedupe_scraped = true;
        }
        if !modes.cross_source {
            overrides.push(ModeOverride::CrossSourceRequired);
            modes.cross_source = true;
        }
    }

    if !imported_state_exists && modes.cross_source && !modes.dedupe_imported {
        overrides.push(ModeOverride::ImportedStateMissing);
        modes.dedupe_imported = true;
    }

    (modes, overrides)
}
