mod adjudicate;
mod cluster;
mod decisions;
mod fingerprint;
mod lsh;
mod policy;
mod prompt;
mod similarity;
#[cfg(test)]
mod tests;

use anyhow::Result;
use tracing::info;

use crate::config::DedupeConfig;
use crate::model::Record;

pub use decisions::{DecisionSet, RecordMap};
pub use prompt::{Prompter, StdioPrompter};

use adjudicate::{ClusterView, adjudicate_cluster};
use cluster::{Cluster, find_clusters};
use policy::{Resolution, apply_automatic, classify, sort_cluster};
use similarity::adjacent_similarities;

/// Clusters `records` and settles every cluster, automatically where the
/// policy allows and through `prompter` otherwise.
///
/// `already_deduped` marks a cross-source pass whose populations were each
/// deduplicated against themselves first.
pub fn identify_decisions(
    records: &[Record],
    config: &DedupeConfig,
    already_deduped: bool,
    prompter: &mut dyn Prompter,
) -> Result<DecisionSet> {
    let clusters = find_clusters(records, config)?;
    resolve_clusters(clusters, config, already_deduped, prompter)
}

pub fn resolve_clusters(
    clusters: Vec<Cluster>,
    config: &DedupeConfig,
    already_deduped: bool,
    prompter: &mut dyn Prompter,
) -> Result<DecisionSet> {
    let mut decisions = DecisionSet::new();

    let (singletons, multi_clusters): (Vec<Cluster>, Vec<Cluster>) =
        clusters.into_iter().partition(|cluster| cluster.len() == 1);
    for cluster in &singletons {
        apply_automatic(&Resolution::Singleton, cluster, &mut decisions);
    }

    let total = multi_clusters.len();
    let mut counts = PassCounts {
        singletons: singletons.len(),
        ..PassCounts::default()
    };

    for (position, cluster) in multi_clusters.iter().enumerate() {
        let members = sort_cluster(cluster);
        let similarities = adjacent_similarities(&members);
        let resolution = classify(&members, &similarities, &decisions, config, already_deduped);

        match resolution {
            Resolution::AlreadyResolved => {
                counts.skipped += 1;
                continue;
            }
            Resolution::Ambiguous => {}
            _ => {
                apply_automatic(&resolution, &members, &mut decisions);
                counts.automatic += 1;
                continue;
            }
        }

        let view = ClusterView {
            position,
            total,
            members: &members,
            similarities: &similarities,
        };
        adjudicate_cluster(view, &mut decisions, prompter)?;
        counts.adjudicated += 1;
    }

    info!(
        singletons = counts.singletons,
        clusters = total,
        skipped = counts.skipped,
        automatic = counts.automatic,
        adjudicated = counts.adjudicated,
        whitelisted = decisions.whitelist().len(),
        blacklisted = decisions.blacklist().len(),
        "clustering pass complete"
    );

    Ok(decisions)
}

#[derive(Debug, Default)]
struct PassCounts {
    singletons: usize,
    skipped: usize,
    automatic: usize,
    adjudicated: usize,
}
