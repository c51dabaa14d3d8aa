use crate::config::DedupeConfig;
use crate::model::{Collection, Record};

use super::decisions::DecisionSet;

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Singleton,
    AlreadyResolved,
    /// Imported record kept, scraped record dropped.
    CrossSourcePair { keep: Record, drop: Record },
    /// Homogeneous cluster already settled by its source's own pass.
    PreDeduped,
    Ambiguous,
}

/// Imported records first, then scraped, each group in input order.
pub fn sort_cluster(cluster: &[Record]) -> Vec<Record> {
    let mut sorted = cluster.to_vec();
    sorted.sort_by_key(|record| record.collection);
    sorted
}

pub fn has_both_sources(cluster: &[Record]) -> bool {
    cluster
        .iter()
        .any(|record| record.collection == Collection::Imported)
        && cluster
            .iter()
            .any(|record| record.collection == Collection::Scraped)
}

/// Classifies an ordered cluster given the decisions committed so far.
///
/// `similarities` are the adjacent ratios of the ordered cluster.
pub fn classify(
    cluster: &[Record],
    similarities: &[f64],
    decisions: &DecisionSet,
    config: &DedupeConfig,
    already_deduped: bool,
) -> Resolution {
    if cluster.len() == 1 {
        return Resolution::Singleton;
    }

    if cluster.iter().all(|record| decisions.is_resolved(&record.id)) {
        return Resolution::AlreadyResolved;
    }

    if let Some(resolution) = cross_source_pair(cluster, similarities, decisions, config) {
        return resolution;
    }

    if already_deduped {
        let first = cluster[0].collection;
        let homogeneous = cluster.iter().all(|record| record.collection == first);
        let conflicting = cluster
            .iter()
            .any(|record| decisions.is_blacklisted(&record.id));
        if homogeneous && !conflicting {
            return Resolution::PreDeduped;
        }
    }

    Resolution::Ambiguous
}

fn cross_source_pair(
    cluster: &[Record],
    similarities: &[f64],
    decisions: &DecisionSet,
    config: &DedupeConfig,
) -> Option<Resolution> {
    let [first, second] = cluster else {
        return None;
    };
    if !has_both_sources(cluster) || first.year != second.year {
        return None;
    }
    if similarities.first().copied().unwrap_or(0.0) < config.ceiling {
        return None;
    }

    let (keep, drop) = if first.collection == Collection::Imported {
        (first, second)
    } else {
        (second, first)
    };
    if decisions.is_blacklisted(&keep.id) || decisions.is_whitelisted(&drop.id) {
        return None;
    }

    Some(Resolution::CrossSourcePair {
        keep: keep.clone(),
        drop: drop.clone(),
    })
}

/// Commits an automatic resolution; `AlreadyResolved` and `Ambiguous`
/// leave the decisions untouched.
pub fn apply_automatic(
    resolution: &Resolution,
    cluster: &[Record],
    decisions: &mut DecisionSet,
) {
    match resolution {
        Resolution::Singleton | Resolution::PreDeduped => {
            for record in cluster {
                decisions.bind_whitelist(record);
            }
        }
        Resolution::CrossSourcePair { keep, drop } => {
            decisions.bind_whitelist(keep);
            decisions.bind_blacklist(drop);
        }
        Resolution::AlreadyResolved | Resolution::Ambiguous => {}
    }
}
