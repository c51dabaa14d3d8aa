use anyhow::Result;
use tracing::{debug, info, warn};

use super::fingerprint::{Permutations, Sketch};
use super::lsh::LshIndex;
use crate::config::DedupeConfig;
use crate::model::Record;

/// Records reported as similar to one query record, the query included.
pub type Cluster = Vec<Record>;

/// One cluster per input record, built by querying the index with each
/// record's own sketch. Clusters may overlap.
pub fn find_clusters(records: &[Record], config: &DedupeConfig) -> Result<Vec<Cluster>> {
    let records = match config.max_records {
        Some(limit) if records.len() > limit => &records[..limit],
        _ => records,
    };

    let permutations = Permutations::new(config.num_perm);
    let mut index = LshIndex::new(config.threshold, config.num_perm)?;
    let params = index.params();
    info!(
        records = records.len(),
        bands = params.bands,
        rows = params.rows,
        "indexing record fingerprints"
    );

    let mut sketches = Vec::with_capacity(records.len());
    for (position, record) in records.iter().enumerate() {
        let sketch = Sketch::for_record(record, &permutations);
        if sketch.is_empty() {
            warn!(id = %record.id, "record text too short to fingerprint");
        }
        index.insert(position, &sketch)?;
        sketches.push(sketch);
        debug!(indexed = position + 1, total = records.len(), "indexed record");
    }
    debug!(entries = index.len(), "fingerprint index built");

    let mut clusters = Vec::with_capacity(records.len());
    for (position, sketch) in sketches.iter().enumerate() {
        let mut neighbors = index.query(sketch)?;
        for &neighbor in neighbors.iter().filter(|&&neighbor| neighbor != position) {
            debug!(
                record = %records[position].id,
                candidate = %records[neighbor].id,
                estimated_jaccard = sketch.jaccard(&sketches[neighbor]),
                "lsh candidate"
            );
        }
        neighbors.insert(position);
        clusters.push(
            neighbors
                .into_iter()
                .map(|key| records[key].clone())
                .collect::<Cluster>(),
        );
    }

    Ok(clusters)
}
