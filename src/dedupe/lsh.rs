use std::collections::{BTreeSet, HashMap};

use anyhow::{Result, bail};

use super::fingerprint::Sketch;

const FALSE_POSITIVE_WEIGHT: f64 = 0.5;
const FALSE_NEGATIVE_WEIGHT: f64 = 0.5;
const INTEGRATION_STEPS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandParams {
    pub bands: usize,
    pub rows: usize,
}

impl BandParams {
    /// Band layout minimizing the weighted false-positive and false-negative
    /// probability mass around `threshold`.
    pub fn optimal(threshold: f64, num_perm: usize) -> Self {
        let mut best = BandParams { bands: 1, rows: 1 };
        let mut best_error = f64::INFINITY;

        for bands in 1..=num_perm {
            for rows in 1..=(num_perm / bands) {
                let collide = |s: f64| collision_probability(s, bands, rows);
                let false_positive = integrate(collide, 0.0, threshold);
                let false_negative = integrate(|s| 1.0 - collide(s), threshold, 1.0);
                let error =
                    false_positive * FALSE_POSITIVE_WEIGHT + false_negative * FALSE_NEGATIVE_WEIGHT;
                if error < best_error {
                    best_error = error;
                    best = BandParams { bands, rows };
                }
            }
        }

        best
    }
}

fn collision_probability(similarity: f64, bands: usize, rows: usize) -> f64 {
    1.0 - (1.0 - similarity.powi(rows as i32)).powi(bands as i32)
}

fn integrate(f: impl Fn(f64) -> f64, lower: f64, upper: f64) -> f64 {
    if upper <= lower {
        return 0.0;
    }

    // composite Simpson, INTEGRATION_STEPS is even
    let step = (upper - lower) / INTEGRATION_STEPS as f64;
    let mut total = f(lower) + f(upper);
    for index in 1..INTEGRATION_STEPS {
        let weight = if index % 2 == 0 { 2.0 } else { 4.0 };
        total += weight * f(lower + step * index as f64);
    }
    total * step / 3.0
}

/// Banded locality-sensitive hash index over MinHash sketches.
#[derive(Debug)]
pub struct LshIndex {
    params: BandParams,
    num_perm: usize,
    tables: Vec<HashMap<Vec<u64>, BTreeSet<usize>>>,
    entries: HashMap<usize, Vec<Vec<u64>>>,
}

impl LshIndex {
    pub fn new(threshold: f64, num_perm: usize) -> Result<Self> {
        Self::with_params(BandParams::optimal(threshold, num_perm), num_perm)
    }

    pub fn with_params(params: BandParams, num_perm: usize) -> Result<Self> {
        if params.bands == 0 || params.rows == 0 || params.bands * params.rows > num_perm {
            bail!(
                "{} bands of {} rows do not fit {} permutations",
                params.bands,
                params.rows,
                num_perm
            );
        }
        Ok(Self {
            params,
            num_perm,
            tables: (0..params.bands).map(|_| HashMap::new()).collect(),
            entries: HashMap::new(),
        })
    }

    pub fn params(&self) -> BandParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(&mut self, key: usize, sketch: &Sketch) -> Result<()> {
        self.check_width(sketch)?;

        if let Some(previous) = self.entries.remove(&key) {
            for (table, band_key) in self.tables.iter_mut().zip(previous) {
                if let Some(bucket) = table.get_mut(&band_key) {
                    bucket.remove(&key);
                    if bucket.is_empty() {
                        table.remove(&band_key);
                    }
                }
            }
        }

        let band_keys = self.band_keys(sketch);
        for (table, band_key) in self.tables.iter_mut().zip(band_keys.iter()) {
            table.entry(band_key.clone()).or_default().insert(key);
        }
        self.entries.insert(key, band_keys);
        Ok(())
    }

    pub fn query(&self, sketch: &Sketch) -> Result<BTreeSet<usize>> {
        self.check_width(sketch)?;

        let mut candidates = BTreeSet::new();
        for (table, band_key) in self.tables.iter().zip(self.band_keys(sketch)) {
            if let Some(bucket) = table.get(&band_key) {
                candidates.extend(bucket.iter().copied());
            }
        }
        Ok(candidates)
    }

    fn band_keys(&self, sketch: &Sketch) -> Vec<Vec<u64>> {
        let rows = self.params.rows;
        (0..self.params.bands)
            .map(|band| sketch.slots()[band * rows..(band + 1) * rows].to_vec())
            .collect()
    }

    fn check_width(&self, sketch: &Sketch) -> Result<()> {
        if sketch.num_perm() != self.num_perm {
            bail!(
                "sketch has {} permutations but the index expects {}",
                sketch.num_perm(),
                self.num_perm
            );
        }
        Ok(())
    }
}
