use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::config::SHINGLE_SIZE;
use crate::model::Record;

const MERSENNE_PRIME: u64 = (1 << 61) - 1;
const MAX_HASH: u64 = (1 << 32) - 1;
const PERMUTATION_SEED: u64 = 1;

/// Seeded `(a, b)` coefficients for `num_perm` universal hash permutations.
///
/// Every sketch compared in one index must come from the same set, so the
/// set is built once per pass and shared.
#[derive(Debug, Clone)]
pub struct Permutations {
    coefficients: Vec<(u64, u64)>,
}

impl Permutations {
    pub fn new(num_perm: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(PERMUTATION_SEED);
        let coefficients = (0..num_perm)
            .map(|_| {
                let a = rng.gen_range(1..MERSENNE_PRIME);
                let b = rng.gen_range(0..MERSENNE_PRIME);
                (a, b)
            })
            .collect();
        Self { coefficients }
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    fn apply(&self, hash: u64, slots: &mut [u64]) {
        for ((a, b), slot) in self.coefficients.iter().zip(slots.iter_mut()) {
            let permuted = (u128::from(*a) * u128::from(hash) + u128::from(*b))
                % u128::from(MERSENNE_PRIME);
            let permuted = (permuted as u64) & MAX_HASH;
            if permuted < *slot {
                *slot = permuted;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sketch {
    slots: Vec<u64>,
}

impl Sketch {
    pub fn empty(num_perm: usize) -> Self {
        Self {
            slots: vec![MAX_HASH; num_perm],
        }
    }

    pub fn from_text(text: &str, permutations: &Permutations) -> Self {
        let mut sketch = Self::empty(permutations.len());
        for shingle in shingles(text) {
            permutations.apply(shingle_hash(&shingle), &mut sketch.slots);
        }
        sketch
    }

    pub fn for_record(record: &Record, permutations: &Permutations) -> Self {
        Self::from_text(&record.metadata_string(), permutations)
    }

    pub fn num_perm(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[u64] {
        &self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| *slot == MAX_HASH)
    }

    /// Fraction of matching slots, an estimate of the shingle-set Jaccard index.
    pub fn jaccard(&self, other: &Sketch) -> f64 {
        if self.slots.len() != other.slots.len() || self.slots.is_empty() {
            return 0.0;
        }

        let matches = self
            .slots
            .iter()
            .zip(other.slots.iter())
            .filter(|(left, right)| left == right)
            .count();
        matches as f64 / self.slots.len() as f64
    }
}

/// Character windows of `SHINGLE_SIZE`; shorter text has none.
pub fn shingles(text: &str) -> Vec<String> {
    let chars = text.chars().collect::<Vec<char>>();
    if chars.len() < SHINGLE_SIZE {
        return Vec::new();
    }

    chars
        .windows(SHINGLE_SIZE)
        .map(|window| window.iter().collect::<String>())
        .collect()
}

fn shingle_hash(shingle: &str) -> u64 {
    let digest = Sha256::digest(shingle.as_bytes());
    u64::from(u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]))
}
