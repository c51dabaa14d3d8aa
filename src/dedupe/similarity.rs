use std::collections::HashMap;

use crate::model::Record;

/// Exact similarity of two records' identifying strings.
pub fn record_similarity(left: &Record, right: &Record) -> f64 {
    sequence_ratio(&left.metadata_string(), &right.metadata_string())
}

/// Similarity of each displayed member to the next one.
pub fn adjacent_similarities(cluster: &[Record]) -> Vec<f64> {
    cluster
        .windows(2)
        .map(|pair| record_similarity(&pair[0], &pair[1]))
        .collect()
}

/// Ratcliff/Obershelp ratio `2 * matches / total_len`, without any junk
/// heuristic. Case and whitespace sensitive.
pub fn sequence_ratio(left: &str, right: &str) -> f64 {
    let a = left.chars().collect::<Vec<char>>();
    let b = right.chars().collect::<Vec<char>>();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut positions = HashMap::<char, Vec<usize>>::new();
    for (index, character) in b.iter().enumerate() {
        positions.entry(*character).or_default().push(index);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, size) = longest_match(a, &positions, a_lo, a_hi, b_lo, b_hi);
        if size == 0 {
            continue;
        }

        matched += size;
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + size < a_hi && j + size < b_hi {
            pending.push((i + size, a_hi, j + size, b_hi));
        }
    }
    matched
}

/// Longest common block of `a[a_lo..a_hi]` and `b[b_lo..b_hi]`, earliest in
/// `a` then in `b` on ties.
fn longest_match(
    a: &[char],
    positions: &HashMap<char, Vec<usize>>,
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (a_lo, b_lo, 0);
    let mut run_lengths = HashMap::<usize, usize>::new();

    for (i, character) in a.iter().enumerate().take(a_hi).skip(a_lo) {
        let mut next_run_lengths = HashMap::<usize, usize>::new();
        if let Some(indices) = positions.get(character) {
            for &j in indices {
                if j < b_lo {
                    continue;
                }
                if j >= b_hi {
                    break;
                }
                let previous = if j == 0 {
                    0
                } else {
                    run_lengths.get(&(j - 1)).copied().unwrap_or(0)
                };
                let size = previous + 1;
                next_run_lengths.insert(j, size);
                if size > best_size {
                    best_i = i + 1 - size;
                    best_j = j + 1 - size;
                    best_size = size;
                }
            }
        }
        run_lengths = next_run_lengths;
    }

    (best_i, best_j, best_size)
}
