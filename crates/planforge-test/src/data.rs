//! Raw training rows.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Feature rows whose class is marked by a large value in column `class`.
///
/// Labels cycle through `0..classes`; all other columns carry small noise.
pub fn separable_rows(
    n: usize,
    width: usize,
    classes: usize,
    seed: u64,
) -> (Vec<Vec<f64>>, Vec<usize>) {
    assert!(classes <= width, "need a marker column per class");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let labels: Vec<usize> = (0..n).map(|i| i % classes).collect();
    let rows = labels
        .iter()
        .map(|&label| {
            (0..width)
                .map(|c| {
                    let noise = rng.random_range(-0.3..0.3);
                    if c == label {
                        3.0 + noise
                    } else {
                        noise
                    }
                })
                .collect()
        })
        .collect();
    (rows, labels)
}

/// Sequences of `steps` rows; the target is `2 * x + 1` where `x` is
/// column 0 of the last row.
pub fn sequence_rows(
    n: usize,
    steps: usize,
    width: usize,
    seed: u64,
) -> (Vec<Vec<Vec<f64>>>, Vec<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut sequences = Vec::with_capacity(n);
    let mut targets = Vec::with_capacity(n);
    for _ in 0..n {
        let seq: Vec<Vec<f64>> = (0..steps)
            .map(|_| (0..width).map(|_| rng.random_range(0.0..1.0)).collect())
            .collect();
        let last = seq.last().map_or(0.0, |row| row[0]);
        targets.push(2.0 * last + 1.0);
        sequences.push(seq);
    }
    (sequences, targets)
}
