//! Per-generation statistics.

use std::time::Duration;

use serde::Serialize;

use crate::fitness::FitnessResult;
use crate::genome::{hamming_distance, Population};

/// Fitness spread and diversity of one generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationStatistics {
    /// 0 for the initial population.
    pub generation: u32,
    pub best: f64,
    pub mean: f64,
    pub worst: f64,
    /// Mean Hamming distance of every genome to the best one.
    pub diversity: f64,
    pub best_violations: u32,
    pub elapsed: Duration,
}

impl GenerationStatistics {
    /// Computes statistics of the current generation of `population`.
    pub fn compute(
        generation: u32,
        fitness: &[FitnessResult],
        population: &Population,
        elapsed: Duration,
    ) -> Self {
        let mut best = 0;
        let mut worst = f64::INFINITY;
        let mut sum = 0.0;
        for (i, f) in fitness.iter().enumerate() {
            if f.fitness > fitness[best].fitness {
                best = i;
            }
            worst = worst.min(f.fitness);
            sum += f.fitness;
        }
        let n = fitness.len().max(1) as f64;
        let leader = population.genome(best);
        let diversity = population
            .genomes()
            .map(|g| hamming_distance(g, leader))
            .sum::<f64>()
            / n;

        Self {
            generation,
            best: fitness.get(best).map_or(0.0, |f| f.fitness),
            mean: sum / n,
            worst: if worst.is_finite() { worst } else { 0.0 },
            diversity,
            best_violations: fitness.get(best).map_or(0, |f| f.violations),
            elapsed,
        }
    }
}
