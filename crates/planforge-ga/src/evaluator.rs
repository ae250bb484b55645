//! Parallel fitness evaluation.

use std::sync::Arc;

use planforge_core::{PlanForgeError, Result};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::fitness::{FitnessFunction, FitnessResult};
use crate::genome::Gene;
use crate::problem::AllocationProblem;

/// Evaluates genomes on a bounded rayon pool, or inline without one.
///
/// Results are written in genome order, so a run is reproducible
/// regardless of the thread count.
#[derive(Debug, Clone, Default)]
pub struct ParallelEvaluator {
    pool: Option<Arc<ThreadPool>>,
}

impl ParallelEvaluator {
    pub fn sequential() -> Self {
        Self { pool: None }
    }

    /// Builds a dedicated pool of `threads` workers; one thread or fewer
    /// evaluates inline.
    pub fn with_threads(threads: usize) -> Result<Self> {
        if threads <= 1 {
            return Ok(Self::sequential());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("planforge-eval-{i}"))
            .build()
            .map_err(|e| PlanForgeError::Internal(format!("failed to build worker pool: {e}")))?;
        Ok(Self::from_pool(Arc::new(pool)))
    }

    pub fn from_pool(pool: Arc<ThreadPool>) -> Self {
        Self { pool: Some(pool) }
    }

    pub fn threads(&self) -> usize {
        self.pool.as_ref().map_or(1, |p| p.current_num_threads())
    }

    /// Evaluates consecutive genomes of `genes` into `out`.
    pub fn evaluate(
        &self,
        fitness: &FitnessFunction,
        problem: &AllocationProblem,
        genes: &[Gene],
        out: &mut [FitnessResult],
    ) {
        let len = problem.task_count();
        match &self.pool {
            Some(pool) => pool.install(|| {
                out.par_iter_mut()
                    .zip(genes.par_chunks_exact(len))
                    .for_each(|(slot, genome)| *slot = fitness.evaluate(problem, genome));
            }),
            None => {
                for (slot, genome) in out.iter_mut().zip(genes.chunks_exact(len)) {
                    *slot = fitness.evaluate(problem, genome);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use planforge_core::GoalWeights;
    use planforge_test::project_request;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_parallel_matches_sequential() {
        let problem = AllocationProblem::new(&project_request(8, 4)).unwrap();
        let weights = GoalWeights {
            cost: 0.5,
            duration: 0.3,
            baseline: 0.2,
            ..GoalWeights::default()
        };
        let fitness = FitnessFunction::new(&problem, weights, 0.1);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let genes: Vec<Gene> = (0..16)
            .flat_map(|_| (0..8).map(|t| problem.random_gene(t, &mut rng).unwrap()).collect::<Vec<_>>())
            .collect();

        let mut seq = vec![FitnessResult::default(); 16];
        let mut par = vec![FitnessResult::default(); 16];
        ParallelEvaluator::sequential().evaluate(&fitness, &problem, &genes, &mut seq);
        ParallelEvaluator::with_threads(4)
            .unwrap()
            .evaluate(&fitness, &problem, &genes, &mut par);
        assert_eq!(seq, par);
    }
}
