//! Generational genetic search.

use std::sync::Arc;
use std::time::Duration;

use planforge_config::GeneticConfig;
use planforge_core::{PlanForgeError, Result, TerminationReason};
use rand::Rng;
use tracing::debug;

use crate::evaluator::ParallelEvaluator;
use crate::event::GenerationListener;
use crate::fitness::{FitnessFunction, FitnessResult};
use crate::genome::{Gene, Population};
use crate::operators::{mutate, single_point_crossover, tournament};
use crate::problem::AllocationProblem;
use crate::scope::{CancellationToken, SearchScope};
use crate::statistics::GenerationStatistics;
use crate::termination::{
    ExternalTermination, GenerationCountTermination, OrTermination, StagnationTermination,
    Termination, TimeTermination,
};

/// A distinct genome of the final population with its fitness.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedGenome {
    pub genes: Vec<Gene>,
    pub fitness: FitnessResult,
}

/// Result of a search run.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Distinct genomes of the final population, fittest first.
    pub ranked: Vec<RankedGenome>,
    /// Generations completed after the initial population.
    pub generations: u32,
    pub termination: TerminationReason,
    pub history: Vec<GenerationStatistics>,
    pub elapsed: Duration,
}

impl SearchOutcome {
    pub fn best(&self) -> &RankedGenome {
        &self.ranked[0]
    }

    /// True when stopped by deadline or cancellation.
    pub fn is_partial(&self) -> bool {
        self.termination.is_partial()
    }
}

/// Seeded generational GA over an [`AllocationProblem`].
///
/// Each generation keeps the top `⌈population × elite_ratio⌉` genomes
/// unchanged (at least one), then fills the rest with tournament
/// selection, single-point crossover and repairing mutation. The best
/// fitness therefore never decreases.
pub struct GeneticSearch<'a> {
    problem: &'a AllocationProblem,
    fitness: &'a FitnessFunction,
    config: &'a GeneticConfig,
    evaluator: ParallelEvaluator,
    listeners: Vec<Arc<dyn GenerationListener>>,
    seed: u64,
    time_limit: Option<Duration>,
    cancel: CancellationToken,
}

impl<'a> GeneticSearch<'a> {
    pub fn new(
        problem: &'a AllocationProblem,
        fitness: &'a FitnessFunction,
        config: &'a GeneticConfig,
    ) -> Self {
        Self {
            problem,
            fitness,
            config,
            evaluator: ParallelEvaluator::sequential(),
            listeners: Vec::new(),
            seed: 0,
            time_limit: config.time_limit(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Overrides the configured time limit.
    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit.or(self.time_limit);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_evaluator(mut self, evaluator: ParallelEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn GenerationListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    fn notify(&self, stats: &GenerationStatistics) {
        for listener in &self.listeners {
            listener.on_generation(stats);
        }
    }

    /// Runs the search to termination.
    ///
    /// # Errors
    ///
    /// `ConstraintInfeasible` when a task has no eligible resource, and
    /// `Cancelled` when cancellation is requested before the initial
    /// population exists. Later cancellation or a deadline returns the
    /// best-so-far population.
    pub fn run(&self) -> Result<SearchOutcome> {
        if self.cancel.is_cancelled() {
            return Err(PlanForgeError::Cancelled);
        }
        let size = self.config.population_size.max(2);
        let len = self.problem.task_count();
        let elites = self.config.elite_count().clamp(1, size);

        let mut scope = SearchScope::new(self.seed, self.config.improvement_epsilon)
            .with_cancellation(self.cancel.clone());
        let mut population = Population::new(size, len);
        for i in 0..size {
            let genome = population.genome_mut(i);
            for (task, gene) in genome.iter_mut().enumerate() {
                *gene = self.problem.random_gene(task, scope.rng())?;
            }
        }

        let mut fitness = vec![FitnessResult::default(); size];
        let mut next_fitness = fitness.clone();
        self.evaluator
            .evaluate(self.fitness, self.problem, population.genes(), &mut fitness);
        let initial = GenerationStatistics::compute(0, &fitness, &population, scope.elapsed());
        self.notify(&initial);
        scope.start(initial);

        let termination = OrTermination((
            ExternalTermination,
            self.time_limit.map(TimeTermination::new),
            StagnationTermination::new(self.config.stagnation_generations),
            GenerationCountTermination::new(self.config.max_generations),
        ));

        let reason = loop {
            if let Some(reason) = termination.check(&scope) {
                break reason;
            }

            let ranking = rank(&fitness);
            for (slot, &i) in ranking[..elites].iter().enumerate() {
                population.copy_to_next(i, slot);
                next_fitness[slot] = fitness[i];
            }

            let scores: Vec<f64> = fitness.iter().map(|f| f.fitness).collect();
            let mut slot = elites;
            while slot < size {
                let rng = scope.rng();
                let a = tournament(&scores, self.config.tournament_size, rng);
                let b = tournament(&scores, self.config.tournament_size, rng);
                population.copy_to_next(a, slot);
                if slot + 1 < size {
                    population.copy_to_next(b, slot + 1);
                    if rng.random_bool(self.config.crossover_rate) {
                        let (x, y) = population.next_pair_mut(slot, slot + 1);
                        single_point_crossover(x, y, rng);
                    }
                    mutate(
                        self.problem,
                        population.next_mut(slot + 1),
                        self.config.mutation_rate,
                        rng,
                    )?;
                }
                mutate(
                    self.problem,
                    population.next_mut(slot),
                    self.config.mutation_rate,
                    rng,
                )?;
                slot += 2;
            }

            self.evaluator.evaluate(
                self.fitness,
                self.problem,
                population.next_genes_from(elites),
                &mut next_fitness[elites..],
            );
            population.advance();
            std::mem::swap(&mut fitness, &mut next_fitness);

            let stats = GenerationStatistics::compute(
                scope.generation() + 1,
                &fitness,
                &population,
                scope.elapsed(),
            );
            debug!(
                event = "generation",
                generation = stats.generation,
                best = stats.best,
                mean = stats.mean,
                worst = stats.worst,
                diversity = stats.diversity,
            );
            self.notify(&stats);
            scope.record_generation(stats);
        };

        let mut ranked: Vec<RankedGenome> = Vec::with_capacity(size);
        for i in rank(&fitness) {
            let genes = population.genome(i);
            if ranked.iter().all(|r| r.genes != genes) {
                ranked.push(RankedGenome {
                    genes: genes.to_vec(),
                    fitness: fitness[i],
                });
            }
        }
        for listener in &self.listeners {
            listener.on_search_ended(reason, &ranked[0].fitness);
        }

        Ok(SearchOutcome {
            ranked,
            generations: scope.generation(),
            termination: reason,
            history: scope.take_history(),
            elapsed: scope.elapsed(),
        })
    }
}

/// Indices sorted by descending fitness; ties keep index order.
fn rank(fitness: &[FitnessResult]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    order.sort_by(|&a, &b| fitness[b].fitness.total_cmp(&fitness[a].fitness));
    order
}

#[cfg(test)]
mod tests;
