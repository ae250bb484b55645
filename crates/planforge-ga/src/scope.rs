//! Search-level scope.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::statistics::GenerationStatistics;

/// Shared flag that asks running searches and forecasts to stop.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Mutable state of one genetic search: RNG, clock, progress counters and
/// the recorded generation history.
#[derive(Debug)]
pub struct SearchScope {
    rng: ChaCha8Rng,
    start_time: Instant,
    generation: u32,
    best_fitness: f64,
    /// Best fitness at the last improvement larger than `epsilon`.
    reference_fitness: f64,
    stale_generations: u32,
    epsilon: f64,
    cancel: CancellationToken,
    history: Vec<GenerationStatistics>,
}

impl SearchScope {
    pub fn new(seed: u64, epsilon: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            start_time: Instant::now(),
            generation: 0,
            best_fitness: f64::NEG_INFINITY,
            reference_fitness: f64::NEG_INFINITY,
            stale_generations: 0,
            epsilon,
            cancel: CancellationToken::new(),
            history: Vec::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Generations completed after the initial population.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    /// Consecutive generations without an improvement above epsilon.
    pub fn stale_generations(&self) -> u32 {
        self.stale_generations
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn history(&self) -> &[GenerationStatistics] {
        &self.history
    }

    /// Records the statistics of the initial population.
    pub fn start(&mut self, initial: GenerationStatistics) {
        self.generation = 0;
        self.best_fitness = initial.best;
        self.reference_fitness = initial.best;
        self.stale_generations = 0;
        self.history.clear();
        self.history.push(initial);
    }

    /// Records a completed generation and updates the stagnation counter.
    pub fn record_generation(&mut self, stats: GenerationStatistics) {
        self.generation = stats.generation;
        if stats.best > self.reference_fitness + self.epsilon {
            self.reference_fitness = stats.best;
            self.stale_generations = 0;
        } else {
            self.stale_generations += 1;
        }
        self.best_fitness = self.best_fitness.max(stats.best);
        self.history.push(stats);
    }

    pub fn take_history(&mut self) -> Vec<GenerationStatistics> {
        std::mem::take(&mut self.history)
    }
}
