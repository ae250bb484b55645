//! PlanForge GA - genetic search over task/resource allocations.
//!
//! This crate provides:
//! - [`AllocationProblem`]: read-only eligibility tables and schedule decoding
//! - [`FitnessFunction`]: goal-weighted multi-objective fitness with penalties
//! - [`GeneticSearch`]: seeded generational search with elitism
//! - Termination conditions, per-generation statistics and listeners
//!
//! Genomes live in a flat, double-buffered arena ([`Population`]) and are
//! evaluated in parallel on a bounded rayon pool.
//!
//! # Example
//!
//! ```
//! use planforge_config::{GeneticConfig, GoalWeightTable};
//! use planforge_core::{OptimizationGoal, OptimizationRequest, Resource, Task};
//! use planforge_ga::{AllocationProblem, FitnessFunction, GeneticSearch};
//!
//! let request = OptimizationRequest::new(
//!     "demo",
//!     vec![Task::new("t1", 8.0), Task::new("t2", 16.0)],
//!     vec![Resource::new("r1", "eng"), Resource::new("r2", "eng")],
//!     30,
//! );
//! let config = GeneticConfig::default()
//!     .with_population_size(10)
//!     .with_max_generations(5);
//! let problem = AllocationProblem::new(&request).unwrap();
//! let weights = GoalWeightTable::default().get(OptimizationGoal::MinimizeCost);
//! let fitness = FitnessFunction::new(&problem, weights, config.violation_penalty);
//!
//! let outcome = GeneticSearch::new(&problem, &fitness, &config)
//!     .with_seed(7)
//!     .run()
//!     .unwrap();
//! assert_eq!(outcome.best().genes.len(), 2);
//! ```

pub mod evaluator;
pub mod event;
pub mod fitness;
pub mod genome;
pub mod operators;
pub mod problem;
pub mod scope;
pub mod search;
pub mod statistics;
pub mod termination;

pub use evaluator::ParallelEvaluator;
pub use event::GenerationListener;
pub use fitness::{FitnessFunction, FitnessResult};
pub use genome::{hamming_distance, Gene, Population};
pub use problem::{AllocationProblem, Schedule, ScheduledTask};
pub use scope::{CancellationToken, SearchScope};
pub use search::{GeneticSearch, RankedGenome, SearchOutcome};
pub use statistics::GenerationStatistics;
pub use termination::Termination;
