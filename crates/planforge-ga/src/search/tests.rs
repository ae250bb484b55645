//! Search loop tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use planforge_config::{GeneticConfig, GoalWeightTable};
use planforge_core::{OptimizationGoal, OptimizationRequest, PlanForgeError, Task};
use planforge_test::project_request;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::*;

fn setup(request: &OptimizationRequest) -> (AllocationProblem, FitnessFunction) {
    let problem = AllocationProblem::new(request).unwrap();
    let weights = GoalWeightTable::default().get(OptimizationGoal::MinimizeCost);
    let fitness = FitnessFunction::new(&problem, weights, 0.1);
    (problem, fitness)
}

fn small_config() -> GeneticConfig {
    GeneticConfig::default()
        .with_population_size(20)
        .with_max_generations(50)
}

#[test]
fn test_best_fitness_never_decreases() {
    let (problem, fitness) = setup(&project_request(10, 5));
    let config = small_config();
    let outcome = GeneticSearch::new(&problem, &fitness, &config)
        .with_seed(42)
        .run()
        .unwrap();

    assert!(outcome.history.len() >= 2);
    for pair in outcome.history.windows(2) {
        assert!(pair[1].best >= pair[0].best, "{} < {}", pair[1].best, pair[0].best);
    }
    assert_eq!(outcome.best().fitness.fitness, outcome.history.last().unwrap().best);
}

#[test]
fn test_same_seed_same_outcome() {
    let (problem, fitness) = setup(&project_request(10, 5));
    let config = small_config();
    let run = |seed| {
        GeneticSearch::new(&problem, &fitness, &config)
            .with_seed(seed)
            .run()
            .unwrap()
    };
    let a = run(7);
    let b = run(7);
    assert_eq!(a.ranked, b.ranked);
    assert_eq!(a.generations, b.generations);
    assert_eq!(a.termination, b.termination);
}

#[test]
fn test_parallel_evaluation_is_deterministic() {
    let (problem, fitness) = setup(&project_request(10, 5));
    let config = small_config();
    let sequential = GeneticSearch::new(&problem, &fitness, &config)
        .with_seed(3)
        .run()
        .unwrap();
    let parallel = GeneticSearch::new(&problem, &fitness, &config)
        .with_seed(3)
        .with_evaluator(ParallelEvaluator::with_threads(4).unwrap())
        .run()
        .unwrap();
    assert_eq!(sequential.ranked, parallel.ranked);
}

#[test]
fn test_genomes_are_complete_and_eligible() {
    let (problem, fitness) = setup(&project_request(12, 6));
    let config = small_config().with_max_generations(10);
    let outcome = GeneticSearch::new(&problem, &fitness, &config)
        .with_seed(1)
        .run()
        .unwrap();
    for ranked in &outcome.ranked {
        assert_eq!(ranked.genes.len(), 12);
        for (t, g) in ranked.genes.iter().enumerate() {
            assert!((g.resource as usize) < problem.resource_count());
            assert!(problem.is_eligible(t, g.resource));
        }
    }
}

#[test]
fn test_search_beats_random_individual() {
    let (problem, fitness) = setup(&project_request(10, 5));
    let config = small_config();
    let outcome = GeneticSearch::new(&problem, &fitness, &config)
        .with_seed(11)
        .run()
        .unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let random: Vec<Gene> = (0..10)
        .map(|t| problem.random_gene(t, &mut rng).unwrap())
        .collect();
    let baseline = fitness.evaluate(&problem, &random);
    assert!(outcome.best().fitness.fitness >= baseline.fitness);
}

#[test]
fn test_stagnation_converges() {
    let (problem, fitness) = setup(&project_request(6, 3));
    // No improvement can exceed an epsilon of 1.
    let config = small_config()
        .with_max_generations(1000)
        .with_stagnation(5, 1.0);
    let outcome = GeneticSearch::new(&problem, &fitness, &config)
        .with_seed(5)
        .run()
        .unwrap();
    assert_eq!(outcome.termination, TerminationReason::Converged);
    assert_eq!(outcome.generations, 5);
    assert!(!outcome.is_partial());
}

#[test]
fn test_deadline_returns_best_so_far() {
    let (problem, fitness) = setup(&project_request(10, 5));
    let config = small_config().with_max_generations(10_000);
    let outcome = GeneticSearch::new(&problem, &fitness, &config)
        .with_seed(5)
        .with_time_limit(Some(Duration::ZERO))
        .run()
        .unwrap();
    assert_eq!(outcome.termination, TerminationReason::Deadline);
    assert!(outcome.is_partial());
    assert_eq!(outcome.generations, 0);
    assert!(!outcome.ranked.is_empty());
}

#[derive(Debug)]
struct CancelAfter {
    generations: u32,
    seen: AtomicU32,
    token: CancellationToken,
}

impl GenerationListener for CancelAfter {
    fn on_generation(&self, _stats: &GenerationStatistics) {
        if self.seen.fetch_add(1, Ordering::SeqCst) + 1 > self.generations {
            self.token.cancel();
        }
    }
}

#[test]
fn test_cancellation_mid_run_is_partial() {
    let (problem, fitness) = setup(&project_request(10, 5));
    let config = small_config().with_max_generations(10_000);
    let token = CancellationToken::new();
    let listener = Arc::new(CancelAfter {
        generations: 3,
        seen: AtomicU32::new(0),
        token: token.clone(),
    });
    let outcome = GeneticSearch::new(&problem, &fitness, &config)
        .with_seed(5)
        .with_cancellation(token)
        .with_listener(listener)
        .run()
        .unwrap();
    assert_eq!(outcome.termination, TerminationReason::Cancelled);
    assert_eq!(outcome.generations, 3);
    assert!(outcome.is_partial());
}

#[test]
fn test_cancelled_before_start() {
    let (problem, fitness) = setup(&project_request(4, 2));
    let config = small_config();
    let token = CancellationToken::new();
    token.cancel();
    let err = GeneticSearch::new(&problem, &fitness, &config)
        .with_cancellation(token)
        .run()
        .unwrap_err();
    assert!(matches!(err, PlanForgeError::Cancelled));
}

#[test]
fn test_unstaffable_task_is_infeasible() {
    let mut request = project_request(4, 3);
    request.tasks.push(Task::new("ml", 8.0).with_skills(["ml"]));
    let (problem, fitness) = setup(&request);
    let config = small_config();
    let err = GeneticSearch::new(&problem, &fitness, &config)
        .run()
        .unwrap_err();
    assert!(matches!(err, PlanForgeError::ConstraintInfeasible(_)));
}
