//! Optimization orchestrator.
//!
//! Validates a request, prices every eligible task/resource pair with the
//! model manager, runs the genetic search and turns the final ranking into
//! an [`OptimizationResult`] with alternatives, recommendations and
//! bottleneck warnings.

mod advice;
mod plan;

use std::sync::Arc;
use std::time::Instant;

use planforge_config::EngineConfig;
use planforge_core::{
    GoalWeights, OptimizationRequest, OptimizationResult, PlanForgeError, Result, ResultId,
};
use planforge_ga::{
    hamming_distance, AllocationProblem, CancellationToken, FitnessFunction, GeneticSearch,
    ParallelEvaluator,
};
use planforge_ml::{AllocationContext, ModelManager};
use tracing::info;

use advice::Advisor;
use plan::{PlanBuilder, ScoredPlan};

/// Drives one optimization request from validation to result.
#[derive(Debug)]
pub struct Orchestrator {
    config: EngineConfig,
    models: Arc<ModelManager>,
    evaluator: ParallelEvaluator,
}

impl Orchestrator {
    /// Creates an orchestrator with a fitness pool sized from
    /// `config.worker_threads`.
    pub fn new(config: EngineConfig, models: Arc<ModelManager>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| PlanForgeError::Validation(e.to_string()))?;
        let evaluator = ParallelEvaluator::with_threads(config.worker_threads.resolve())?;
        Ok(Self {
            config,
            models,
            evaluator,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Weight override from the request, else the configured goal vector.
    pub fn weights_for(&self, request: &OptimizationRequest) -> GoalWeights {
        request
            .preferences
            .weights
            .unwrap_or_else(|| self.config.goal_weights.get(request.goal))
    }

    /// Runs `request` to completion, a deadline or cancellation.
    ///
    /// # Errors
    ///
    /// `Validation` for malformed requests, `ConstraintInfeasible` when a
    /// task cannot be staffed, and `Cancelled` when `cancel` trips before
    /// the first generation exists.
    pub fn optimize(
        &self,
        request: &OptimizationRequest,
        id: ResultId,
        cancel: CancellationToken,
    ) -> Result<OptimizationResult> {
        let started = Instant::now();
        request.validate()?;
        let weights = self.weights_for(request);
        weights.validate()?;

        let genetic = &self.config.genetic;
        let uncertainty = self.config.orchestrator.heuristic_uncertainty;
        let window = request.constraints.working_hours.length();
        let ctx = AllocationContext::new(request.horizon_days, window);

        info!(
            event = "optimize_start",
            project_id = %request.project_id,
            tasks = request.tasks.len(),
            resources = request.resources.len(),
            goal = %request.goal,
            population = genetic.population_size,
        );

        let models = self.models.session();
        let problem = AllocationProblem::new(request)?
            .with_pair_estimates(|task, resource| {
                let hours = models.predict_duration(task, resource, window, uncertainty)?;
                let fit = models.score_allocation(task, resource, &ctx, uncertainty)?;
                Ok((hours.value, fit.value))
            })?;
        let fitness = FitnessFunction::new(&problem, weights, genetic.violation_penalty);
        let seed = request
            .seed
            .or(self.config.random_seed)
            .unwrap_or_default();

        let outcome = GeneticSearch::new(&problem, &fitness, genetic)
            .with_seed(seed)
            .with_time_limit(request.timeout)
            .with_cancellation(cancel)
            .with_evaluator(self.evaluator.clone())
            .run()?;

        let builder = PlanBuilder {
            problem: &problem,
            models: &models,
            window_hours: window,
            uncertainty,
        };
        let best = builder.build(0, outcome.best())?;
        let alternatives = self.select_alternatives(&builder, request, &outcome.ranked)?;
        let reference = if outcome.ranked.len() > 1 {
            let mid = outcome.ranked.len() / 2;
            Some(builder.build(mid, &outcome.ranked[mid])?)
        } else {
            None
        };

        let advisor = Advisor {
            problem: &problem,
            request,
            config: &self.config.orchestrator,
        };
        let bottlenecks = advisor.bottlenecks(&best);
        let recommendations =
            advisor.recommendations(&best, &alternatives, reference.as_ref(), &bottlenecks);

        let average_utilization = if best.utilization.is_empty() {
            0.0
        } else {
            best.utilization.iter().map(|u| u.utilization).sum::<f64>()
                / best.utilization.len() as f64
        };
        let partial = outcome.is_partial();

        info!(
            event = "optimize_end",
            project_id = %request.project_id,
            result_id = %id,
            best_fitness = best.plan.fitness,
            generations = outcome.generations,
            termination = ?outcome.termination,
            partial,
            projected_cost = best.plan.predicted_cost(),
            duration_ms = started.elapsed().as_millis() as u64,
        );

        Ok(OptimizationResult {
            id,
            project_id: request.project_id.clone(),
            goal: request.goal,
            projected_cost: best.plan.predicted_cost(),
            projected_completion_day: best.plan.completion_day,
            average_utilization,
            utilization: best.utilization,
            best: best.plan,
            alternatives: alternatives.into_iter().map(|a| a.plan).collect(),
            recommendations,
            bottlenecks,
            generations: outcome.generations,
            termination: outcome.termination,
            partial,
        })
    }

    /// Up to `preferences.alternatives` runners-up, each at least
    /// `diversity_threshold` away (Hamming) from the best and from each
    /// other.
    fn select_alternatives(
        &self,
        builder: &PlanBuilder<'_>,
        request: &OptimizationRequest,
        ranked: &[planforge_ga::RankedGenome],
    ) -> Result<Vec<ScoredPlan>> {
        let wanted = request.preferences.alternatives;
        let threshold = request.preferences.diversity_threshold;
        let mut chosen: Vec<usize> = vec![0];
        let mut plans = Vec::new();
        for (rank, candidate) in ranked.iter().enumerate().skip(1) {
            if plans.len() >= wanted {
                break;
            }
            let diverse = chosen
                .iter()
                .all(|&c| hamming_distance(&ranked[c].genes, &candidate.genes) >= threshold);
            if diverse {
                chosen.push(rank);
                plans.push(builder.build(rank, candidate)?);
            }
        }
        Ok(plans)
    }
}
