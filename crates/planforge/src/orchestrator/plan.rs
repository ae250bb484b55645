//! Ranked genomes to allocation plans.

use planforge_core::{Allocation, AllocationPlan, ResourceUtilization, Result};
use planforge_ga::{AllocationProblem, FitnessResult, RankedGenome};
use planforge_ml::{AllocationContext, ModelSession};

/// An allocation plan plus the prediction spread and load behind it.
#[derive(Debug, Clone)]
pub(crate) struct ScoredPlan {
    pub plan: AllocationPlan,
    pub fitness: FitnessResult,
    /// Position in the final ranking, 0 for the best genome.
    pub rank: usize,
    /// Resource index per task, in request order.
    pub resources: Vec<usize>,
    /// Mean coefficient of variation of the duration predictions.
    pub mean_cv: f64,
    pub mean_suitability: f64,
    pub utilization: Vec<ResourceUtilization>,
}

impl ScoredPlan {
    /// Cost, completion and quality of `self` minus those of `other`.
    pub fn deltas(&self, other: &ScoredPlan) -> (f64, f64, f64) {
        (
            self.plan.predicted_cost() - other.plan.predicted_cost(),
            f64::from(self.plan.completion_day) - f64::from(other.plan.completion_day),
            self.mean_suitability - other.mean_suitability,
        )
    }

    pub fn max_utilization(&self) -> f64 {
        self.utilization
            .iter()
            .map(|u| u.utilization)
            .fold(0.0, f64::max)
    }
}

/// Decodes genomes and attaches duration and suitability predictions.
pub(crate) struct PlanBuilder<'a> {
    pub problem: &'a AllocationProblem,
    pub models: &'a ModelSession<'a>,
    pub window_hours: f64,
    pub uncertainty: f64,
}

impl PlanBuilder<'_> {
    pub fn build(&self, rank: usize, ranked: &RankedGenome) -> Result<ScoredPlan> {
        let problem = self.problem;
        let schedule = problem.decode(&ranked.genes);
        let ctx = AllocationContext::new(problem.horizon_days(), self.window_hours);

        let mut load = vec![0.0; problem.resource_count()];
        let mut allocations: Vec<Option<Allocation>> = vec![None; problem.task_count()];
        let mut cv_sum = 0.0;
        let mut suitability_sum = 0.0;

        // Suitability sees the load planned before each task.
        for &t in problem.order() {
            let entry = schedule.entries[t];
            let task = &problem.tasks()[t];
            let resource = &problem.resources()[entry.resource];
            let duration =
                self.models
                    .predict_duration(task, resource, self.window_hours, self.uncertainty)?;
            let suitability = self.models.score_allocation(
                task,
                resource,
                &ctx.at(entry.start, load[entry.resource]),
                self.uncertainty,
            )?;
            load[entry.resource] += entry.hours;
            cv_sum += duration.cv();
            suitability_sum += suitability.value;

            allocations[t] = Some(Allocation {
                task_id: task.id.clone(),
                resource_id: resource.id.clone(),
                start_day: entry.start,
                end_day: entry.end,
                planned_hours: entry.hours,
                cost: entry.cost,
                predicted_hours: duration.value,
                prediction_std: duration.std,
                suitability: suitability.value,
            });
        }

        let n = problem.task_count().max(1) as f64;
        let plan = AllocationPlan {
            allocations: allocations.into_iter().flatten().collect(),
            fitness: ranked.fitness.fitness,
            total_cost: schedule.total_cost,
            completion_day: schedule.makespan,
            violations: ranked.fitness.violations,
        };
        let resources = schedule.entries.iter().map(|e| e.resource).collect();
        let utilization = utilization(problem, &plan, &load);

        Ok(ScoredPlan {
            plan,
            fitness: ranked.fitness,
            rank,
            resources,
            mean_cv: cv_sum / n,
            mean_suitability: suitability_sum / n,
            utilization,
        })
    }
}

/// Assigned over available hours of each resource up to the plan's
/// completion day.
fn utilization(
    problem: &AllocationProblem,
    plan: &AllocationPlan,
    assigned: &[f64],
) -> Vec<ResourceUtilization> {
    problem
        .resources()
        .iter()
        .enumerate()
        .map(|(r, resource)| {
            let end = resource
                .availability
                .end_within(problem.horizon_days())
                .min(plan.completion_day);
            let days = end.saturating_sub(resource.availability.start_day);
            let available = problem.daily_hours(r) * f64::from(days);
            let utilization = if available > 0.0 {
                assigned[r] / available
            } else if assigned[r] > 0.0 {
                1.0
            } else {
                0.0
            };
            ResourceUtilization {
                resource_id: resource.id.clone(),
                assigned_hours: assigned[r],
                available_hours: available,
                utilization,
            }
        })
        .collect()
}
