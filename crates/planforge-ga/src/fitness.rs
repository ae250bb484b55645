//! Goal-weighted fitness.

use planforge_core::GoalWeights;

use crate::genome::Gene;
use crate::problem::{AllocationProblem, Schedule};

/// Fitness of one genome with the sub-scores that produced it.
///
/// Every sub-score is normalized to [0, 1], higher is better.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitnessResult {
    pub fitness: f64,
    pub cost: f64,
    pub utilization: f64,
    pub duration: f64,
    pub quality: f64,
    pub idle: f64,
    pub violations: u32,
    pub penalty: f64,
    pub total_cost: f64,
    pub makespan: u32,
}

/// Scores decoded schedules as
/// `baseline + Σ weight·sub-score − penalty·violations`, clamped to [0, 1].
#[derive(Debug, Clone)]
pub struct FitnessFunction {
    weights: GoalWeights,
    violation_penalty: f64,
    min_cost: f64,
    max_cost: f64,
    min_makespan: u32,
}

impl FitnessFunction {
    pub fn new(problem: &AllocationProblem, weights: GoalWeights, violation_penalty: f64) -> Self {
        let (min_cost, max_cost) = problem.cost_bounds();
        Self {
            weights,
            violation_penalty,
            min_cost,
            max_cost,
            min_makespan: problem.makespan_lower_bound(),
        }
    }

    pub fn weights(&self) -> &GoalWeights {
        &self.weights
    }

    pub fn evaluate(&self, problem: &AllocationProblem, genes: &[Gene]) -> FitnessResult {
        let schedule = problem.decode(genes);
        self.score(problem, &schedule)
    }

    pub fn score(&self, problem: &AllocationProblem, schedule: &Schedule) -> FitnessResult {
        let cost = if self.max_cost > self.min_cost {
            ((self.max_cost - schedule.total_cost) / (self.max_cost - self.min_cost)).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let upper = problem
            .horizon_days()
            .max(self.min_makespan.saturating_add(1));
        let duration = (1.0
            - schedule.makespan.saturating_sub(self.min_makespan) as f64
                / (upper - self.min_makespan).max(1) as f64)
            .clamp(0.0, 1.0);

        let (utilization, idle) = resource_scores(problem, schedule);
        let quality = quality_score(problem, schedule);
        let violations = count_violations(problem, schedule);

        let w = &self.weights;
        let penalty = self.violation_penalty * violations as f64;
        let fitness = (w.baseline
            + w.cost * cost
            + w.utilization * utilization
            + w.duration * duration
            + w.quality * quality
            + w.idle * idle
            - penalty)
            .clamp(0.0, 1.0);

        FitnessResult {
            fitness,
            cost,
            utilization,
            duration,
            quality,
            idle,
            violations,
            penalty,
            total_cost: schedule.total_cost,
            makespan: schedule.makespan,
        }
    }
}

/// Mean capacity use over the makespan, and the share of each resource's
/// active span that is not idle.
fn resource_scores(problem: &AllocationProblem, schedule: &Schedule) -> (f64, f64) {
    let n = problem.resource_count();
    let mut assigned = vec![0.0; n];
    let mut busy = vec![0u64; n];
    let mut first = vec![u32::MAX; n];
    let mut last = vec![0u32; n];
    for e in &schedule.entries {
        assigned[e.resource] += e.hours;
        busy[e.resource] += u64::from(e.days());
        first[e.resource] = first[e.resource].min(e.start);
        last[e.resource] = last[e.resource].max(e.end);
    }

    let mut util_sum = 0.0;
    let mut counted = 0usize;
    let mut span_total = 0u64;
    let mut idle_total = 0u64;
    for r in 0..n {
        let daily = problem.daily_hours(r);
        if daily > 0.0 {
            counted += 1;
            if schedule.makespan > 0 {
                util_sum += (assigned[r] / (daily * schedule.makespan as f64)).min(1.0);
            }
        }
        if first[r] != u32::MAX {
            let span = u64::from(last[r] - first[r]);
            span_total += span;
            idle_total += span.saturating_sub(busy[r]);
        }
    }

    let utilization = if counted > 0 {
        util_sum / counted as f64
    } else {
        0.0
    };
    let idle = if span_total > 0 {
        1.0 - idle_total as f64 / span_total as f64
    } else {
        1.0
    };
    (utilization, idle)
}

/// Priority-weighted mean suitability of the chosen pairs.
fn quality_score(problem: &AllocationProblem, schedule: &Schedule) -> f64 {
    let mut total = 0.0;
    let mut weight = 0.0;
    for (t, e) in schedule.entries.iter().enumerate() {
        let w = 1.0 + problem.tasks()[t].priority.weight();
        total += w * problem.quality(t, e.resource);
        weight += w;
    }
    if weight > 0.0 {
        total / weight
    } else {
        0.0
    }
}

/// Budget overrun, project and task deadline misses, and work past a
/// resource's availability end.
fn count_violations(problem: &AllocationProblem, schedule: &Schedule) -> u32 {
    let mut violations = 0;
    if problem.budget().is_some_and(|b| schedule.total_cost > b) {
        violations += 1;
    }
    if problem.deadline_day().is_some_and(|d| schedule.makespan > d) {
        violations += 1;
    }
    for (t, e) in schedule.entries.iter().enumerate() {
        if problem.tasks()[t].deadline_day.is_some_and(|d| e.end > d) {
            violations += 1;
        }
        let available_until = problem.resources()[e.resource]
            .availability
            .end_within(problem.horizon_days());
        if e.end > available_until {
            violations += 1;
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use planforge_config::GoalWeightTable;
    use planforge_core::OptimizationGoal;
    use planforge_test::{chained_request, project_request};

    use super::*;

    fn cost_weights() -> GoalWeights {
        GoalWeightTable::default().get(OptimizationGoal::MinimizeCost)
    }

    #[test]
    fn test_fitness_within_unit_interval() {
        let problem = AllocationProblem::new(&project_request(6, 6)).unwrap();
        let fitness = FitnessFunction::new(&problem, cost_weights(), 0.1);
        let genes: Vec<Gene> = (0..6).map(|t| Gene::new(t as u16, 0)).collect();
        let result = fitness.evaluate(&problem, &genes);
        assert!((0.0..=1.0).contains(&result.fitness));
        assert_eq!(result.violations, 0);
        for s in [result.cost, result.utilization, result.duration, result.quality, result.idle] {
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn test_cheaper_assignment_scores_higher_cost() {
        // Resources 0 and 3 both hold "backend"; 3 charges 80/h vs 50/h.
        let problem = AllocationProblem::new(&project_request(1, 4)).unwrap();
        let fitness = FitnessFunction::new(&problem, cost_weights(), 0.1);
        let cheap = fitness.evaluate(&problem, &[Gene::new(0, 0)]);
        let dear = fitness.evaluate(&problem, &[Gene::new(3, 0)]);
        assert_eq!(cheap.cost, 1.0);
        assert_eq!(dear.cost, 0.0);
        assert!(cheap.fitness > dear.fitness);
    }

    #[test]
    fn test_violations_are_penalized() {
        let mut request = chained_request(3, 3);
        request.constraints.budget = Some(100.0);
        request.constraints.deadline_day = Some(2);
        let problem = AllocationProblem::new(&request).unwrap();
        let fitness = FitnessFunction::new(&problem, cost_weights(), 0.1);
        let genes = [Gene::new(0, 0), Gene::new(1, 0), Gene::new(2, 0)];
        let result = fitness.evaluate(&problem, &genes);
        assert_eq!(result.violations, 2);
        assert!((result.penalty - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_idle_gap_lowers_idle_score() {
        let problem = AllocationProblem::new(&project_request(4, 3)).unwrap();
        let fitness = FitnessFunction::new(&problem, cost_weights(), 0.1);
        let packed = [Gene::new(0, 0), Gene::new(1, 0), Gene::new(2, 0), Gene::new(0, 0)];
        let gapped = [Gene::new(0, 0), Gene::new(1, 0), Gene::new(2, 0), Gene::new(0, 10)];
        assert_eq!(fitness.evaluate(&problem, &packed).idle, 1.0);
        assert!(fitness.evaluate(&problem, &gapped).idle < 1.0);
    }
}
