//! Recommendations and bottleneck warnings.

use std::collections::BTreeMap;

use planforge_config::OrchestratorConfig;
use planforge_core::{
    BottleneckKind, BottleneckWarning, OptimizationRequest, Recommendation, RecommendationKind,
    RiskFlag, RiskLevel,
};
use planforge_ga::AllocationProblem;

use super::plan::ScoredPlan;

/// Blends GA rank and fitness with prediction certainty.
///
/// `0.5 · fitness / (rank + 1) + 0.5 · (1 − min(cv, 1))`
pub(crate) fn confidence(fitness: f64, rank: usize, cv: f64) -> f64 {
    let search = fitness / (rank as f64 + 1.0);
    let certainty = 1.0 - cv.clamp(0.0, 1.0);
    (0.5 * search + 0.5 * certainty).clamp(0.0, 1.0)
}

pub(crate) struct Advisor<'a> {
    pub problem: &'a AllocationProblem,
    pub request: &'a OptimizationRequest,
    pub config: &'a OrchestratorConfig,
}

impl Advisor<'_> {
    pub fn bottlenecks(&self, best: &ScoredPlan) -> Vec<BottleneckWarning> {
        let mut warnings = Vec::new();

        let mut overloaded: Vec<_> = best
            .utilization
            .iter()
            .filter(|u| u.utilization > self.config.overload_threshold)
            .collect();
        overloaded.sort_by(|a, b| b.utilization.total_cmp(&a.utilization));
        for u in overloaded {
            let severity = if u.utilization >= 1.2 {
                RiskLevel::Critical
            } else if u.utilization >= 1.05 {
                RiskLevel::High
            } else {
                RiskLevel::Medium
            };
            warnings.push(BottleneckWarning {
                kind: BottleneckKind::ResourceOverload {
                    resource_id: u.resource_id.clone(),
                    utilization: u.utilization,
                },
                severity,
                message: format!(
                    "resource '{}' is {:.0}% utilized ({:.1}h of {:.1}h)",
                    u.resource_id,
                    u.utilization * 100.0,
                    u.assigned_hours,
                    u.available_hours
                ),
            });
        }

        for (skill, (demand, supply)) in self.skill_balance() {
            if supply >= demand {
                continue;
            }
            let severity = if supply == 0 {
                RiskLevel::Critical
            } else if supply * 2 <= demand {
                RiskLevel::High
            } else {
                RiskLevel::Medium
            };
            warnings.push(BottleneckWarning {
                message: format!(
                    "{demand} tasks need '{skill}' but only {supply} resources hold it"
                ),
                kind: BottleneckKind::SkillShortage {
                    skill,
                    demand,
                    supply,
                },
                severity,
            });
        }
        warnings
    }

    /// Tasks needing and resources holding each skill.
    fn skill_balance(&self) -> BTreeMap<String, (usize, usize)> {
        let mut balance: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for task in self.problem.tasks() {
            for skill in &task.required_skills {
                balance.entry(skill.clone()).or_default().0 += 1;
            }
        }
        for (skill, entry) in balance.iter_mut() {
            entry.1 = self
                .problem
                .resources()
                .iter()
                .filter(|r| r.has_skill(skill))
                .count();
        }
        balance
    }

    fn risk_flags(&self, plan: &ScoredPlan) -> Vec<RiskFlag> {
        let constraints = &self.request.constraints;
        let mut flags = Vec::new();
        if constraints
            .budget
            .is_some_and(|b| plan.plan.predicted_cost() > b)
        {
            flags.push(RiskFlag::BudgetOverrun);
        }
        let task_late = plan.plan.allocations.iter().zip(self.problem.tasks()).any(
            |(a, t)| t.deadline_day.is_some_and(|d| a.end_day > d),
        );
        if task_late
            || constraints
                .deadline_day
                .is_some_and(|d| plan.plan.completion_day > d)
        {
            flags.push(RiskFlag::DeadlineMiss);
        }
        if plan.mean_cv > self.config.high_uncertainty_cv {
            flags.push(RiskFlag::HighUncertainty);
        }
        if plan.max_utilization() > self.config.overload_threshold {
            flags.push(RiskFlag::OverAllocation);
        }
        if plan.mean_suitability < self.config.low_suitability {
            flags.push(RiskFlag::LowSuitability);
        }
        flags
    }

    /// Ranked recommendations: adopt the best plan, consider alternatives,
    /// reassign poorly suited tasks and add capacity where warnings fire.
    ///
    /// `reference` is the typical candidate the best plan is compared
    /// against; without one the adopt deltas are zero.
    pub fn recommendations(
        &self,
        best: &ScoredPlan,
        alternatives: &[ScoredPlan],
        reference: Option<&ScoredPlan>,
        bottlenecks: &[BottleneckWarning],
    ) -> Vec<Recommendation> {
        let mut recs = Vec::new();
        let all_tasks: Vec<String> = best
            .plan
            .allocations
            .iter()
            .map(|a| a.task_id.clone())
            .collect();

        let (cost_delta, time_delta_days, quality_delta) =
            reference.map_or((0.0, 0.0, 0.0), |r| best.deltas(r));
        recs.push(Recommendation {
            id: String::new(),
            kind: RecommendationKind::AdoptPlan,
            title: "Adopt the optimized allocation".into(),
            description: format!(
                "Assign {} tasks for a projected cost of {:.2}, finishing on day {}",
                best.plan.allocations.len(),
                best.plan.predicted_cost(),
                best.plan.completion_day
            ),
            task_ids: all_tasks.clone(),
            resource_ids: used_resources(best),
            confidence: confidence(best.fitness.fitness, best.rank, best.mean_cv),
            cost_delta,
            time_delta_days,
            quality_delta,
            risk_flags: self.risk_flags(best),
        });

        for alt in alternatives {
            let (cost_delta, time_delta_days, quality_delta) = alt.deltas(best);
            recs.push(Recommendation {
                id: String::new(),
                kind: RecommendationKind::Alternative,
                title: format!("Alternative allocation #{}", alt.rank),
                description: format!(
                    "Differs from the best plan in {} assignments",
                    alt.resources
                        .iter()
                        .zip(&best.resources)
                        .filter(|(a, b)| a != b)
                        .count()
                ),
                task_ids: all_tasks.clone(),
                resource_ids: used_resources(alt),
                confidence: confidence(alt.fitness.fitness, alt.rank, alt.mean_cv),
                cost_delta,
                time_delta_days,
                quality_delta,
                risk_flags: self.risk_flags(alt),
            });
        }

        recs.extend(self.reassignments(best));
        recs.extend(self.capacity(best, bottlenecks));

        recs.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        recs.truncate(self.config.max_recommendations);
        for (i, rec) in recs.iter_mut().enumerate() {
            rec.id = format!("rec-{}", i + 1);
        }
        recs
    }

    fn reassignments(&self, best: &ScoredPlan) -> Vec<Recommendation> {
        let problem = self.problem;
        let mut recs = Vec::new();
        for (t, allocation) in best.plan.allocations.iter().enumerate() {
            if allocation.suitability >= self.config.low_suitability {
                continue;
            }
            let current = best.resources[t];
            let candidate = problem
                .eligible(t)
                .iter()
                .map(|&r| r as usize)
                .filter(|&r| r != current)
                .max_by(|&a, &b| problem.quality(t, a).total_cmp(&problem.quality(t, b)));
            let Some(r) = candidate else {
                continue;
            };
            let quality = problem.quality(t, r);
            if quality <= allocation.suitability {
                continue;
            }

            let cv = if allocation.predicted_hours > 0.0 {
                allocation.prediction_std / allocation.predicted_hours
            } else {
                0.0
            };
            let mut risk_flags = vec![RiskFlag::LowSuitability];
            if cv > self.config.high_uncertainty_cv {
                risk_flags.push(RiskFlag::HighUncertainty);
            }
            let target = &problem.resources()[r];
            recs.push(Recommendation {
                id: String::new(),
                kind: RecommendationKind::Reassign,
                title: format!("Reassign '{}' to '{}'", allocation.task_id, target.id),
                description: format!(
                    "Suitability {:.2} on '{}' versus {:.2} on '{}'",
                    allocation.suitability, allocation.resource_id, quality, target.id
                ),
                task_ids: vec![allocation.task_id.clone()],
                resource_ids: vec![allocation.resource_id.clone(), target.id.clone()],
                confidence: (0.5 * quality + 0.5 * (1.0 - cv.clamp(0.0, 1.0))).clamp(0.0, 1.0),
                cost_delta: problem.cost(t, r) - problem.cost(t, current),
                time_delta_days: f64::from(problem.duration_days(t, r))
                    - f64::from(problem.duration_days(t, current)),
                quality_delta: quality - allocation.suitability,
                risk_flags,
            });
        }
        recs
    }

    fn capacity(&self, best: &ScoredPlan, bottlenecks: &[BottleneckWarning]) -> Vec<Recommendation> {
        let problem = self.problem;
        let severity_confidence = |level: RiskLevel| match level {
            RiskLevel::Low => 0.3,
            RiskLevel::Medium => 0.5,
            RiskLevel::High => 0.7,
            RiskLevel::Critical => 0.9,
        };

        bottlenecks
            .iter()
            .filter_map(|warning| match &warning.kind {
                BottleneckKind::ResourceOverload {
                    resource_id,
                    utilization,
                } => {
                    let r = problem.resources().iter().position(|r| &r.id == resource_id)?;
                    let u = best.utilization.get(r)?;
                    let excess = u.assigned_hours - self.config.overload_threshold * u.available_hours;
                    let daily = problem.daily_hours(r);
                    let tasks = best
                        .plan
                        .allocations
                        .iter()
                        .filter(|a| &a.resource_id == resource_id)
                        .map(|a| a.task_id.clone())
                        .collect();
                    Some(Recommendation {
                        id: String::new(),
                        kind: RecommendationKind::AddCapacity,
                        title: format!("Relieve '{resource_id}'"),
                        description: format!(
                            "'{resource_id}' runs at {:.0}%; move work or add a resource",
                            utilization * 100.0
                        ),
                        task_ids: tasks,
                        resource_ids: vec![resource_id.clone()],
                        confidence: severity_confidence(warning.severity),
                        cost_delta: 0.0,
                        time_delta_days: if daily > 0.0 {
                            -(excess.max(0.0) / daily)
                        } else {
                            0.0
                        },
                        quality_delta: 0.0,
                        risk_flags: vec![RiskFlag::OverAllocation],
                    })
                }
                BottleneckKind::SkillShortage { skill, .. } => Some(Recommendation {
                    id: String::new(),
                    kind: RecommendationKind::AddCapacity,
                    title: format!("Add '{skill}' capacity"),
                    description: warning.message.clone(),
                    task_ids: problem
                        .tasks()
                        .iter()
                        .filter(|t| t.required_skills.contains(skill))
                        .map(|t| t.id.clone())
                        .collect(),
                    resource_ids: problem
                        .resources()
                        .iter()
                        .filter(|r| r.has_skill(skill))
                        .map(|r| r.id.clone())
                        .collect(),
                    confidence: severity_confidence(warning.severity),
                    cost_delta: 0.0,
                    time_delta_days: 0.0,
                    quality_delta: 0.0,
                    risk_flags: vec![RiskFlag::SkillGap],
                }),
            })
            .collect()
    }
}

fn used_resources(plan: &ScoredPlan) -> Vec<String> {
    let mut ids: Vec<String> = plan
        .plan
        .allocations
        .iter()
        .map(|a| a.resource_id.clone())
        .collect();
    ids.sort();
    ids.dedup();
    ids
}
