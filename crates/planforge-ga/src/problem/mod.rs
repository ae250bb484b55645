//! Allocation problem tables and schedule decoding.
//!
//! The tables are built once per request and shared read-only by every
//! evaluation of the run.

use std::collections::HashMap;

use planforge_core::{
    dependency_order, OptimizationRequest, PlanForgeError, Resource, Result, Task,
};
use rand::seq::IndexedRandom;
use rand::Rng;
use smallvec::SmallVec;

use crate::genome::Gene;

/// Initial start offsets are drawn from `0..=INITIAL_OFFSET_SPAN` days.
const INITIAL_OFFSET_SPAN: u32 = 7;

/// Resource indices eligible for one task.
pub type Eligible = SmallVec<[u16; 8]>;

/// A decoded task placement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScheduledTask {
    pub resource: usize,
    pub start: u32,
    /// Exclusive end day.
    pub end: u32,
    pub hours: f64,
    pub cost: f64,
}

impl ScheduledTask {
    pub fn days(&self) -> u32 {
        self.end - self.start
    }
}

/// A genome decoded into concrete days, indexed like the request's tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub entries: Vec<ScheduledTask>,
    pub makespan: u32,
    pub total_cost: f64,
}

/// Read-only search tables for one optimization request.
#[derive(Debug, Clone)]
pub struct AllocationProblem {
    tasks: Vec<Task>,
    resources: Vec<Resource>,
    eligible: Vec<Eligible>,
    order: Vec<usize>,
    predecessors: Vec<SmallVec<[usize; 4]>>,
    /// Effective hours per day of each resource.
    daily_hours: Vec<f64>,
    /// Expected hours per (task, resource), row-major by task.
    hours: Vec<f64>,
    /// Suitability in [0, 1] per (task, resource), row-major by task.
    quality: Vec<f64>,
    horizon_days: u32,
    budget: Option<f64>,
    deadline_day: Option<u32>,
}

impl AllocationProblem {
    /// Builds the tables for `request`.
    ///
    /// A resource is eligible for a task when it holds every required
    /// skill, its availability window intersects the horizon and it has
    /// working time left inside the working-hours window.
    ///
    /// # Errors
    ///
    /// `Validation` for unknown or cyclic dependencies, and
    /// `ConstraintInfeasible` when a skill listed in the request's
    /// constraints is held by nobody in the pool.
    pub fn new(request: &OptimizationRequest) -> Result<Self> {
        let tasks = request.tasks.clone();
        let resources = request.resources.clone();
        let horizon_days = request.horizon_days;
        let window = request.constraints.working_hours.length();

        for skill in &request.constraints.required_skills {
            if !resources.iter().any(|r| r.has_skill(skill)) {
                return Err(PlanForgeError::ConstraintInfeasible(format!(
                    "required skill '{skill}' is not held by any resource"
                )));
            }
        }

        let daily_hours: Vec<f64> = resources
            .iter()
            .map(|r| r.effective_daily_hours(window))
            .collect();

        let eligible = tasks
            .iter()
            .map(|task| {
                resources
                    .iter()
                    .enumerate()
                    .filter(|(i, r)| {
                        r.covers(&task.required_skills)
                            && r.availability.intersects_horizon(horizon_days)
                            && daily_hours[*i] > 0.0
                    })
                    .map(|(i, _)| i as u16)
                    .collect()
            })
            .collect();

        let order = dependency_order(&tasks)?;
        let index: HashMap<&str, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();
        let predecessors = tasks
            .iter()
            .map(|t| {
                t.dependencies
                    .iter()
                    .filter_map(|d| index.get(d.as_str()).copied())
                    .collect()
            })
            .collect();

        let hours = tasks
            .iter()
            .flat_map(|t| std::iter::repeat(t.estimated_hours).take(resources.len()))
            .collect();
        let quality = tasks
            .iter()
            .flat_map(|_| resources.iter().map(|r| r.skill_level.clamp(0.0, 1.0)))
            .collect();

        Ok(Self {
            tasks,
            resources,
            eligible,
            order,
            predecessors,
            daily_hours,
            hours,
            quality,
            horizon_days,
            budget: request.constraints.budget,
            deadline_day: request.constraints.deadline_day,
        })
    }

    /// Replaces expected hours and suitability of every eligible pair with
    /// `estimate(task, resource)`. Non-finite or non-positive hours keep
    /// the task estimate.
    pub fn with_pair_estimates<F>(mut self, mut estimate: F) -> Result<Self>
    where
        F: FnMut(&Task, &Resource) -> Result<(f64, f64)>,
    {
        let width = self.resources.len();
        for (t, task) in self.tasks.iter().enumerate() {
            for &r in &self.eligible[t] {
                let r = r as usize;
                let (hours, quality) = estimate(task, &self.resources[r])?;
                if hours.is_finite() && hours > 0.0 {
                    self.hours[t * width + r] = hours;
                }
                if quality.is_finite() {
                    self.quality[t * width + r] = quality.clamp(0.0, 1.0);
                }
            }
        }
        Ok(self)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn eligible(&self, task: usize) -> &[u16] {
        &self.eligible[task]
    }

    pub fn is_eligible(&self, task: usize, resource: u16) -> bool {
        self.eligible[task].contains(&resource)
    }

    /// Task indices in dependency order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    pub fn budget(&self) -> Option<f64> {
        self.budget
    }

    pub fn deadline_day(&self) -> Option<u32> {
        self.deadline_day
    }

    pub fn daily_hours(&self, resource: usize) -> f64 {
        self.daily_hours[resource]
    }

    pub fn hours(&self, task: usize, resource: usize) -> f64 {
        self.hours[task * self.resources.len() + resource]
    }

    pub fn quality(&self, task: usize, resource: usize) -> f64 {
        self.quality[task * self.resources.len() + resource]
    }

    pub fn cost(&self, task: usize, resource: usize) -> f64 {
        self.hours(task, resource) * self.resources[resource].cost_rate
    }

    /// Whole days `resource` needs for `task`.
    pub fn duration_days(&self, task: usize, resource: usize) -> u32 {
        let daily = self.daily_hours[resource];
        if daily > 0.0 {
            (self.hours(task, resource) / daily).ceil().max(1.0) as u32
        } else {
            self.horizon_days.max(1)
        }
    }

    /// Draws a random gene for `task` and repairs it.
    pub fn random_gene<R: Rng>(&self, task: usize, rng: &mut R) -> Result<Gene> {
        let resource = rng.random_range(0..self.resources.len()) as u16;
        let span = INITIAL_OFFSET_SPAN.min(self.horizon_days.saturating_sub(1));
        let gene = Gene::new(resource, rng.random_range(0..=span));
        self.repair(task, gene, rng)
    }

    /// Makes `gene` valid for `task`.
    ///
    /// The start offset is clamped into the horizon. An ineligible resource
    /// is replaced by one drawn uniformly from the task's eligible set.
    ///
    /// # Errors
    ///
    /// `ConstraintInfeasible` when the task has no eligible resource.
    pub fn repair<R: Rng>(&self, task: usize, mut gene: Gene, rng: &mut R) -> Result<Gene> {
        gene.start_offset = gene.start_offset.min(self.horizon_days.saturating_sub(1));
        if self.is_eligible(task, gene.resource) {
            return Ok(gene);
        }
        match self.eligible[task].choose(rng) {
            Some(&resource) => {
                gene.resource = resource;
                Ok(gene)
            }
            None => {
                let t = &self.tasks[task];
                Err(PlanForgeError::ConstraintInfeasible(format!(
                    "task '{}' (skills: {}) has no eligible resource",
                    t.id,
                    if t.required_skills.is_empty() {
                        "none".to_string()
                    } else {
                        t.required_skills.join(", ")
                    }
                )))
            }
        }
    }

    /// Decodes `genes` into days.
    ///
    /// Tasks are placed in dependency order. A task starts at the latest of
    /// its gene offset, its resource's availability start, the finish of its
    /// dependencies and the moment its resource becomes free.
    pub fn decode(&self, genes: &[Gene]) -> Schedule {
        let mut entries = vec![ScheduledTask::default(); self.tasks.len()];
        let mut resource_free = vec![0u32; self.resources.len()];
        let mut makespan = 0;
        let mut total_cost = 0.0;

        for &t in &self.order {
            let gene = genes[t];
            let r = gene.resource as usize;
            let ready = self.predecessors[t]
                .iter()
                .map(|&p| entries[p].end)
                .max()
                .unwrap_or(0);
            let start = gene
                .start_offset
                .max(self.resources[r].availability.start_day)
                .max(ready)
                .max(resource_free[r]);
            let end = start.saturating_add(self.duration_days(t, r));
            let hours = self.hours(t, r);
            let cost = hours * self.resources[r].cost_rate;

            resource_free[r] = end;
            makespan = makespan.max(end);
            total_cost += cost;
            entries[t] = ScheduledTask {
                resource: r,
                start,
                end,
                hours,
                cost,
            };
        }

        Schedule {
            entries,
            makespan,
            total_cost,
        }
    }

    /// Cheapest and dearest total cost over eligible assignments.
    pub fn cost_bounds(&self) -> (f64, f64) {
        let mut low = 0.0;
        let mut high = 0.0;
        for t in 0..self.tasks.len() {
            let costs = self.eligible[t].iter().map(|&r| self.cost(t, r as usize));
            let (min, max) = costs.fold((f64::INFINITY, 0.0f64), |(lo, hi), c| {
                (lo.min(c), hi.max(c))
            });
            if min.is_finite() {
                low += min;
                high += max;
            }
        }
        (low, high)
    }

    /// Critical path length using each task's fastest eligible resource.
    pub fn makespan_lower_bound(&self) -> u32 {
        let mut finish = vec![0u32; self.tasks.len()];
        for &t in &self.order {
            let fastest = self.eligible[t]
                .iter()
                .map(|&r| self.duration_days(t, r as usize))
                .min()
                .unwrap_or(1);
            let ready = self.predecessors[t]
                .iter()
                .map(|&p| finish[p])
                .max()
                .unwrap_or(0);
            finish[t] = ready.saturating_add(fastest);
        }
        finish.into_iter().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests;
