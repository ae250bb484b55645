//! Resource pools, tasks and optimization requests.

use planforge_core::{OptimizationRequest, Priority, Resource, Task};

/// Skills handed out round-robin by [`resources`] and [`tasks`].
pub const SKILLS: [&str; 3] = ["backend", "frontend", "data"];

const CATEGORIES: [&str; 3] = ["engineer", "analyst", "designer"];

/// Default planning horizon of generated requests.
pub const HORIZON_DAYS: u32 = 60;

/// Creates `n` resources. Resource `i` holds `SKILLS[i % 3]` and "review".
pub fn resources(n: usize) -> Vec<Resource> {
    (0..n)
        .map(|i| {
            Resource::new(format!("r{i}"), CATEGORIES[i % CATEGORIES.len()])
                .with_skills([SKILLS[i % SKILLS.len()], "review"])
                .with_skill_level(0.5 + 0.1 * (i % 5) as f64)
                .with_cost_rate(50.0 + 10.0 * (i % 4) as f64)
                .with_capacity(8.0)
        })
        .collect()
}

/// Creates `n` independent tasks. Task `j` requires `SKILLS[j % 3]`.
pub fn tasks(n: usize) -> Vec<Task> {
    (0..n)
        .map(|j| {
            let priority = match j % 4 {
                0 => Priority::Critical,
                1 => Priority::High,
                2 => Priority::Medium,
                _ => Priority::Low,
            };
            Task::new(format!("t{j}"), 8.0 + 4.0 * (j % 5) as f64)
                .with_skills([SKILLS[j % SKILLS.len()]])
                .with_complexity(3.0 + (j % 5) as f64)
                .with_priority(priority)
        })
        .collect()
}

/// A seeded request over [`tasks`] and [`resources`].
pub fn project_request(task_count: usize, resource_count: usize) -> OptimizationRequest {
    OptimizationRequest::new(
        format!("proj-{task_count}x{resource_count}"),
        tasks(task_count),
        resources(resource_count),
        HORIZON_DAYS,
    )
    .with_seed(7)
}

/// Like [`project_request`], but each task depends on the previous one.
pub fn chained_request(task_count: usize, resource_count: usize) -> OptimizationRequest {
    let mut request = project_request(task_count, resource_count);
    for j in 1..request.tasks.len() {
        let previous = request.tasks[j - 1].id.clone();
        request.tasks[j].dependencies.push(previous);
    }
    request.project_id = format!("chain-{task_count}x{resource_count}");
    request
}
