//! Task dependency ordering.

use std::collections::{HashMap, VecDeque};

use crate::error::{PlanForgeError, Result};

use super::Task;

/// Returns task indices in an order where every task follows its
/// dependencies (Kahn's algorithm, ties broken by input order).
///
/// # Errors
///
/// Returns `Validation` for unknown dependency ids or dependency cycles.
pub fn dependency_order(tasks: &[Task]) -> Result<Vec<usize>> {
    let index: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; tasks.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];

    for (i, task) in tasks.iter().enumerate() {
        for dep in &task.dependencies {
            let Some(&d) = index.get(dep.as_str()) else {
                return Err(PlanForgeError::Validation(format!(
                    "task '{}' depends on unknown task '{}'",
                    task.id, dep
                )));
            };
            if d == i {
                return Err(PlanForgeError::Validation(format!(
                    "task '{}' depends on itself",
                    task.id
                )));
            }
            in_degree[i] += 1;
            dependents[d].push(i);
        }
    }

    let mut queue: VecDeque<usize> = (0..tasks.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(tasks.len());

    while let Some(i) = queue.pop_front() {
        order.push(i);
        for &next in &dependents[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() != tasks.len() {
        let stuck: Vec<&str> = (0..tasks.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| tasks[i].id.as_str())
            .collect();
        return Err(PlanForgeError::Validation(format!(
            "dependency cycle among tasks: {}",
            stuck.join(", ")
        )));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_dependencies_first() {
        let tasks = vec![
            Task::new("c", 1.0).with_dependencies(["b"]),
            Task::new("a", 1.0),
            Task::new("b", 1.0).with_dependencies(["a"]),
        ];
        let order = dependency_order(&tasks).unwrap();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_rejects_cycle() {
        let tasks = vec![
            Task::new("a", 1.0).with_dependencies(["b"]),
            Task::new("b", 1.0).with_dependencies(["a"]),
        ];
        let err = dependency_order(&tasks).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_rejects_unknown_dependency() {
        let tasks = vec![Task::new("a", 1.0).with_dependencies(["ghost"])];
        assert!(matches!(
            dependency_order(&tasks),
            Err(PlanForgeError::Validation(_))
        ));
    }
}
