//! Tests for problem tables and decoding.

use planforge_config::GoalWeightTable;
use planforge_core::{
    AvailabilityWindow, OptimizationGoal, OptimizationRequest, PlanForgeError, Task,
};
use planforge_test::{chained_request, project_request, resources};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::*;
use crate::fitness::FitnessFunction;

#[test]
fn test_eligibility_follows_skills() {
    let problem = AllocationProblem::new(&project_request(6, 3)).unwrap();
    for t in 0..6 {
        assert_eq!(problem.eligible(t), &[(t % 3) as u16]);
    }
}

#[test]
fn test_missing_required_skill_is_infeasible() {
    let mut request = project_request(3, 3);
    request.constraints.required_skills = vec!["ml".into()];
    let err = AllocationProblem::new(&request).unwrap_err();
    assert!(matches!(err, PlanForgeError::ConstraintInfeasible(_)));
}

#[test]
fn test_repair_exhaustion_is_infeasible() {
    let mut request = project_request(2, 3);
    request.tasks.push(Task::new("ml-task", 8.0).with_skills(["ml"]));
    let problem = AllocationProblem::new(&request).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    assert!(problem.random_gene(0, &mut rng).is_ok());
    match problem.random_gene(2, &mut rng).unwrap_err() {
        PlanForgeError::ConstraintInfeasible(msg) => assert!(msg.contains("ml-task")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_repair_moves_to_eligible_resource() {
    let problem = AllocationProblem::new(&project_request(3, 3)).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let repaired = problem.repair(1, Gene::new(0, 500), &mut rng).unwrap();
    assert_eq!(repaired.resource, 1);
    assert_eq!(repaired.start_offset, problem.horizon_days() - 1);
}

#[test]
fn test_single_eligible_resource_in_large_pool() {
    let mut request = project_request(1, 300);
    request.tasks[0].required_skills = vec!["rare".into()];
    request.resources[299].skills.push("rare".into());
    let problem = AllocationProblem::new(&request).unwrap();
    assert_eq!(problem.eligible(0), &[299]);

    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for _ in 0..200 {
        assert_eq!(problem.random_gene(0, &mut rng).unwrap().resource, 299);
    }
    let repaired = problem.repair(0, Gene::new(0, 0), &mut rng).unwrap();
    assert_eq!(repaired.resource, 299);
}

#[test]
fn test_huge_effort_saturates_days() {
    let request = OptimizationRequest::new(
        "overflow",
        vec![
            Task::new("huge", 1e11),
            Task::new("after", 8.0).with_dependencies(["huge"]),
        ],
        resources(2),
        60,
    );
    let problem = AllocationProblem::new(&request).unwrap();
    assert_eq!(problem.duration_days(0, 0), u32::MAX);
    assert_eq!(problem.makespan_lower_bound(), u32::MAX);

    let genes = [Gene::new(0, 3), Gene::new(1, 0)];
    let schedule = problem.decode(&genes);
    assert_eq!(schedule.entries[0].end, u32::MAX);
    assert_eq!(schedule.entries[1].start, u32::MAX);
    assert_eq!(schedule.makespan, u32::MAX);

    let weights = GoalWeightTable::default().get(OptimizationGoal::MinimizeDuration);
    let result = FitnessFunction::new(&problem, weights, 0.1).evaluate(&problem, &genes);
    assert!((0.0..=1.0).contains(&result.fitness));
    assert!(result.violations >= 2);
}

#[test]
fn test_decode_respects_dependencies() {
    let problem = AllocationProblem::new(&chained_request(3, 3)).unwrap();
    let genes = [Gene::new(0, 0), Gene::new(1, 0), Gene::new(2, 0)];
    let schedule = problem.decode(&genes);

    let days: Vec<(u32, u32)> = schedule.entries.iter().map(|e| (e.start, e.end)).collect();
    assert_eq!(days, vec![(0, 1), (1, 3), (3, 5)]);
    assert_eq!(schedule.makespan, 5);
    assert!((schedule.total_cost - 2240.0).abs() < 1e-9);
    assert_eq!(problem.makespan_lower_bound(), 5);
    assert_eq!(problem.cost_bounds(), (2240.0, 2240.0));
}

#[test]
fn test_decode_runs_resource_tasks_sequentially() {
    let problem = AllocationProblem::new(&project_request(4, 3)).unwrap();
    let genes = [
        Gene::new(0, 0),
        Gene::new(1, 0),
        Gene::new(2, 0),
        Gene::new(0, 0),
    ];
    let schedule = problem.decode(&genes);
    assert_eq!((schedule.entries[0].start, schedule.entries[0].end), (0, 1));
    assert_eq!((schedule.entries[3].start, schedule.entries[3].end), (1, 4));
}

#[test]
fn test_decode_waits_for_availability() {
    let mut request = project_request(1, 1);
    request.resources[0].availability = AvailabilityWindow::new(5, 40);
    let problem = AllocationProblem::new(&request).unwrap();
    let schedule = problem.decode(&[Gene::new(0, 2)]);
    assert_eq!(schedule.entries[0].start, 5);
}

#[test]
fn test_pair_estimates_override_hours() {
    let problem = AllocationProblem::new(&project_request(1, 1))
        .unwrap()
        .with_pair_estimates(|task, _| Ok((task.estimated_hours * 2.0, 0.9)))
        .unwrap();
    assert_eq!(problem.hours(0, 0), 16.0);
    assert_eq!(problem.quality(0, 0), 0.9);
    assert_eq!(problem.duration_days(0, 0), 2);
}
