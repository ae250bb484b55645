//! Tests for project snapshots.

use super::*;

#[test]
fn test_skill_match_is_case_insensitive() {
    let r = Resource::new("r1", "engineering").with_skills(["Rust", "SQL"]);
    assert!(r.has_skill("rust"));
    assert!(r.covers(&["sql", "RUST"]));
    assert!(!r.covers(&["go"]));
    assert!(r.covers::<&str>(&[]));
}

#[test]
fn test_effective_daily_hours() {
    let r = Resource::new("r1", "engineering")
        .with_capacity(8.0)
        .with_utilization(0.25);
    assert!((r.effective_daily_hours(9.0) - 6.0).abs() < 1e-9);
    // A narrow working-hours window caps throughput.
    assert!((r.effective_daily_hours(4.0) - 4.0).abs() < 1e-9);

    let saturated = Resource::new("r2", "design").with_utilization(1.5);
    assert_eq!(saturated.effective_daily_hours(8.0), 0.0);
}

#[test]
fn test_availability_window() {
    let open = AvailabilityWindow::open_from(5);
    assert_eq!(open.end_within(30), 30);
    assert!(open.intersects_horizon(30));
    assert!(!open.intersects_horizon(5));

    let closed = AvailabilityWindow::new(2, 40);
    assert_eq!(closed.end_within(30), 30);
    assert_eq!(closed.end_within(50), 40);
}

#[test]
fn test_task_builder() {
    let t = Task::new("t1", 16.0)
        .with_skills(["rust"])
        .with_priority(Priority::High)
        .with_dependencies(["t0"])
        .with_deadline(10);
    assert_eq!(t.name, "t1");
    assert_eq!(t.required_skills, vec!["rust".to_string()]);
    assert_eq!(t.dependencies, vec!["t0".to_string()]);
    assert_eq!(t.deadline_day, Some(10));
    assert!(Priority::Critical > Priority::High);
    assert_eq!(Priority::Critical.weight(), 1.0);
}

#[test]
fn test_task_deserializes_with_defaults() {
    let t: Task = serde_json::from_str(
        r#"{"id": "t9", "required_skills": ["qa"], "estimated_hours": 4.0}"#,
    )
    .unwrap();
    assert_eq!(t.complexity, 5.0);
    assert_eq!(t.priority, Priority::Medium);
    assert!(t.dependencies.is_empty());
}
