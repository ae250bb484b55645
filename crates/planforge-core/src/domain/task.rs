//! Task snapshot.

use serde::{Deserialize, Serialize};

/// Business priority of a task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Ordinal in [0, 1] used by feature extraction.
    pub fn weight(self) -> f64 {
        match self {
            Priority::Low => 0.0,
            Priority::Medium => 1.0 / 3.0,
            Priority::High => 2.0 / 3.0,
            Priority::Critical => 1.0,
        }
    }
}

/// A unit of work that needs exactly one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub required_skills: Vec<String>,
    /// Estimated effort in hours.
    pub estimated_hours: f64,
    /// Relative complexity on a 1..=10 scale.
    #[serde(default = "default_complexity")]
    pub complexity: f64,
    #[serde(default)]
    pub priority: Priority,
    /// Ids of tasks that must finish before this one starts.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Day (relative to planning start) by which the task must finish.
    #[serde(default)]
    pub deadline_day: Option<u32>,
    /// Hours logged per past period on this task, oldest first.
    #[serde(default)]
    pub effort_history: Vec<f64>,
}

fn default_complexity() -> f64 {
    5.0
}

impl Task {
    pub fn new(id: impl Into<String>, estimated_hours: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            required_skills: Vec::new(),
            estimated_hours,
            complexity: default_complexity(),
            priority: Priority::default(),
            dependencies: Vec::new(),
            deadline_day: None,
            effort_history: Vec::new(),
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_deadline(mut self, day: u32) -> Self {
        self.deadline_day = Some(day);
        self
    }

    pub fn with_history(mut self, history: Vec<f64>) -> Self {
        self.effort_history = history;
        self
    }
}
