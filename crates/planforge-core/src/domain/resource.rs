//! Resource snapshot.

use serde::{Deserialize, Serialize};

/// Days (relative to the planning start) during which a resource can work.
///
/// `end_day` is exclusive. An open window (`end_day == None`) extends to the
/// end of the planning horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub start_day: u32,
    pub end_day: Option<u32>,
}

impl AvailabilityWindow {
    pub fn new(start_day: u32, end_day: u32) -> Self {
        Self {
            start_day,
            end_day: Some(end_day),
        }
    }

    pub fn open_from(start_day: u32) -> Self {
        Self {
            start_day,
            end_day: None,
        }
    }

    /// Returns the exclusive end day, clamped to `horizon_days`.
    pub fn end_within(&self, horizon_days: u32) -> u32 {
        self.end_day
            .map_or(horizon_days, |end| end.min(horizon_days))
    }

    /// Returns true if any part of the window falls inside `[0, horizon_days)`.
    pub fn intersects_horizon(&self, horizon_days: u32) -> bool {
        self.start_day < self.end_within(horizon_days)
    }
}

/// A person or asset that can be assigned to tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    /// Role family, e.g. "engineering", "design".
    pub category: String,
    pub skills: Vec<String>,
    /// Proficiency in [0, 1]; scales effective throughput.
    pub skill_level: f64,
    /// Cost per working hour.
    pub cost_rate: f64,
    /// Hours the resource can work per day.
    pub capacity_hours_per_day: f64,
    /// Fraction of capacity already committed elsewhere, in [0, 1].
    #[serde(default)]
    pub current_utilization: f64,
    #[serde(default)]
    pub availability: AvailabilityWindow,
}

impl Resource {
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            skills: Vec::new(),
            skill_level: 0.5,
            cost_rate: 50.0,
            capacity_hours_per_day: 8.0,
            current_utilization: 0.0,
            availability: AvailabilityWindow::default(),
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_skill_level(mut self, level: f64) -> Self {
        self.skill_level = level;
        self
    }

    pub fn with_cost_rate(mut self, rate: f64) -> Self {
        self.cost_rate = rate;
        self
    }

    pub fn with_capacity(mut self, hours_per_day: f64) -> Self {
        self.capacity_hours_per_day = hours_per_day;
        self
    }

    pub fn with_utilization(mut self, utilization: f64) -> Self {
        self.current_utilization = utilization;
        self
    }

    pub fn with_availability(mut self, window: AvailabilityWindow) -> Self {
        self.availability = window;
        self
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s.eq_ignore_ascii_case(skill))
    }

    /// Returns true if the resource holds every skill in `required`.
    pub fn covers<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.iter().all(|s| self.has_skill(s.as_ref()))
    }

    /// Hours per day the resource can put into new work, restricted to a
    /// working-hours window of `window_hours` length.
    pub fn effective_daily_hours(&self, window_hours: f64) -> f64 {
        let free = (1.0 - self.current_utilization.clamp(0.0, 1.0)) * self.capacity_hours_per_day;
        free.min(window_hours).max(0.0)
    }
}
