//! Forecast request and response types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PlanForgeError, Result};

/// Which outcome to forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastType {
    Cost,
    Schedule,
    Risk,
}

impl fmt::Display for ForecastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ForecastType::Cost => "cost",
            ForecastType::Schedule => "schedule",
            ForecastType::Risk => "risk",
        })
    }
}

/// Two-sided confidence level of a forecast interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    #[serde(rename = "0.80")]
    P80,
    #[serde(rename = "0.90")]
    P90,
    #[default]
    #[serde(rename = "0.95")]
    P95,
    #[serde(rename = "0.99")]
    P99,
}

impl ConfidenceLevel {
    /// Parses one of the supported levels (0.80, 0.90, 0.95, 0.99).
    pub fn from_f64(level: f64) -> Result<Self> {
        const EPS: f64 = 1e-9;
        [
            ConfidenceLevel::P80,
            ConfidenceLevel::P90,
            ConfidenceLevel::P95,
            ConfidenceLevel::P99,
        ]
        .into_iter()
        .find(|c| (c.as_f64() - level).abs() < EPS)
        .ok_or_else(|| {
            PlanForgeError::Validation(format!(
                "unsupported confidence level {level}; expected 0.80, 0.90, 0.95 or 0.99"
            ))
        })
    }

    pub fn as_f64(self) -> f64 {
        match self {
            ConfidenceLevel::P80 => 0.80,
            ConfidenceLevel::P90 => 0.90,
            ConfidenceLevel::P95 => 0.95,
            ConfidenceLevel::P99 => 0.99,
        }
    }

    /// Two-sided standard normal quantile for this level.
    pub fn z_score(self) -> f64 {
        match self {
            ConfidenceLevel::P80 => 1.281_551_6,
            ConfidenceLevel::P90 => 1.644_853_6,
            ConfidenceLevel::P95 => 1.959_964_0,
            ConfidenceLevel::P99 => 2.575_829_3,
        }
    }
}

/// Coarse classification of projected overrun or delay.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        })
    }
}

/// Where a forecast's point estimates came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ModelSource {
    Trained { model_id: String, version: u32 },
    Baseline,
}

/// Per-call forecast options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of future periods to predict.
    pub horizon: usize,
    pub confidence: ConfidenceLevel,
    /// Overrides the configured window for cost/schedule sequences.
    pub window: Option<usize>,
    /// Wall-clock budget for the rollout.
    pub timeout: Option<std::time::Duration>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 7,
            confidence: ConfidenceLevel::default(),
            window: None,
            timeout: None,
        }
    }
}

impl ForecastConfig {
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_confidence(mut self, confidence: ConfidenceLevel) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }
}

/// Forecast for one outcome over a horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub forecast_type: ForecastType,
    /// Point estimate per future step.
    pub points: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub confidence: ConfidenceLevel,
    pub risk_level: RiskLevel,
    /// Number of steps requested.
    pub horizon: usize,
    /// Projected overrun (cost) or delay (schedule) in percent.
    pub variance_pct: f64,
    pub source: ModelSource,
    /// True when the rollout stopped before `horizon` steps.
    pub partial: bool,
}

impl Forecast {
    /// Point estimate at the last completed step.
    pub fn final_point(&self) -> Option<f64> {
        self.points.last().copied()
    }

    /// Width of the interval at the last completed step.
    pub fn final_width(&self) -> Option<f64> {
        Some(self.upper.last()? - self.lower.last()?)
    }
}

/// Forecasts for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub project_id: String,
    pub forecasts: Vec<Forecast>,
}

impl ForecastResponse {
    pub fn get(&self, forecast_type: ForecastType) -> Option<&Forecast> {
        self.forecasts
            .iter()
            .find(|f| f.forecast_type == forecast_type)
    }

    /// Highest risk level across all forecasts.
    pub fn overall_risk(&self) -> RiskLevel {
        self.forecasts
            .iter()
            .map(|f| f.risk_level)
            .max()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_levels_ordered_by_z() {
        let levels = [
            ConfidenceLevel::P80,
            ConfidenceLevel::P90,
            ConfidenceLevel::P95,
            ConfidenceLevel::P99,
        ];
        for pair in levels.windows(2) {
            assert!(pair[0].z_score() < pair[1].z_score());
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_confidence_from_f64() {
        assert_eq!(ConfidenceLevel::from_f64(0.9).unwrap(), ConfidenceLevel::P90);
        assert!(ConfidenceLevel::from_f64(0.5).is_err());
    }

    #[test]
    fn test_confidence_serde() {
        let json = serde_json::to_string(&ConfidenceLevel::P99).unwrap();
        assert_eq!(json, "\"0.99\"");
    }

    #[test]
    fn test_overall_risk_is_max() {
        let forecast = |risk_level| Forecast {
            forecast_type: ForecastType::Cost,
            points: vec![1.0],
            lower: vec![0.5],
            upper: vec![1.5],
            confidence: ConfidenceLevel::P95,
            risk_level,
            horizon: 1,
            variance_pct: 0.0,
            source: ModelSource::Baseline,
            partial: false,
        };
        let response = ForecastResponse {
            project_id: "p".into(),
            forecasts: vec![forecast(RiskLevel::Medium), forecast(RiskLevel::High)],
        };
        assert_eq!(response.overall_risk(), RiskLevel::High);
        assert_eq!(response.forecasts[0].final_width(), Some(1.0));
    }
}
