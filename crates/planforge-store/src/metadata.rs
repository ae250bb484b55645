//! Persisted model metadata.

use std::fmt;

use chrono::{DateTime, Utc};
use planforge_config::NormalizationKind;
use serde::{Deserialize, Serialize};

/// Which model a lineage holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Dense classifier scoring task/resource suitability (25 → 10).
    ResourceAllocation,
    /// Dense classifier of risk severity (15 → 5).
    RiskAnalysis,
    /// LSTM regressor of task duration from effort history.
    DurationPredictor,
    /// LSTM next-day cost regressor.
    CostForecaster,
    /// LSTM next-day schedule progress regressor.
    ScheduleForecaster,
}

impl ModelType {
    pub fn is_sequence(self) -> bool {
        matches!(
            self,
            ModelType::DurationPredictor | ModelType::CostForecaster | ModelType::ScheduleForecaster
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelType::ResourceAllocation => "resource_allocation",
            ModelType::RiskAnalysis => "risk_analysis",
            ModelType::DurationPredictor => "duration_predictor",
            ModelType::CostForecaster => "cost_forecaster",
            ModelType::ScheduleForecaster => "schedule_forecaster",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Affine transform `(x - offset) / scale` for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnScale {
    pub offset: f64,
    pub scale: f64,
}

impl ColumnScale {
    pub const IDENTITY: ColumnScale = ColumnScale {
        offset: 0.0,
        scale: 1.0,
    };

    pub fn apply(&self, x: f64) -> f64 {
        (x - self.offset) / self.scale
    }

    pub fn invert(&self, y: f64) -> f64 {
        y * self.scale + self.offset
    }
}

/// Normalization fitted at training time and replayed at inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    pub kind: NormalizationKind,
    pub columns: Vec<ColumnScale>,
    /// Regression target transform; `None` for classifiers.
    #[serde(default)]
    pub target: Option<ColumnScale>,
}

impl NormalizationParams {
    pub fn identity(width: usize) -> Self {
        Self {
            kind: NormalizationKind::ZScore,
            columns: vec![ColumnScale::IDENTITY; width],
            target: None,
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// Key of a weights blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef {
    pub model_id: String,
    pub version: u32,
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.model_id, self.version)
    }
}

/// Metadata stored next to every weights blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub model_id: String,
    pub model_type: ModelType,
    /// Assigned by the store; strictly increasing per model id.
    pub version: u32,
    pub trained_at: DateTime<Utc>,
    /// Validation accuracy (classifiers) or 1 − normalized RMSE (regressors).
    pub accuracy: f64,
    /// Standard deviation of validation residuals, in target units.
    pub residual_std: f64,
    pub sample_count: usize,
    pub normalization: NormalizationParams,
    pub weights_ref: BlobRef,
}

impl ModelMetadata {
    /// Creates metadata for a model that has not been stored yet.
    ///
    /// `version` and `weights_ref` are placeholders until `save` assigns them.
    pub fn draft(
        model_id: impl Into<String>,
        model_type: ModelType,
        normalization: NormalizationParams,
    ) -> Self {
        let model_id = model_id.into();
        Self {
            weights_ref: BlobRef {
                model_id: model_id.clone(),
                version: 0,
            },
            model_id,
            model_type,
            version: 0,
            trained_at: Utc::now(),
            accuracy: 0.0,
            residual_std: 0.0,
            sample_count: 0,
            normalization,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn with_residual_std(mut self, residual_std: f64) -> Self {
        self.residual_std = residual_std;
        self
    }

    pub fn with_sample_count(mut self, samples: usize) -> Self {
        self.sample_count = samples;
        self
    }

    pub(crate) fn assign_version(mut self, version: u32) -> Self {
        self.version = version;
        self.weights_ref = BlobRef {
            model_id: self.model_id.clone(),
            version,
        };
        self
    }
}
