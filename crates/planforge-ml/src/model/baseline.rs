//! Least-squares trend forecaster.
//!
//! Used for cost and schedule forecasts when no trained LSTM exists. It
//! reads column 0 of each input row, which is the forecast target in both
//! the cost (daily cost) and schedule (progress fraction) feature layouts.

use planforge_config::TrainingConfig;
use planforge_core::{PlanForgeError, Result};
use planforge_store::ModelType;
use serde::{Deserialize, Serialize};

use super::training::TrainingReport;
use super::{require_samples, Dataset, Model, ModelInput, Prediction, Target};
use crate::features::linear_fit;

/// Residual floor as a fraction of the window's mean level.
const MIN_RELATIVE_STD: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineForecaster {
    model_type: ModelType,
    /// Residual std measured by `train`; otherwise taken from each fit.
    residual_std: Option<f64>,
    report: Option<TrainingReport>,
}

impl BaselineForecaster {
    pub fn new(model_type: ModelType) -> Self {
        Self {
            model_type,
            residual_std: None,
            report: None,
        }
    }

    pub fn report(&self) -> Option<&TrainingReport> {
        self.report.as_ref()
    }

    fn extrapolate(rows: &[Vec<f64>]) -> Result<(f64, f64)> {
        let values = rows
            .iter()
            .map(|r| {
                r.first()
                    .copied()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| {
                        PlanForgeError::validation("baseline input row has no finite target")
                    })
            })
            .collect::<Result<Vec<f64>>>()?;
        let (slope, intercept, residual) = linear_fit(&values);
        let next = intercept + slope * values.len() as f64;
        let level = values.iter().map(|v| v.abs()).sum::<f64>() / values.len().max(1) as f64;
        Ok((next, residual.max(MIN_RELATIVE_STD * level)))
    }
}

impl Model for BaselineForecaster {
    fn model_type(&self) -> ModelType {
        self.model_type
    }

    fn predict(&self, input: &ModelInput) -> Result<Prediction> {
        let (value, fit_std) = Self::extrapolate(input.as_sequence()?)?;
        Ok(Prediction::Scalar {
            value,
            std: self.residual_std.unwrap_or(fit_std),
        })
    }

    /// Measures one-step residuals over the dataset; there are no weights.
    fn train(&mut self, dataset: &Dataset, _config: &TrainingConfig) -> Result<TrainingReport> {
        require_samples(dataset)?;
        let mut residuals = Vec::with_capacity(dataset.len());
        let mut targets = Vec::with_capacity(dataset.len());
        for sample in dataset.samples() {
            let Target::Value(y) = sample.target else {
                return Err(PlanForgeError::validation(
                    "baseline samples need value targets",
                ));
            };
            let (pred, _) = Self::extrapolate(sample.input.as_sequence()?)?;
            residuals.push(pred - y);
            targets.push(y);
        }
        let n = residuals.len() as f64;
        let mse = residuals.iter().map(|r| r * r).sum::<f64>() / n;
        let residual_std = mse.sqrt();
        let mean = targets.iter().sum::<f64>() / n;
        let spread = (targets.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n).sqrt();
        let accuracy = if spread > 0.0 {
            (1.0 - residual_std / spread).clamp(0.0, 1.0)
        } else if residual_std < 1e-9 {
            1.0
        } else {
            0.0
        };

        let report = TrainingReport {
            epochs_run: 0,
            best_epoch: 0,
            train_loss: mse,
            validation_loss: mse,
            accuracy,
            residual_std,
            sample_count: dataset.len(),
            stopped_early: false,
        };
        self.residual_std = Some(residual_std);
        self.report = Some(report.clone());
        Ok(report)
    }
}
