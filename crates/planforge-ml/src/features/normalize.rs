//! Column normalization fitted once at training time.

use planforge_config::NormalizationKind;
use planforge_core::{PlanForgeError, Result};
use planforge_store::{ColumnScale, NormalizationParams};
use serde::{Deserialize, Serialize};

use super::ensure_width;

/// Replays a fitted per-column transform.
///
/// Constant columns keep scale 1 so they map to 0 instead of dividing by
/// zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    params: NormalizationParams,
}

fn column_scale(kind: NormalizationKind, values: &[f64]) -> ColumnScale {
    if values.is_empty() {
        return ColumnScale::IDENTITY;
    }
    let n = values.len() as f64;
    let (offset, spread) = match kind {
        NormalizationKind::ZScore => {
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            (mean, var.sqrt())
        }
        NormalizationKind::MinMax => {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (min, max - min)
        }
    };
    let scale = if spread > 1e-12 { spread } else { 1.0 };
    ColumnScale { offset, scale }
}

impl Normalizer {
    pub fn identity(width: usize) -> Self {
        Self {
            params: NormalizationParams::identity(width),
        }
    }

    pub fn from_params(params: NormalizationParams) -> Self {
        Self { params }
    }

    /// Fits one scale per column over `rows`, each exactly `width` wide.
    pub fn fit<'a, I>(kind: NormalizationKind, width: usize, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); width];
        for row in rows {
            ensure_width("normalizer fit", row, width)?;
            for (col, &v) in columns.iter_mut().zip(row) {
                col.push(v);
            }
        }
        if columns.first().is_some_and(Vec::is_empty) {
            return Err(PlanForgeError::validation("cannot fit normalizer on no rows"));
        }
        Ok(Self {
            params: NormalizationParams {
                kind,
                columns: columns.iter().map(|c| column_scale(kind, c)).collect(),
                target: None,
            },
        })
    }

    /// Fits the regression target transform.
    pub fn fit_target(&mut self, targets: &[f64]) -> Result<()> {
        if targets.iter().any(|t| !t.is_finite()) {
            return Err(PlanForgeError::validation("training targets must be finite"));
        }
        self.params.target = Some(column_scale(self.params.kind, targets));
        Ok(())
    }

    pub fn params(&self) -> &NormalizationParams {
        &self.params
    }

    pub fn width(&self) -> usize {
        self.params.width()
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        ensure_width("model input", row, self.width())?;
        Ok(row
            .iter()
            .zip(&self.params.columns)
            .map(|(&x, s)| s.apply(x))
            .collect())
    }

    pub fn transform_target(&self, y: f64) -> f64 {
        self.params.target.unwrap_or(ColumnScale::IDENTITY).apply(y)
    }

    pub fn invert_target(&self, y: f64) -> f64 {
        self.params.target.unwrap_or(ColumnScale::IDENTITY).invert(y)
    }

    /// Factor converting a spread in normalized target units to raw units.
    pub fn target_scale(&self) -> f64 {
        self.params.target.map_or(1.0, |s| s.scale)
    }
}
