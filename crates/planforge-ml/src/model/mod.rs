//! Model contract and training data.

mod artifact;
mod baseline;
mod classifier;
mod sequence;
mod training;

pub use artifact::ModelArtifact;
pub use baseline::BaselineForecaster;
pub use classifier::FeedForwardClassifier;
pub use sequence::SequenceRegressor;
pub use training::TrainingReport;

use planforge_config::TrainingConfig;
use planforge_core::{PlanForgeError, Result};
use planforge_store::ModelType;
use serde::{Deserialize, Serialize};

/// Raw (unnormalized) model input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelInput {
    Vector(Vec<f64>),
    /// Rows ordered oldest first.
    Sequence(Vec<Vec<f64>>),
}

impl ModelInput {
    pub(crate) fn as_vector(&self) -> Result<&[f64]> {
        match self {
            ModelInput::Vector(v) => Ok(v),
            ModelInput::Sequence(_) => Err(PlanForgeError::validation(
                "expected a feature vector, got a sequence",
            )),
        }
    }

    pub(crate) fn as_sequence(&self) -> Result<&[Vec<f64>]> {
        match self {
            ModelInput::Sequence(rows) if !rows.is_empty() => Ok(rows),
            ModelInput::Sequence(_) => Err(PlanForgeError::validation("empty input sequence")),
            ModelInput::Vector(_) => Err(PlanForgeError::validation(
                "expected a sequence, got a feature vector",
            )),
        }
    }

    /// Number of time steps (1 for vectors).
    pub fn steps(&self) -> usize {
        match self {
            ModelInput::Vector(_) => 1,
            ModelInput::Sequence(rows) => rows.len(),
        }
    }
}

/// Model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Prediction {
    Class {
        index: usize,
        probabilities: Vec<f64>,
        /// Highest class probability.
        confidence: f64,
    },
    Scalar {
        value: f64,
        /// Residual standard deviation, in target units.
        std: f64,
    },
}

impl Prediction {
    pub fn scalar(&self) -> Option<(f64, f64)> {
        match *self {
            Prediction::Scalar { value, std } => Some((value, std)),
            Prediction::Class { .. } => None,
        }
    }

    pub fn probabilities(&self) -> Option<&[f64]> {
        match self {
            Prediction::Class { probabilities, .. } => Some(probabilities),
            Prediction::Scalar { .. } => None,
        }
    }
}

/// Supervision label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Class(usize),
    Value(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub input: ModelInput,
    pub target: Target,
}

impl Sample {
    pub fn new(input: ModelInput, target: Target) -> Self {
        Self { input, target }
    }
}

/// Ordered collection of labelled samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a classification dataset from feature rows and labels.
    pub fn classification(rows: Vec<Vec<f64>>, labels: Vec<usize>) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(PlanForgeError::Validation(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        Ok(Self {
            samples: rows
                .into_iter()
                .zip(labels)
                .map(|(r, l)| Sample::new(ModelInput::Vector(r), Target::Class(l)))
                .collect(),
        })
    }

    /// Builds a sequence regression dataset.
    pub fn sequences(sequences: Vec<Vec<Vec<f64>>>, targets: Vec<f64>) -> Result<Self> {
        if sequences.len() != targets.len() {
            return Err(PlanForgeError::Validation(format!(
                "{} sequences but {} targets",
                sequences.len(),
                targets.len()
            )));
        }
        Ok(Self {
            samples: sequences
                .into_iter()
                .zip(targets)
                .map(|(s, t)| Sample::new(ModelInput::Sequence(s), Target::Value(t)))
                .collect(),
        })
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Longest input sequence (1 for vector datasets).
    pub fn sequence_length(&self) -> usize {
        self.samples
            .iter()
            .map(|s| s.input.steps())
            .max()
            .unwrap_or(0)
    }
}

/// Trainable predictor.
pub trait Model: Send + Sync {
    fn model_type(&self) -> ModelType;

    /// Predicts from a raw input, applying the fitted normalization.
    fn predict(&self, input: &ModelInput) -> Result<Prediction>;

    /// Fits the model, replacing its weights only on success.
    fn train(&mut self, dataset: &Dataset, config: &TrainingConfig) -> Result<TrainingReport>;
}

/// Rejects datasets shorter than `sequence_length + 1`.
pub(crate) fn require_samples(dataset: &Dataset) -> Result<()> {
    let required = dataset.sequence_length().max(1) + 1;
    if dataset.len() < required {
        return Err(PlanForgeError::InsufficientData {
            required,
            actual: dataset.len(),
        });
    }
    Ok(())
}
