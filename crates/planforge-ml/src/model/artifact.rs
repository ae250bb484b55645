//! Serializable model artifacts.

use planforge_config::TrainingConfig;
use planforge_core::{PlanForgeError, Result};
use planforge_store::{ModelMetadata, ModelType, NormalizationParams};
use serde::{Deserialize, Serialize};

use super::{
    BaselineForecaster, Dataset, FeedForwardClassifier, Model, ModelInput, Prediction,
    SequenceRegressor, TrainingReport,
};
use crate::features::{class_count, input_width};

/// Any model the manager can persist. Encoded with bincode as the weights
/// blob of a store entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelArtifact {
    Classifier(FeedForwardClassifier),
    Sequence(SequenceRegressor),
    Baseline(BaselineForecaster),
}

impl ModelArtifact {
    /// Creates the untrained network matching `model_type`.
    pub fn untrained(model_type: ModelType, config: &TrainingConfig) -> Self {
        let width = input_width(model_type);
        match class_count(model_type) {
            Some(classes) => ModelArtifact::Classifier(FeedForwardClassifier::new(
                model_type, width, classes, config,
            )),
            None => ModelArtifact::Sequence(SequenceRegressor::new(model_type, width, config)),
        }
    }

    pub fn baseline(model_type: ModelType) -> Self {
        ModelArtifact::Baseline(BaselineForecaster::new(model_type))
    }

    fn inner(&self) -> &dyn Model {
        match self {
            ModelArtifact::Classifier(m) => m,
            ModelArtifact::Sequence(m) => m,
            ModelArtifact::Baseline(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Model {
        match self {
            ModelArtifact::Classifier(m) => m,
            ModelArtifact::Sequence(m) => m,
            ModelArtifact::Baseline(m) => m,
        }
    }

    pub fn report(&self) -> Option<&TrainingReport> {
        match self {
            ModelArtifact::Classifier(m) => m.report(),
            ModelArtifact::Sequence(m) => m.report(),
            ModelArtifact::Baseline(m) => m.report(),
        }
    }

    pub fn is_baseline(&self) -> bool {
        matches!(self, ModelArtifact::Baseline(_))
    }

    pub fn normalization(&self) -> NormalizationParams {
        match self {
            ModelArtifact::Classifier(m) => m.normalizer().params().clone(),
            ModelArtifact::Sequence(m) => m.normalizer().params().clone(),
            ModelArtifact::Baseline(_) => NormalizationParams::identity(1),
        }
    }

    /// Metadata draft describing this trained artifact.
    pub fn metadata(&self, model_id: &str) -> Result<ModelMetadata> {
        let report = self.report().ok_or_else(|| {
            PlanForgeError::Validation(format!(
                "cannot save untrained {} as '{model_id}'",
                self.model_type()
            ))
        })?;
        Ok(
            ModelMetadata::draft(model_id, self.model_type(), self.normalization())
                .with_accuracy(report.accuracy)
                .with_residual_std(report.residual_std)
                .with_sample_count(report.sample_count),
        )
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| PlanForgeError::Internal(format!("failed to encode model: {e}")))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| PlanForgeError::Persistence(format!("corrupt model blob: {e}")))
    }
}

impl Model for ModelArtifact {
    fn model_type(&self) -> ModelType {
        self.inner().model_type()
    }

    fn predict(&self, input: &ModelInput) -> Result<Prediction> {
        self.inner().predict(input)
    }

    fn train(&mut self, dataset: &Dataset, config: &TrainingConfig) -> Result<TrainingReport> {
        self.inner_mut().train(dataset, config)
    }
}
