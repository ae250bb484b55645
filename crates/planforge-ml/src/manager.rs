//! Model manager: training, persistence, caching and domain inference.
//!
//! Trained models are looked up by id; the default id of each model type
//! is its snake_case name (`duration_predictor`, `cost_forecaster`, ...).
//! When no trained model exists, inference falls back to heuristics with
//! wide uncertainty, and forecasting falls back to [`BaselineForecaster`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use planforge_config::TrainingConfig;
use planforge_core::{ModelSource, PlanForgeError, Resource, Result, RiskLevel, Task};
use planforge_store::{
    validate_model_id, InMemoryModelStore, ModelMetadata, ModelStore, ModelType,
};
use tracing::{debug, info, warn};

use crate::features::{
    allocation_features, duration_sequence, skill_coverage, AllocationContext, SUITABILITY_BANDS,
};
use crate::model::{BaselineForecaster, Dataset, Model, ModelArtifact, ModelInput, Prediction};

/// A model loaded from the store.
#[derive(Debug)]
pub struct LoadedModel {
    pub metadata: ModelMetadata,
    pub artifact: ModelArtifact,
}

impl LoadedModel {
    pub fn source(&self) -> ModelSource {
        ModelSource::Trained {
            model_id: self.metadata.model_id.clone(),
            version: self.metadata.version,
        }
    }

    pub fn predict(&self, input: &ModelInput) -> Result<Prediction> {
        self.artifact.predict(input)
    }
}

/// Point estimate with spread and provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub value: f64,
    pub std: f64,
    pub source: ModelSource,
}

impl Estimate {
    /// Coefficient of variation.
    pub fn cv(&self) -> f64 {
        if self.value.abs() > f64::EPSILON {
            self.std / self.value.abs()
        } else {
            0.0
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.source, ModelSource::Trained { .. })
    }
}

/// Risk severity from the risk classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskEstimate {
    pub level: RiskLevel,
    pub confidence: f64,
    pub source: ModelSource,
}

/// Forecaster selected for a forecast type.
#[derive(Debug, Clone)]
pub enum ForecastModel {
    Trained(Arc<LoadedModel>),
    Baseline(BaselineForecaster),
}

impl ForecastModel {
    pub fn predict(&self, input: &ModelInput) -> Result<Prediction> {
        match self {
            ForecastModel::Trained(m) => m.predict(input),
            ForecastModel::Baseline(b) => b.predict(input),
        }
    }

    pub fn source(&self) -> ModelSource {
        match self {
            ForecastModel::Trained(m) => m.source(),
            ForecastModel::Baseline(_) => ModelSource::Baseline,
        }
    }
}

/// Maps the 5-way severity class onto risk levels.
pub fn severity_level(class: usize) -> RiskLevel {
    match class {
        0 | 1 => RiskLevel::Low,
        2 => RiskLevel::Medium,
        3 => RiskLevel::High,
        _ => RiskLevel::Critical,
    }
}

fn lock_poisoned() -> PlanForgeError {
    PlanForgeError::Internal("model manager lock poisoned".into())
}

/// Owns the model families and their persisted versions.
pub struct ModelManager {
    store: Arc<dyn ModelStore>,
    training: TrainingConfig,
    cache: RwLock<HashMap<String, Arc<LoadedModel>>>,
    training_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelManager")
            .field("training", &self.training)
            .finish_non_exhaustive()
    }
}

impl ModelManager {
    pub fn new(store: Arc<dyn ModelStore>, training: TrainingConfig) -> Self {
        Self {
            store,
            training,
            cache: RwLock::new(HashMap::new()),
            training_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Manager backed by a fresh in-memory store.
    pub fn in_memory(training: TrainingConfig) -> Self {
        Self::new(Arc::new(InMemoryModelStore::new()), training)
    }

    pub fn store(&self) -> &Arc<dyn ModelStore> {
        &self.store
    }

    pub fn training_config(&self) -> &TrainingConfig {
        &self.training
    }

    fn training_lock(&self, model_id: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.training_locks.lock().map_err(|_| lock_poisoned())?;
        Ok(Arc::clone(
            locks
                .entry(model_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        ))
    }

    /// Caches `loaded` unless a newer version of the same id is cached.
    fn cache_insert(&self, loaded: Arc<LoadedModel>) -> Result<()> {
        let mut cache = self.cache.write().map_err(|_| lock_poisoned())?;
        let stale = cache
            .get(&loaded.metadata.model_id)
            .is_some_and(|cached| cached.metadata.version > loaded.metadata.version);
        if !stale {
            cache.insert(loaded.metadata.model_id.clone(), loaded);
        }
        Ok(())
    }

    /// Trains a fresh `model_type` network and persists it as a new version
    /// of `model_id`.
    ///
    /// Only one training job per model id runs at a time; a failed run
    /// leaves the stored versions untouched.
    pub fn train_model(
        &self,
        model_id: &str,
        model_type: ModelType,
        dataset: &Dataset,
        hyperparams: Option<&TrainingConfig>,
    ) -> Result<ModelMetadata> {
        validate_model_id(model_id)?;
        let config = hyperparams.unwrap_or(&self.training);
        config
            .validate()
            .map_err(|e| PlanForgeError::Validation(e.to_string()))?;

        let lock = self.training_lock(model_id)?;
        let _guard = lock.lock().map_err(|_| lock_poisoned())?;

        info!(
            event = "train_start",
            model_id,
            model_type = %model_type,
            samples = dataset.len(),
            epochs = config.epochs,
        );

        let mut artifact = ModelArtifact::untrained(model_type, config);
        let report = match artifact.train(dataset, config) {
            Ok(report) => report,
            Err(err) => {
                warn!(event = "train_failed", model_id, error = %err);
                return Err(err);
            }
        };
        let metadata = self.persist(model_id, &artifact)?;

        info!(
            event = "train_end",
            model_id,
            version = metadata.version,
            epochs = report.epochs_run,
            best_epoch = report.best_epoch,
            accuracy = report.accuracy,
            residual_std = report.residual_std,
            stopped_early = report.stopped_early,
        );
        Ok(metadata)
    }

    /// Persists a trained artifact as a new version of `model_id`.
    ///
    /// Serialized with training runs on the same id.
    pub fn save_model(&self, model_id: &str, artifact: &ModelArtifact) -> Result<ModelMetadata> {
        validate_model_id(model_id)?;
        let lock = self.training_lock(model_id)?;
        let _guard = lock.lock().map_err(|_| lock_poisoned())?;
        self.persist(model_id, artifact)
    }

    /// Saves and caches `artifact`. Callers hold the id's training lock.
    fn persist(&self, model_id: &str, artifact: &ModelArtifact) -> Result<ModelMetadata> {
        let draft = artifact.metadata(model_id)?;
        let blob = artifact.encode()?;
        let metadata = self.store.save(draft, &blob)?;
        self.cache_insert(Arc::new(LoadedModel {
            metadata: metadata.clone(),
            artifact: artifact.clone(),
        }))?;
        debug!(model_id, version = metadata.version, bytes = blob.len(), "model saved");
        Ok(metadata)
    }

    /// Loads the latest version of `model_id`, caching it.
    pub fn load_model(&self, model_id: &str) -> Result<Arc<LoadedModel>> {
        if let Some(hit) = self
            .cache
            .read()
            .map_err(|_| lock_poisoned())?
            .get(model_id)
        {
            return Ok(Arc::clone(hit));
        }
        let stored = self.store.load(model_id)?;
        let loaded = Arc::new(LoadedModel {
            artifact: ModelArtifact::decode(&stored.blob)?,
            metadata: stored.metadata,
        });
        self.cache_insert(Arc::clone(&loaded))?;
        debug!(model_id, version = loaded.metadata.version, "model loaded");
        Ok(loaded)
    }

    /// Loads a specific version without touching the cache.
    pub fn load_model_version(&self, model_id: &str, version: u32) -> Result<Arc<LoadedModel>> {
        let stored = self.store.load_version(model_id, version)?;
        Ok(Arc::new(LoadedModel {
            artifact: ModelArtifact::decode(&stored.blob)?,
            metadata: stored.metadata,
        }))
    }

    pub fn list_models(&self) -> Result<Vec<ModelMetadata>> {
        self.store.list()
    }

    pub fn delete_model(&self, model_id: &str) -> Result<()> {
        self.store.delete(model_id)?;
        self.cache
            .write()
            .map_err(|_| lock_poisoned())?
            .remove(model_id);
        info!(event = "model_deleted", model_id);
        Ok(())
    }

    /// The trained model stored under `model_type`'s default id, if any.
    pub fn find(&self, model_type: ModelType) -> Result<Option<Arc<LoadedModel>>> {
        match self.load_model(model_type.as_str()) {
            Ok(loaded) if loaded.metadata.model_type == model_type => Ok(Some(loaded)),
            Ok(loaded) => Err(PlanForgeError::Validation(format!(
                "model '{}' holds a {} model, expected {model_type}",
                loaded.metadata.model_id, loaded.metadata.model_type
            ))),
            Err(PlanForgeError::ModelNotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Starts a run-scoped lookup cache over this manager.
    pub fn session(&self) -> ModelSession<'_> {
        ModelSession {
            manager: self,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Trained forecaster for `model_type`, else the trend baseline.
    pub fn forecaster(&self, model_type: ModelType) -> Result<ForecastModel> {
        Ok(match self.find(model_type)? {
            Some(loaded) => ForecastModel::Trained(loaded),
            None => ForecastModel::Baseline(BaselineForecaster::new(model_type)),
        })
    }

    /// Predicted effort in hours of `task` on `resource`.
    pub fn predict_duration(
        &self,
        task: &Task,
        resource: &Resource,
        window_hours: f64,
        heuristic_uncertainty: f64,
    ) -> Result<Estimate> {
        self.session()
            .predict_duration(task, resource, window_hours, heuristic_uncertainty)
    }

    /// Suitability of `resource` for `task` in [0, 1].
    pub fn score_allocation(
        &self,
        task: &Task,
        resource: &Resource,
        ctx: &AllocationContext,
        heuristic_uncertainty: f64,
    ) -> Result<Estimate> {
        self.session()
            .score_allocation(task, resource, ctx, heuristic_uncertainty)
    }

    pub fn classify_risk(&self, features: &[f64]) -> Result<Option<RiskEstimate>> {
        self.session().classify_risk(features)
    }
}

/// Model lookups pinned for one optimization or forecast.
///
/// Each model type is resolved at most once per session, so a model that
/// is not trained costs one store read instead of one per task/resource
/// pair. Models saved after the first lookup are seen by the next session.
pub struct ModelSession<'a> {
    manager: &'a ModelManager,
    resolved: Mutex<HashMap<ModelType, Option<Arc<LoadedModel>>>>,
}

impl std::fmt::Debug for ModelSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSession").finish_non_exhaustive()
    }
}

impl ModelSession<'_> {
    /// Like [`ModelManager::find`], remembering hits and misses.
    pub fn find(&self, model_type: ModelType) -> Result<Option<Arc<LoadedModel>>> {
        let mut resolved = self.resolved.lock().map_err(|_| lock_poisoned())?;
        if let Some(known) = resolved.get(&model_type) {
            return Ok(known.clone());
        }
        let found = self.manager.find(model_type)?;
        resolved.insert(model_type, found.clone());
        Ok(found)
    }

    /// Predicted effort in hours of `task` on `resource`.
    pub fn predict_duration(
        &self,
        task: &Task,
        resource: &Resource,
        window_hours: f64,
        heuristic_uncertainty: f64,
    ) -> Result<Estimate> {
        if !task.effort_history.is_empty() {
            if let Some(model) = self.find(ModelType::DurationPredictor)? {
                let seq = duration_sequence(task, Some(resource), window_hours)?;
                if let Some((value, std)) = model.predict(&ModelInput::Sequence(seq))?.scalar() {
                    return Ok(Estimate {
                        value: value.max(0.0),
                        std,
                        source: model.source(),
                    });
                }
            }
        }

        let complexity = 1.0 + 0.04 * (task.complexity - 5.0);
        let proficiency = 1.25 - 0.5 * resource.skill_level.clamp(0.0, 1.0);
        let logged: f64 = task.effort_history.iter().sum();
        let value = (task.estimated_hours * complexity * proficiency).max(logged);
        Ok(Estimate {
            value,
            std: heuristic_uncertainty * value,
            source: ModelSource::Baseline,
        })
    }

    /// Suitability of `resource` for `task` in [0, 1].
    pub fn score_allocation(
        &self,
        task: &Task,
        resource: &Resource,
        ctx: &AllocationContext,
        heuristic_uncertainty: f64,
    ) -> Result<Estimate> {
        if let Some(model) = self.find(ModelType::ResourceAllocation)? {
            let features = allocation_features(task, resource, ctx)?;
            if let Some(probs) = model.predict(&ModelInput::Vector(features))?.probabilities() {
                let band = |b: usize| (b as f64 + 0.5) / SUITABILITY_BANDS as f64;
                let mean: f64 = probs.iter().enumerate().map(|(b, p)| p * band(b)).sum();
                let var: f64 = probs
                    .iter()
                    .enumerate()
                    .map(|(b, p)| p * (band(b) - mean).powi(2))
                    .sum();
                return Ok(Estimate {
                    value: mean,
                    std: var.sqrt(),
                    source: model.source(),
                });
            }
        }

        let value = skill_coverage(task, resource)
            * (0.5 + 0.5 * resource.skill_level.clamp(0.0, 1.0))
            * (1.0 - 0.5 * resource.current_utilization.clamp(0.0, 1.0));
        Ok(Estimate {
            value,
            std: heuristic_uncertainty.min(0.5),
            source: ModelSource::Baseline,
        })
    }

    /// Risk severity from 15 risk features, when a classifier is trained.
    pub fn classify_risk(&self, features: &[f64]) -> Result<Option<RiskEstimate>> {
        let Some(model) = self.find(ModelType::RiskAnalysis)? else {
            return Ok(None);
        };
        match model.predict(&ModelInput::Vector(features.to_vec()))? {
            Prediction::Class {
                index, confidence, ..
            } => Ok(Some(RiskEstimate {
                level: severity_level(index),
                confidence,
                source: model.source(),
            })),
            Prediction::Scalar { .. } => Err(PlanForgeError::Internal(
                "risk classifier returned a scalar".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests;
