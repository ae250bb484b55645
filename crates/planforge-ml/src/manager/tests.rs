//! Model manager tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use planforge_config::TrainingConfig;
use planforge_core::{ModelSource, PlanForgeError, Task};
use planforge_store::{FileModelStore, ModelType, StoredModel};
use planforge_test::{resources, separable_rows, sequence_rows, steady_history};

use super::*;
use crate::features::{cost_training_set, risk_features, AllocationContext};

fn quick_config() -> TrainingConfig {
    TrainingConfig {
        epochs: 30,
        hidden_units: vec![8],
        lstm_units: 4,
        ..TrainingConfig::default()
    }
}

fn risk_dataset() -> Dataset {
    let (rows, labels) = separable_rows(40, 15, 5, 3);
    Dataset::classification(rows, labels).unwrap()
}

/// In-memory store that counts latest-version reads.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryModelStore,
    loads: AtomicUsize,
}

impl CountingStore {
    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ModelStore for CountingStore {
    fn save(&self, metadata: ModelMetadata, blob: &[u8]) -> Result<ModelMetadata> {
        self.inner.save(metadata, blob)
    }

    fn load(&self, model_id: &str) -> Result<StoredModel> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(model_id)
    }

    fn load_version(&self, model_id: &str, version: u32) -> Result<StoredModel> {
        self.inner.load_version(model_id, version)
    }

    fn list(&self) -> Result<Vec<ModelMetadata>> {
        self.inner.list()
    }

    fn versions(&self, model_id: &str) -> Result<Vec<ModelMetadata>> {
        self.inner.versions(model_id)
    }

    fn delete(&self, model_id: &str) -> Result<()> {
        self.inner.delete(model_id)
    }
}

#[test]
fn test_train_model_persists_new_versions() {
    let manager = ModelManager::in_memory(quick_config());
    let dataset = risk_dataset();

    let v1 = manager
        .train_model("risk_analysis", ModelType::RiskAnalysis, &dataset, None)
        .unwrap();
    let v2 = manager
        .train_model("risk_analysis", ModelType::RiskAnalysis, &dataset, None)
        .unwrap();
    assert_eq!(v1.version, 1);
    assert_eq!(v2.version, 2);
    assert_eq!(v2.sample_count, 40);

    let listed = manager.list_models().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].version, 2);

    let found = manager.find(ModelType::RiskAnalysis).unwrap().unwrap();
    assert_eq!(
        found.source(),
        ModelSource::Trained {
            model_id: "risk_analysis".into(),
            version: 2
        }
    );
}

#[test]
fn test_saved_model_reloads_with_identical_inference() {
    let dir = tempfile::tempdir().unwrap();
    let (seqs, targets) = sequence_rows(20, 4, 8, 9);
    let dataset = Dataset::sequences(seqs.clone(), targets).unwrap();

    let first = ModelManager::new(
        Arc::new(FileModelStore::open(dir.path()).unwrap()),
        quick_config(),
    );
    first
        .train_model("schedule_forecaster", ModelType::ScheduleForecaster, &dataset, None)
        .unwrap();
    let before = first.find(ModelType::ScheduleForecaster).unwrap().unwrap();

    let second = ModelManager::new(
        Arc::new(FileModelStore::open(dir.path()).unwrap()),
        quick_config(),
    );
    let after = second.find(ModelType::ScheduleForecaster).unwrap().unwrap();
    assert_eq!(after.metadata, before.metadata);
    for seq in seqs.into_iter().take(4) {
        let input = ModelInput::Sequence(seq);
        assert_eq!(after.predict(&input).unwrap(), before.predict(&input).unwrap());
    }
}

#[test]
fn test_failed_training_creates_no_version() {
    let manager = ModelManager::in_memory(quick_config());
    let (rows, labels) = separable_rows(1, 15, 5, 3);
    let tiny = Dataset::classification(rows, labels).unwrap();

    let err = manager
        .train_model("risk_analysis", ModelType::RiskAnalysis, &tiny, None)
        .unwrap_err();
    assert!(matches!(err, PlanForgeError::InsufficientData { .. }));
    assert!(manager.list_models().unwrap().is_empty());
    assert!(manager.find(ModelType::RiskAnalysis).unwrap().is_none());
}

#[test]
fn test_invalid_hyperparameters_rejected() {
    let manager = ModelManager::in_memory(quick_config());
    let bad = quick_config().with_learning_rate(0.0);
    let err = manager
        .train_model("risk_analysis", ModelType::RiskAnalysis, &risk_dataset(), Some(&bad))
        .unwrap_err();
    assert!(matches!(err, PlanForgeError::Validation(_)));

    let err = manager
        .train_model("bad id!", ModelType::RiskAnalysis, &risk_dataset(), None)
        .unwrap_err();
    assert!(matches!(err, PlanForgeError::Validation(_)));
}

#[test]
fn test_delete_invalidates_cache() {
    let manager = ModelManager::in_memory(quick_config());
    manager
        .train_model("risk_analysis", ModelType::RiskAnalysis, &risk_dataset(), None)
        .unwrap();
    assert!(manager.find(ModelType::RiskAnalysis).unwrap().is_some());

    manager.delete_model("risk_analysis").unwrap();
    assert!(manager.find(ModelType::RiskAnalysis).unwrap().is_none());
    assert!(matches!(
        manager.load_model("risk_analysis").unwrap_err(),
        PlanForgeError::ModelNotFound { .. }
    ));
}

#[test]
fn test_find_rejects_mismatched_type() {
    let manager = ModelManager::in_memory(quick_config());
    manager
        .train_model("cost_forecaster", ModelType::RiskAnalysis, &risk_dataset(), None)
        .unwrap();
    assert!(matches!(
        manager.find(ModelType::CostForecaster).unwrap_err(),
        PlanForgeError::Validation(_)
    ));
}

#[test]
fn test_forecaster_falls_back_to_baseline() {
    let manager = ModelManager::in_memory(quick_config());
    let forecaster = manager.forecaster(ModelType::CostForecaster).unwrap();
    assert_eq!(forecaster.source(), ModelSource::Baseline);

    let rows: Vec<Vec<f64>> = (0..5).map(|d| vec![d as f64 * 10.0]).collect();
    let (value, _) = forecaster
        .predict(&ModelInput::Sequence(rows))
        .unwrap()
        .scalar()
        .unwrap();
    assert!((value - 50.0).abs() < 1e-9);
}

#[test]
fn test_trained_cost_forecaster_is_selected() {
    let manager = ModelManager::in_memory(quick_config());
    let dataset = cost_training_set(&steady_history("p", 40), 5).unwrap();
    manager
        .train_model("cost_forecaster", ModelType::CostForecaster, &dataset, None)
        .unwrap();
    let forecaster = manager.forecaster(ModelType::CostForecaster).unwrap();
    assert!(matches!(forecaster.source(), ModelSource::Trained { version: 1, .. }));
}

#[test]
fn test_heuristic_duration_without_model() {
    let manager = ModelManager::in_memory(quick_config());
    let pool = resources(1);
    let task = Task::new("t", 8.0).with_complexity(3.0);

    let estimate = manager.predict_duration(&task, &pool[0], 8.0, 0.25).unwrap();
    assert!(!estimate.is_trained());
    assert!((estimate.value - 7.36).abs() < 1e-9);
    assert!((estimate.cv() - 0.25).abs() < 1e-9);

    // Logged effort is a floor.
    let logged = task.with_history(vec![6.0, 6.0]);
    let estimate = manager.predict_duration(&logged, &pool[0], 8.0, 0.25).unwrap();
    assert_eq!(estimate.value, 12.0);
}

#[test]
fn test_heuristic_suitability_without_model() {
    let manager = ModelManager::in_memory(quick_config());
    let pool = resources(2);
    let task = Task::new("t", 8.0).with_skills(["backend"]);
    let ctx = AllocationContext::new(60, 8.0);

    let fit = manager.score_allocation(&task, &pool[0], &ctx, 0.25).unwrap();
    assert!((fit.value - 0.75).abs() < 1e-9);
    assert_eq!(fit.std, 0.25);
    assert_eq!(fit.source, ModelSource::Baseline);

    let misfit = manager.score_allocation(&task, &pool[1], &ctx, 0.25).unwrap();
    assert_eq!(misfit.value, 0.0);
}

#[test]
fn test_classify_risk_requires_trained_model() {
    let manager = ModelManager::in_memory(quick_config());
    let features = risk_features(&steady_history("p", 30), 15).unwrap();
    assert!(manager.classify_risk(&features).unwrap().is_none());

    manager
        .train_model("risk_analysis", ModelType::RiskAnalysis, &risk_dataset(), None)
        .unwrap();
    let risk = manager.classify_risk(&features).unwrap().unwrap();
    assert!(risk.confidence > 0.0 && risk.confidence <= 1.0);
    assert!(matches!(risk.source, ModelSource::Trained { .. }));
}

#[test]
fn test_severity_levels() {
    assert_eq!(severity_level(0), RiskLevel::Low);
    assert_eq!(severity_level(1), RiskLevel::Low);
    assert_eq!(severity_level(2), RiskLevel::Medium);
    assert_eq!(severity_level(3), RiskLevel::High);
    assert_eq!(severity_level(4), RiskLevel::Critical);
}

#[test]
fn test_session_reads_missing_models_once() {
    let store = Arc::new(CountingStore::default());
    let manager = ModelManager::new(store.clone(), quick_config());
    let pool = resources(6);
    let task = Task::new("t", 8.0)
        .with_skills(["backend"])
        .with_history(vec![3.0]);
    let ctx = AllocationContext::new(60, 8.0);

    let session = manager.session();
    for resource in &pool {
        let hours = session.predict_duration(&task, resource, 8.0, 0.25).unwrap();
        let fit = session.score_allocation(&task, resource, &ctx, 0.25).unwrap();
        assert!(!hours.is_trained());
        assert!(!fit.is_trained());
    }
    // One miss each for the duration and allocation models.
    assert_eq!(store.loads(), 2);

    // A fresh session looks again.
    assert!(manager
        .session()
        .find(ModelType::DurationPredictor)
        .unwrap()
        .is_none());
    assert_eq!(store.loads(), 3);
}

#[test]
fn test_concurrent_saves_keep_newest_version_cached() {
    let manager = ModelManager::in_memory(quick_config());
    manager
        .train_model("risk_analysis", ModelType::RiskAnalysis, &risk_dataset(), None)
        .unwrap();
    let artifact = manager.load_model("risk_analysis").unwrap().artifact.clone();
    let dataset = risk_dataset();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..5 {
                    manager.save_model("risk_analysis", &artifact).unwrap();
                }
            });
        }
        scope.spawn(|| {
            manager
                .train_model("risk_analysis", ModelType::RiskAnalysis, &dataset, None)
                .unwrap();
        });
    });

    let stored = manager.store().load("risk_analysis").unwrap();
    let cached = manager.load_model("risk_analysis").unwrap();
    assert_eq!(stored.metadata.version, 22);
    assert_eq!(cached.metadata.version, stored.metadata.version);
}

#[test]
fn test_save_model_rejects_invalid_id() {
    let manager = ModelManager::in_memory(quick_config());
    manager
        .train_model("risk_analysis", ModelType::RiskAnalysis, &risk_dataset(), None)
        .unwrap();
    let artifact = manager.load_model("risk_analysis").unwrap().artifact.clone();
    assert!(matches!(
        manager.save_model("../escape", &artifact).unwrap_err(),
        PlanForgeError::Validation(_)
    ));
}
