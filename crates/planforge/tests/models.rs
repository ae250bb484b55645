//! Model lifecycle through the engine with a file-backed store.

use std::sync::Arc;

use planforge::{
    Dataset, EngineConfig, FileModelStore, ModelType, PlanForge, PlanForgeError, TrainingConfig,
};
use planforge_ml::ModelInput;
use planforge_test::separable_rows;
use tempfile::TempDir;

fn quick_training() -> TrainingConfig {
    TrainingConfig {
        epochs: 30,
        hidden_units: vec![8],
        ..TrainingConfig::default()
    }
}

fn engine_at(dir: &TempDir) -> PlanForge {
    let config = EngineConfig {
        training: quick_training(),
        ..EngineConfig::default()
    };
    PlanForge::builder()
        .with_config(config)
        .with_store(Arc::new(FileModelStore::open(dir.path()).unwrap()))
        .build()
        .unwrap()
}

fn risk_dataset() -> Dataset {
    let (rows, labels) = separable_rows(40, 15, 5, 11);
    Dataset::classification(rows, labels).unwrap()
}

#[tokio::test]
async fn test_reloaded_model_predicts_identically() {
    let dir = TempDir::new().unwrap();
    let engine = engine_at(&dir);
    let metadata = engine
        .train_model("risk_analysis", ModelType::RiskAnalysis, risk_dataset(), None)
        .await
        .unwrap();
    assert_eq!(metadata.model_type, ModelType::RiskAnalysis);
    assert_eq!(metadata.version, 1);

    let (probe, _) = separable_rows(3, 15, 5, 77);
    let trained = engine.load_model("risk_analysis").unwrap();

    // A second engine reads the same directory with a cold cache.
    let reopened = engine_at(&dir);
    let loaded = reopened.load_model("risk_analysis").unwrap();
    assert_eq!(loaded.metadata.version, trained.metadata.version);
    assert_eq!(loaded.metadata.weights_ref, trained.metadata.weights_ref);
    for row in probe {
        let input = ModelInput::Vector(row);
        assert_eq!(
            trained.predict(&input).unwrap(),
            loaded.predict(&input).unwrap()
        );
    }
}

#[tokio::test]
async fn test_versions_list_and_delete() {
    let dir = TempDir::new().unwrap();
    let engine = engine_at(&dir);
    for expected in 1..=2 {
        let metadata = engine
            .train_model("risk_analysis", ModelType::RiskAnalysis, risk_dataset(), None)
            .await
            .unwrap();
        assert_eq!(metadata.version, expected);
    }

    let copy = engine.load_model("risk_analysis").unwrap();
    let saved = engine.save_model("risk_copy", &copy.artifact).unwrap();
    assert_eq!(saved.version, 1);

    let ids: Vec<String> = engine
        .list_models()
        .unwrap()
        .into_iter()
        .map(|m| m.model_id)
        .collect();
    assert_eq!(ids, vec!["risk_analysis".to_string(), "risk_copy".to_string()]);

    engine.delete_model("risk_copy").unwrap();
    assert!(matches!(
        engine.load_model("risk_copy"),
        Err(PlanForgeError::ModelNotFound { .. })
    ));
}

#[tokio::test]
async fn test_invalid_model_id_rejected() {
    let dir = TempDir::new().unwrap();
    let err = engine_at(&dir)
        .train_model("../escape", ModelType::RiskAnalysis, risk_dataset(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PlanForgeError::Validation(_)));
}

#[tokio::test]
async fn test_default_store_lives_under_configured_root() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::default().with_store_root(dir.path().join("models"));
    let engine = PlanForge::builder().with_config(config).build().unwrap();
    assert!(engine.list_models().unwrap().is_empty());
    assert!(dir.path().join("models").exists());
}
