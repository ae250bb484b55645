//! Forecasting through the engine with injected history.

use std::sync::Arc;

use planforge::{
    EngineConfig, ForecastConfig, ForecastType, InMemoryHistoryProvider, ModelSource, ModelType,
    PlanForge, PlanForgeError, RiskLevel, TrainingConfig,
};
use planforge_ml::features::cost_training_set;
use planforge_store::InMemoryModelStore;
use planforge_test::{overrun_history, steady_history};

fn engine() -> PlanForge {
    let history = InMemoryHistoryProvider::new()
        .with_series(steady_history("steady", 40))
        .with_series(steady_history("short", 10))
        .with_series(overrun_history("late", 40));
    PlanForge::builder()
        .with_config(EngineConfig::default())
        .with_store(Arc::new(InMemoryModelStore::new()))
        .with_history(Arc::new(history))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_short_history_is_rejected() {
    let err = engine()
        .generate_forecast(
            "short",
            &[ForecastType::Cost],
            ForecastConfig::default().with_window(30),
        )
        .await
        .unwrap_err();
    match err {
        PlanForgeError::InsufficientHistory {
            required, actual, ..
        } => {
            assert_eq!(required, 31);
            assert_eq!(actual, 10);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_project_has_no_history() {
    let err = engine()
        .generate_forecast("ghost", &[ForecastType::Risk], ForecastConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PlanForgeError::InsufficientHistory { actual: 0, .. }
    ));
}

#[tokio::test]
async fn test_steady_and_late_projects() {
    let engine = engine();
    let all = [ForecastType::Cost, ForecastType::Schedule, ForecastType::Risk];

    let steady = engine
        .generate_forecast("steady", &all, ForecastConfig::default().with_horizon(10))
        .await
        .unwrap();
    assert_eq!(steady.forecasts.len(), 3);
    assert_eq!(steady.overall_risk(), RiskLevel::Low);

    let late = engine
        .generate_forecast("late", &all, ForecastConfig::default().with_horizon(10))
        .await
        .unwrap();
    assert_eq!(late.overall_risk(), RiskLevel::Critical);
}

#[tokio::test]
async fn test_forecast_after_cancel_all_still_runs() {
    let engine = engine();
    engine.cancel_all().unwrap();
    let response = engine
        .generate_forecast("steady", &[ForecastType::Cost], ForecastConfig::default())
        .await
        .unwrap();
    assert!(!response.forecasts[0].partial);
}

#[tokio::test]
async fn test_trained_forecaster_is_used() {
    let engine = engine();
    let series = steady_history("steady", 40);
    let dataset = cost_training_set(&series, 5).unwrap();
    let hyperparams = TrainingConfig {
        epochs: 20,
        lstm_units: 4,
        ..TrainingConfig::default()
    };
    let metadata = engine
        .train_model(
            ModelType::CostForecaster.as_str(),
            ModelType::CostForecaster,
            dataset,
            Some(hyperparams),
        )
        .await
        .unwrap();
    assert_eq!(metadata.version, 1);

    let response = engine
        .generate_forecast(
            "steady",
            &[ForecastType::Cost],
            ForecastConfig::default().with_horizon(4),
        )
        .await
        .unwrap();
    let cost = response.get(ForecastType::Cost).unwrap();
    assert_eq!(
        cost.source,
        ModelSource::Trained {
            model_id: "cost_forecaster".into(),
            version: 1,
        }
    );
    assert_eq!(cost.points.len(), 4);
}
