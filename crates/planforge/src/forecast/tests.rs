//! Forecast service tests.

use std::time::Duration;

use planforge_config::TrainingConfig;
use planforge_core::ConfidenceLevel;
use planforge_ml::features::cost_training_set;
use planforge_ml::Dataset;
use planforge_test::{overrun_history, separable_rows, steady_history};

use super::*;

fn service() -> ForecastService {
    ForecastService::new(
        ForecastSettings::default(),
        Arc::new(ModelManager::in_memory(quick_config())),
    )
}

fn quick_config() -> TrainingConfig {
    TrainingConfig {
        epochs: 30,
        hidden_units: vec![8],
        lstm_units: 4,
        ..TrainingConfig::default()
    }
}

fn forecast_one(
    service: &ForecastService,
    series: &HistoricalSeries,
    forecast_type: ForecastType,
    config: &ForecastConfig,
) -> Result<Forecast> {
    let response = service.forecast(series, &[forecast_type], config, &CancellationToken::new())?;
    Ok(response.forecasts[0].clone())
}

#[test]
fn test_short_history_is_insufficient() {
    let err = forecast_one(
        &service(),
        &steady_history("p", 10),
        ForecastType::Cost,
        &ForecastConfig::default().with_window(30),
    )
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

#[test]
fn test_window_override_allows_short_history() {
    let forecast = forecast_one(
        &service(),
        &steady_history("p", 10),
        ForecastType::Cost,
        &ForecastConfig::default().with_window(5).with_horizon(3),
    )
    .unwrap();
    assert_eq!(forecast.points.len(), 3);
}

#[test]
fn test_steady_project_is_low_risk() {
    let service = service();
    let series = steady_history("steady", 40);
    let config = ForecastConfig::default().with_horizon(7);
    let response = service
        .forecast(
            &series,
            &[ForecastType::Cost, ForecastType::Schedule, ForecastType::Risk],
            &config,
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(response.project_id, "steady");
    assert_eq!(response.forecasts.len(), 3);
    for forecast in &response.forecasts {
        assert_eq!(forecast.horizon, 7);
        assert_eq!(forecast.points.len(), 7);
        assert_eq!(forecast.source, ModelSource::Baseline);
        assert!(!forecast.partial);
        for ((lo, p), hi) in forecast.lower.iter().zip(&forecast.points).zip(&forecast.upper) {
            assert!(lo <= p && p <= hi);
        }
    }
    assert_eq!(response.overall_risk(), RiskLevel::Low);
    let cost = response.get(ForecastType::Cost).unwrap();
    assert!(cost.variance_pct.abs() < 5.0, "{}", cost.variance_pct);
}

#[test]
fn test_overrunning_project_is_critical() {
    let service = service();
    let series = overrun_history("late", 40);
    let response = service
        .forecast(
            &series,
            &[ForecastType::Cost, ForecastType::Schedule, ForecastType::Risk],
            &ForecastConfig::default(),
            &CancellationToken::new(),
        )
        .unwrap();
    for forecast in &response.forecasts {
        assert_eq!(
            forecast.risk_level,
            RiskLevel::Critical,
            "{} at {:.1}%",
            forecast.forecast_type,
            forecast.variance_pct
        );
    }
}

#[test]
fn test_schedule_points_never_regress() {
    let forecast = forecast_one(
        &service(),
        &steady_history("p", 30),
        ForecastType::Schedule,
        &ForecastConfig::default().with_horizon(90),
    )
    .unwrap();
    let mut last = 30.0;
    for &p in &forecast.points {
        assert!(p >= last && p <= 100.0);
        last = p;
    }
    assert_eq!(forecast.final_point(), Some(100.0));
}

#[test]
fn test_higher_confidence_never_narrows() {
    let service = service();
    let series = steady_history("p", 45);
    let levels = [
        ConfidenceLevel::P80,
        ConfidenceLevel::P90,
        ConfidenceLevel::P95,
        ConfidenceLevel::P99,
    ];
    for forecast_type in [ForecastType::Cost, ForecastType::Risk] {
        let widths: Vec<Vec<f64>> = levels
            .iter()
            .map(|&level| {
                let config = ForecastConfig::default()
                    .with_horizon(5)
                    .with_confidence(level);
                let f = forecast_one(&service, &series, forecast_type, &config).unwrap();
                f.upper.iter().zip(&f.lower).map(|(u, l)| u - l).collect()
            })
            .collect();
        for pair in widths.windows(2) {
            for (narrow, wide) in pair[0].iter().zip(&pair[1]) {
                assert!(wide >= narrow);
            }
        }
    }
}

#[test]
fn test_risk_interval_widens_with_horizon() {
    let forecast = forecast_one(
        &service(),
        &overrun_history("p", 30),
        ForecastType::Risk,
        &ForecastConfig::default().with_horizon(4),
    )
    .unwrap();
    let widths: Vec<f64> = forecast
        .upper
        .iter()
        .zip(&forecast.lower)
        .map(|(u, l)| u - l)
        .collect();
    for pair in widths.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
}

#[test]
fn test_expired_deadline_returns_partial() {
    let config = ForecastConfig {
        timeout: Some(Duration::ZERO),
        ..ForecastConfig::default().with_horizon(10)
    };
    let forecast =
        forecast_one(&service(), &steady_history("p", 40), ForecastType::Cost, &config).unwrap();
    assert!(forecast.partial);
    assert!(forecast.points.is_empty());
    assert_eq!(forecast.horizon, 0);
}

#[test]
fn test_cancelled_before_start() {
    let token = CancellationToken::new();
    token.cancel();
    let err = service()
        .forecast(
            &steady_history("p", 40),
            &[ForecastType::Cost],
            &ForecastConfig::default(),
            &token,
        )
        .unwrap_err();
    assert!(matches!(err, PlanForgeError::Cancelled));
}

#[test]
fn test_rejects_empty_request() {
    let service = service();
    let series = steady_history("p", 40);
    let token = CancellationToken::new();
    assert!(service
        .forecast(&series, &[], &ForecastConfig::default(), &token)
        .is_err());
    let zero = ForecastConfig::default().with_horizon(0);
    assert!(service
        .forecast(&series, &[ForecastType::Cost], &zero, &token)
        .is_err());
}

#[test]
fn test_duplicate_types_answered_once() {
    let response = service()
        .forecast(
            &steady_history("p", 40),
            &[ForecastType::Risk, ForecastType::Cost, ForecastType::Risk],
            &ForecastConfig::default().with_horizon(2),
            &CancellationToken::new(),
        )
        .unwrap();
    let types: Vec<ForecastType> = response.forecasts.iter().map(|f| f.forecast_type).collect();
    assert_eq!(types, vec![ForecastType::Risk, ForecastType::Cost]);
}

#[test]
fn test_trained_models_are_preferred() {
    let models = Arc::new(ModelManager::in_memory(quick_config()));
    let series = steady_history("p", 45);
    let costs = cost_training_set(&series, 5).unwrap();
    models
        .train_model("cost_forecaster", ModelType::CostForecaster, &costs, None)
        .unwrap();
    let (rows, labels) = separable_rows(40, 15, 5, 3);
    let risk = Dataset::classification(rows, labels).unwrap();
    models
        .train_model("risk_analysis", ModelType::RiskAnalysis, &risk, None)
        .unwrap();

    let service = ForecastService::new(ForecastSettings::default(), models);
    let response = service
        .forecast(
            &series,
            &[ForecastType::Cost, ForecastType::Risk],
            &ForecastConfig::default().with_horizon(3),
            &CancellationToken::new(),
        )
        .unwrap();
    for forecast in &response.forecasts {
        assert!(matches!(forecast.source, ModelSource::Trained { version: 1, .. }));
        assert_eq!(forecast.points.len(), 3);
    }
}

#[test]
fn test_variance_thresholds() {
    let t = RiskThresholds::default();
    assert_eq!(risk_from_variance(-20.0, &t), RiskLevel::Low);
    assert_eq!(risk_from_variance(4.9, &t), RiskLevel::Low);
    assert_eq!(risk_from_variance(5.0, &t), RiskLevel::Medium);
    assert_eq!(risk_from_variance(15.0, &t), RiskLevel::High);
    assert_eq!(risk_from_variance(45.0, &t), RiskLevel::Critical);
}
