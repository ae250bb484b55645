//! PlanForge ML - feature extraction, neural models and model management.
//!
//! This crate provides:
//! - Feature extractors for allocation, duration, cost, schedule and risk
//! - A normalizer fitted at training time and persisted with the model
//! - Dense feed-forward classifiers and LSTM regressors trained with Adam
//! - A least-squares trend baseline for forecasting without trained models
//! - [`ModelManager`], which trains, versions, caches and serves models

pub mod features;
pub mod manager;
pub mod model;
pub mod nn;

pub use features::{AllocationContext, Normalizer};
pub use manager::{
    severity_level, Estimate, ForecastModel, LoadedModel, ModelManager, ModelSession,
    RiskEstimate,
};
pub use model::{
    BaselineForecaster, Dataset, FeedForwardClassifier, Model, ModelArtifact, ModelInput,
    Prediction, Sample, SequenceRegressor, Target, TrainingReport,
};
pub use planforge_store::ModelType;
