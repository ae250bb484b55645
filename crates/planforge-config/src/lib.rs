//! Configuration system for PlanForge.
//!
//! Load engine configuration from TOML or YAML files to tune the genetic
//! search, goal weights, training hyperparameters, forecasting and model
//! storage without code changes.
//!
//! # Examples
//!
//! Load configuration from a TOML string:
//!
//! ```
//! use planforge_config::EngineConfig;
//!
//! let config = EngineConfig::from_toml_str(r#"
//!     random_seed = 7
//!
//!     [genetic]
//!     population_size = 80
//!     max_generations = 300
//!
//!     [goal_weights.minimize_cost]
//!     cost = 0.7
//!     utilization = 0.1
//!     baseline = 0.2
//! "#).unwrap();
//!
//! assert_eq!(config.random_seed, Some(7));
//! assert_eq!(config.genetic.population_size, 80);
//! assert_eq!(config.genetic.tournament_size, 5);
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use planforge_config::EngineConfig;
//!
//! let config = EngineConfig::load("planforge.toml").unwrap_or_default();
//! // Proceeds with defaults if file doesn't exist
//! ```

mod weights;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use weights::GoalWeightTable;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main engine configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Random seed used when a request does not carry its own.
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Number of threads for parallel fitness evaluation.
    #[serde(default)]
    pub worker_threads: WorkerThreadCount,

    /// Genetic search parameters.
    #[serde(default)]
    pub genetic: GeneticConfig,

    /// Fitness weight vector per optimization goal.
    #[serde(default)]
    pub goal_weights: GoalWeightTable,

    /// Default training hyperparameters.
    #[serde(default)]
    pub training: TrainingConfig,

    /// Forecast windows and risk thresholds.
    #[serde(default)]
    pub forecast: ForecastSettings,

    /// Recommendation and bottleneck thresholds.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Model store location and retry policy.
    #[serde(default)]
    pub store: StoreConfig,
}

impl EngineConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Sets the genetic search parameters.
    pub fn with_genetic(mut self, genetic: GeneticConfig) -> Self {
        self.genetic = genetic;
        self
    }

    /// Sets the model store root directory.
    pub fn with_store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.store.root = root.into();
        self
    }

    /// Sets the worker thread count.
    pub fn with_worker_threads(mut self, threads: WorkerThreadCount) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Checks ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.genetic.validate()?;
        self.goal_weights.validate()?;
        self.training.validate()?;
        self.forecast.validate()?;
        self.store.validate()?;
        if let WorkerThreadCount::Count(0) = self.worker_threads {
            return Err(ConfigError::Invalid(
                "worker_threads count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Worker thread count for parallel fitness evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerThreadCount {
    /// One thread per available core.
    #[default]
    Auto,

    /// Evaluate on the calling thread.
    None,

    /// Specific number of threads.
    Count(usize),
}

impl WorkerThreadCount {
    /// Resolves to a concrete thread count.
    pub fn resolve(&self) -> usize {
        match self {
            WorkerThreadCount::Auto => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            WorkerThreadCount::None => 1,
            WorkerThreadCount::Count(n) => (*n).max(1),
        }
    }
}

/// Genetic search configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GeneticConfig {
    pub population_size: usize,
    pub max_generations: u32,
    pub tournament_size: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    /// Fraction of the population carried over unchanged (rounded up).
    pub elite_ratio: f64,
    /// Generations without `improvement_epsilon` gain before converging.
    pub stagnation_generations: u32,
    pub improvement_epsilon: f64,
    /// Fitness subtracted per constraint violation.
    pub violation_penalty: f64,
    /// Default wall-clock limit when the request has none.
    pub time_limit_ms: Option<u64>,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_generations: 200,
            tournament_size: 5,
            crossover_rate: 0.8,
            mutation_rate: 0.1,
            elite_ratio: 0.1,
            stagnation_generations: 25,
            improvement_epsilon: 1e-4,
            violation_penalty: 0.1,
            time_limit_ms: None,
        }
    }
}

impl GeneticConfig {
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    pub fn with_max_generations(mut self, generations: u32) -> Self {
        self.max_generations = generations;
        self
    }

    pub fn with_stagnation(mut self, generations: u32, epsilon: f64) -> Self {
        self.stagnation_generations = generations;
        self.improvement_epsilon = epsilon;
        self
    }

    /// Number of elites carried per generation: ⌈population × ratio⌉.
    pub fn elite_count(&self) -> usize {
        let count = (self.population_size as f64 * self.elite_ratio).ceil() as usize;
        count.min(self.population_size)
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::Invalid(
                "genetic.population_size must be at least 2".into(),
            ));
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::Invalid(
                "genetic.tournament_size must be at least 1".into(),
            ));
        }
        for (name, p) in [
            ("crossover_rate", self.crossover_rate),
            ("mutation_rate", self.mutation_rate),
            ("elite_ratio", self.elite_ratio),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Invalid(format!(
                    "genetic.{name} must be within [0, 1]"
                )));
            }
        }
        if !self.improvement_epsilon.is_finite() || self.improvement_epsilon < 0.0 {
            return Err(ConfigError::Invalid(
                "genetic.improvement_epsilon must be >= 0".into(),
            ));
        }
        if !self.violation_penalty.is_finite() || self.violation_penalty < 0.0 {
            return Err(ConfigError::Invalid(
                "genetic.violation_penalty must be finite and >= 0".into(),
            ));
        }
        Ok(())
    }
}

/// Normalization transform fitted on training data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationKind {
    #[default]
    ZScore,
    MinMax,
}

/// Training hyperparameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct TrainingConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of samples held out for early stopping.
    pub validation_split: f64,
    /// Epochs without validation improvement before stopping.
    pub patience: usize,
    pub min_delta: f64,
    /// Hidden layer widths of feed-forward models.
    pub hidden_units: Vec<usize>,
    /// Hidden state width of LSTM models.
    pub lstm_units: usize,
    pub normalization: NormalizationKind,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.005,
            epochs: 150,
            batch_size: 16,
            validation_split: 0.2,
            patience: 15,
            min_delta: 1e-5,
            hidden_units: vec![32, 16],
            lstm_units: 16,
            normalization: NormalizationKind::ZScore,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ConfigError::Invalid(
                "training.learning_rate must be positive".into(),
            ));
        }
        if self.epochs == 0 || self.batch_size == 0 || self.lstm_units == 0 {
            return Err(ConfigError::Invalid(
                "training.epochs, batch_size and lstm_units must be positive".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(ConfigError::Invalid(
                "training.validation_split must be within [0, 1)".into(),
            ));
        }
        if self.hidden_units.iter().any(|&u| u == 0) {
            return Err(ConfigError::Invalid(
                "training.hidden_units entries must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Thresholds (percent) separating risk levels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 5.0,
            high: 15.0,
            critical: 30.0,
        }
    }
}

/// Forecast windows and classification thresholds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ForecastSettings {
    pub cost_window: usize,
    pub schedule_window: usize,
    pub risk_window: usize,
    pub risk_thresholds: RiskThresholds,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            cost_window: 30,
            schedule_window: 20,
            risk_window: 15,
            risk_thresholds: RiskThresholds::default(),
        }
    }
}

impl ForecastSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.cost_window == 0 || self.schedule_window == 0 || self.risk_window == 0 {
            return Err(ConfigError::Invalid(
                "forecast windows must be positive".into(),
            ));
        }
        let t = self.risk_thresholds;
        if !(t.medium <= t.high && t.high <= t.critical) {
            return Err(ConfigError::Invalid(
                "forecast.risk_thresholds must be ascending".into(),
            ));
        }
        Ok(())
    }
}

/// Thresholds used when turning a plan into warnings and recommendations.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct OrchestratorConfig {
    /// Utilization above which a resource is a bottleneck.
    pub overload_threshold: f64,
    /// Coefficient of variation above which predictions are flagged.
    pub high_uncertainty_cv: f64,
    /// Suitability below which a reassignment is suggested.
    pub low_suitability: f64,
    /// Relative uncertainty used when no duration model is trained.
    pub heuristic_uncertainty: f64,
    pub max_recommendations: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            overload_threshold: 0.95,
            high_uncertainty_cv: 0.3,
            low_suitability: 0.4,
            heuristic_uncertainty: 0.25,
            max_recommendations: 10,
        }
    }
}

/// Model store configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct StoreConfig {
    /// Root directory of the file-backed store.
    pub root: PathBuf,
    pub retry_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("models"),
            retry_attempts: 3,
            initial_backoff_ms: 50,
            backoff_multiplier: 2.0,
            max_backoff_ms: 2_000,
        }
    }
}

impl StoreConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "store.retry_attempts must be at least 1".into(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "store.backoff_multiplier must be >= 1".into(),
            ));
        }
        Ok(())
    }
}
