//! The `PlanForge` engine.

use std::fmt;
use std::sync::{Arc, Mutex};

use planforge_config::{EngineConfig, TrainingConfig};
use planforge_core::{
    BottleneckWarning, ForecastConfig, ForecastResponse, ForecastType, OptimizationRequest,
    OptimizationResult, PlanForgeError, Recommendation, Result, ResultId,
};
use planforge_ga::CancellationToken;
use planforge_ml::{Dataset, LoadedModel, ModelArtifact, ModelManager, ModelType};
use planforge_store::{
    FileModelStore, InMemoryModelStore, ModelMetadata, ModelStore, RetryPolicy, RetryingStore,
};
use tokio::task::{spawn_blocking, JoinError};
use tracing::info;

use crate::forecast::ForecastService;
use crate::history::{HistoryProvider, InMemoryHistoryProvider};
use crate::orchestrator::Orchestrator;
use crate::registry::ResultRegistry;

fn join_error(err: JoinError) -> PlanForgeError {
    PlanForgeError::Internal(format!("worker task failed: {err}"))
}

struct Inner {
    config: EngineConfig,
    models: Arc<ModelManager>,
    orchestrator: Orchestrator,
    forecasts: ForecastService,
    history: Arc<dyn HistoryProvider>,
    results: ResultRegistry,
    cancel: Mutex<CancellationToken>,
}

impl Inner {
    fn current_token(&self) -> Result<CancellationToken> {
        self.cancel
            .lock()
            .map(|token| token.clone())
            .map_err(|_| PlanForgeError::Internal("cancellation lock poisoned".into()))
    }
}

/// Resource allocation and forecasting engine.
///
/// Cheap to clone; clones share models, results and the cancellation
/// token. CPU-bound work runs on tokio's blocking pool.
#[derive(Clone)]
pub struct PlanForge {
    inner: Arc<Inner>,
}

impl fmt::Debug for PlanForge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanForge")
            .field("models", &self.inner.models)
            .field("history", &self.inner.history)
            .field("results", &self.inner.results.len())
            .finish()
    }
}

impl PlanForge {
    pub fn builder() -> PlanForgeBuilder {
        PlanForgeBuilder::new()
    }

    /// Engine with an in-memory model store and history provider.
    pub fn in_memory(config: EngineConfig) -> Result<Self> {
        Self::builder()
            .with_config(config)
            .with_store(Arc::new(InMemoryModelStore::new()))
            .build()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn models(&self) -> &Arc<ModelManager> {
        &self.inner.models
    }

    /// Optimizes `request` and registers the result under a fresh id.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::optimize`].
    pub async fn request_optimization(
        &self,
        request: OptimizationRequest,
    ) -> Result<Arc<OptimizationResult>> {
        let cancel = self.inner.current_token()?;
        let id = self.inner.results.next_id();
        let inner = Arc::clone(&self.inner);
        let result = spawn_blocking(move || inner.orchestrator.optimize(&request, id, cancel))
            .await
            .map_err(join_error)??;
        self.inner.results.insert(result)
    }

    pub fn get_result(&self, result_id: &ResultId) -> Result<Arc<OptimizationResult>> {
        self.inner.results.get(result_id)
    }

    pub fn get_recommendations(&self, result_id: &ResultId) -> Result<Vec<Recommendation>> {
        Ok(self.get_result(result_id)?.recommendations.clone())
    }

    pub fn get_bottlenecks(&self, result_id: &ResultId) -> Result<Vec<BottleneckWarning>> {
        Ok(self.get_result(result_id)?.bottlenecks.clone())
    }

    /// Forecasts `forecast_types` for the project's recorded history.
    pub async fn generate_forecast(
        &self,
        project_id: &str,
        forecast_types: &[ForecastType],
        config: ForecastConfig,
    ) -> Result<ForecastResponse> {
        let cancel = self.inner.current_token()?;
        let inner = Arc::clone(&self.inner);
        let project_id = project_id.to_string();
        let types = forecast_types.to_vec();
        spawn_blocking(move || {
            let series = inner.history.history(&project_id)?;
            inner.forecasts.forecast(&series, &types, &config, &cancel)
        })
        .await
        .map_err(join_error)?
    }

    /// Trains and stores a new version of `model_id`.
    ///
    /// `hyperparams` replaces the configured training settings for this
    /// job only.
    pub async fn train_model(
        &self,
        model_id: &str,
        model_type: ModelType,
        dataset: Dataset,
        hyperparams: Option<TrainingConfig>,
    ) -> Result<ModelMetadata> {
        let models = Arc::clone(&self.inner.models);
        let model_id = model_id.to_string();
        spawn_blocking(move || {
            models.train_model(&model_id, model_type, &dataset, hyperparams.as_ref())
        })
        .await
        .map_err(join_error)?
    }

    pub fn save_model(&self, model_id: &str, artifact: &ModelArtifact) -> Result<ModelMetadata> {
        self.inner.models.save_model(model_id, artifact)
    }

    pub fn load_model(&self, model_id: &str) -> Result<Arc<LoadedModel>> {
        self.inner.models.load_model(model_id)
    }

    pub fn list_models(&self) -> Result<Vec<ModelMetadata>> {
        self.inner.models.list_models()
    }

    pub fn delete_model(&self, model_id: &str) -> Result<()> {
        self.inner.models.delete_model(model_id)
    }

    /// Cancels every running optimization and forecast.
    ///
    /// Work started afterwards gets a fresh token.
    pub fn cancel_all(&self) -> Result<()> {
        let mut token = self
            .inner
            .cancel
            .lock()
            .map_err(|_| PlanForgeError::Internal("cancellation lock poisoned".into()))?;
        token.cancel();
        *token = CancellationToken::new();
        info!(event = "cancel_all");
        Ok(())
    }
}

/// Builder for [`PlanForge`].
///
/// Without an explicit store, models are kept in a file store at
/// `config.store.root` with the configured retry policy.
#[derive(Default)]
pub struct PlanForgeBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn ModelStore>>,
    history: Option<Arc<dyn HistoryProvider>>,
}

impl PlanForgeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ModelStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryProvider>) -> Self {
        self.history = Some(history);
        self
    }

    /// # Errors
    ///
    /// `Validation` for an invalid configuration and `Persistence` when the
    /// default file store cannot be opened.
    pub fn build(self) -> Result<PlanForge> {
        #[cfg(feature = "console")]
        planforge_console::init();

        let config = self.config;
        config
            .validate()
            .map_err(|e| PlanForgeError::Validation(e.to_string()))?;
        let store: Arc<dyn ModelStore> = match self.store {
            Some(store) => store,
            None => Arc::new(RetryingStore::new(
                FileModelStore::open(config.store.root.clone())?,
                RetryPolicy::from_config(&config.store),
            )),
        };
        let models = Arc::new(ModelManager::new(store, config.training.clone()));
        let orchestrator = Orchestrator::new(config.clone(), Arc::clone(&models))?;
        let forecasts = ForecastService::new(config.forecast.clone(), Arc::clone(&models));
        let history = self
            .history
            .unwrap_or_else(|| Arc::new(InMemoryHistoryProvider::new()));

        info!(
            event = "engine_ready",
            worker_threads = config.worker_threads.resolve(),
            population = config.genetic.population_size,
        );
        Ok(PlanForge {
            inner: Arc::new(Inner {
                config,
                models,
                orchestrator,
                forecasts,
                history,
                results: ResultRegistry::new(),
                cancel: Mutex::new(CancellationToken::new()),
            }),
        })
    }
}
