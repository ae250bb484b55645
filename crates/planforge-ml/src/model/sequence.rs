//! LSTM regressor with a linear head.

use planforge_config::TrainingConfig;
use planforge_core::{PlanForgeError, Result};
use planforge_store::ModelType;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::training::{batches, split_indices, EarlyStopping, TrainingReport, Verdict};
use super::{require_samples, Dataset, Model, ModelInput, Prediction, Target};
use crate::features::{ensure_width, Normalizer};
use crate::nn::{clip_global_norm, Adam, Dense, Lstm};

const CLIP_NORM: f64 = 5.0;

/// Maps a sequence of feature rows to one scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRegressor {
    model_type: ModelType,
    input_width: usize,
    lstm: Lstm,
    head: Dense,
    normalizer: Normalizer,
    report: Option<TrainingReport>,
}

#[derive(Debug, Clone)]
struct Network {
    lstm: Lstm,
    head: Dense,
}

impl Network {
    fn new(input_width: usize, hidden: usize, rng: &mut ChaCha8Rng) -> Self {
        Self {
            lstm: Lstm::new(input_width, hidden, rng),
            head: Dense::new(hidden, 1, rng),
        }
    }

    fn predict(&self, seq: &[Vec<f64>]) -> f64 {
        let trace = self.lstm.forward(seq);
        self.head.forward(trace.hidden())[0]
    }
}

type Prepared = (Vec<Vec<f64>>, f64, f64);

/// Mean squared error (normalized units) and residuals (raw units).
fn evaluate(
    net: &Network,
    normalizer: &Normalizer,
    data: &[Prepared],
    indices: &[usize],
) -> (f64, Vec<f64>) {
    let mut sse = 0.0;
    let mut residuals = Vec::with_capacity(indices.len());
    for &i in indices {
        let (seq, y_norm, y_raw) = &data[i];
        let pred = net.predict(seq);
        sse += (pred - y_norm).powi(2);
        residuals.push(normalizer.invert_target(pred) - y_raw);
    }
    (sse / indices.len().max(1) as f64, residuals)
}

fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
}

impl SequenceRegressor {
    /// Creates an untrained regressor.
    pub fn new(model_type: ModelType, input_width: usize, config: &TrainingConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let net = Network::new(input_width, config.lstm_units, &mut rng);
        Self {
            model_type,
            input_width,
            lstm: net.lstm,
            head: net.head,
            normalizer: Normalizer::identity(input_width),
            report: None,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn report(&self) -> Option<&TrainingReport> {
        self.report.as_ref()
    }

    fn check_dataset<'a>(&self, dataset: &'a Dataset) -> Result<Vec<(&'a [Vec<f64>], f64)>> {
        require_samples(dataset)?;
        dataset
            .samples()
            .iter()
            .map(|s| {
                let seq = s.input.as_sequence()?;
                for row in seq {
                    ensure_width("sequence sample", row, self.input_width)?;
                }
                match s.target {
                    Target::Value(y) if y.is_finite() => Ok((seq, y)),
                    Target::Value(_) => {
                        Err(PlanForgeError::validation("regression targets must be finite"))
                    }
                    Target::Class(_) => Err(PlanForgeError::validation(
                        "sequence samples need value targets",
                    )),
                }
            })
            .collect()
    }
}

impl Model for SequenceRegressor {
    fn model_type(&self) -> ModelType {
        self.model_type
    }

    fn predict(&self, input: &ModelInput) -> Result<Prediction> {
        let report = self.report.as_ref().ok_or_else(|| {
            PlanForgeError::Validation(format!("{} has not been trained", self.model_type))
        })?;
        let seq = input
            .as_sequence()?
            .iter()
            .map(|row| self.normalizer.transform(row))
            .collect::<Result<Vec<_>>>()?;
        let trace = self.lstm.forward(&seq);
        let y = self.head.forward(trace.hidden())[0];
        Ok(Prediction::Scalar {
            value: self.normalizer.invert_target(y),
            std: report.residual_std,
        })
    }

    fn train(&mut self, dataset: &Dataset, config: &TrainingConfig) -> Result<TrainingReport> {
        let raw = self.check_dataset(dataset)?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let (train_idx, val_idx) = split_indices(raw.len(), config.validation_split, &mut rng);

        let mut normalizer = Normalizer::fit(
            config.normalization,
            self.input_width,
            train_idx
                .iter()
                .flat_map(|&i| raw[i].0.iter().map(Vec::as_slice)),
        )?;
        let targets: Vec<f64> = train_idx.iter().map(|&i| raw[i].1).collect();
        normalizer.fit_target(&targets)?;

        let data: Vec<Prepared> = raw
            .iter()
            .map(|&(seq, y)| {
                let rows = seq
                    .iter()
                    .map(|r| normalizer.transform(r))
                    .collect::<Result<Vec<_>>>()?;
                Ok((rows, normalizer.transform_target(y), y))
            })
            .collect::<Result<_>>()?;

        let mut net = Network::new(self.input_width, config.lstm_units, &mut rng);
        let mut lstm_grads = net.lstm.zero_grads();
        let mut head_grads = net.head.zero_grads();
        let mut adam = Adam::new(config.learning_rate);
        let mut stopping = EarlyStopping::new(config);
        let mut best = net.clone();
        let mut epochs_run = 0;
        let mut stopped_early = false;
        let mut train_loss = f64::NAN;

        for epoch in 1..=config.epochs {
            epochs_run = epoch;
            for batch in batches(&train_idx, config.batch_size, &mut rng) {
                lstm_grads.clear();
                head_grads.clear();
                for &i in &batch {
                    let (seq, y, _) = &data[i];
                    let trace = net.lstm.forward(seq);
                    let pred = net.head.forward(trace.hidden())[0];
                    let d_hidden = net.head.backward(trace.hidden(), &[pred - y], &mut head_grads);
                    net.lstm.backward(&trace, &d_hidden, &mut lstm_grads);
                }
                let scale = 1.0 / batch.len() as f64;
                let mut views: Vec<&mut [f64]> = lstm_grads
                    .tensors_mut()
                    .into_iter()
                    .chain(head_grads.tensors_mut())
                    .collect();
                views.iter_mut().for_each(|v| v.iter_mut().for_each(|g| *g *= scale));
                clip_global_norm(&mut views, CLIP_NORM);

                adam.begin_step();
                let [w, u, b] = net.lstm.params_mut();
                adam.update(0, w, &lstm_grads.w);
                adam.update(1, u, &lstm_grads.u);
                adam.update(2, b, &lstm_grads.b);
                let [hw, hb] = net.head.params_mut();
                adam.update(3, hw, &head_grads.weights);
                adam.update(4, hb, &head_grads.bias);
            }

            let (loss, _) = evaluate(&net, &normalizer, &data, &train_idx);
            let (val_loss, _) = evaluate(&net, &normalizer, &data, &val_idx);
            if !loss.is_finite() || !val_loss.is_finite() {
                return Err(PlanForgeError::Training(format!(
                    "{} diverged at epoch {epoch}",
                    self.model_type
                )));
            }
            train_loss = loss;
            trace!(model = %self.model_type, epoch, loss, val_loss);

            match stopping.observe(epoch, val_loss) {
                Verdict::Improved => best = net.clone(),
                Verdict::Continue => {}
                Verdict::Stop => {
                    stopped_early = true;
                    break;
                }
            }
        }

        let (validation_loss, residuals) = evaluate(&best, &normalizer, &data, &val_idx);
        let residual_std = rms(&residuals);
        let accuracy = (1.0 - residual_std / normalizer.target_scale()).clamp(0.0, 1.0);
        let report = TrainingReport {
            epochs_run,
            best_epoch: stopping.best_epoch(),
            train_loss,
            validation_loss,
            accuracy,
            residual_std,
            sample_count: dataset.len(),
            stopped_early,
        };

        self.lstm = best.lstm;
        self.head = best.head;
        self.normalizer = normalizer;
        self.report = Some(report.clone());
        Ok(report)
    }
}
