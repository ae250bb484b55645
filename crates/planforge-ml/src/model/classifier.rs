//! Dense feed-forward classifier: ReLU hidden layers, softmax output.

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
use crate::nn::{clip_global_norm, relu, relu_grad, softmax, Adam, Dense, DenseGrads};

const CLIP_NORM: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedForwardClassifier {
    model_type: ModelType,
    input_width: usize,
    classes: usize,
    layers: Vec<Dense>,
    normalizer: Normalizer,
    report: Option<TrainingReport>,
}

fn build_layers(input: usize, hidden: &[usize], classes: usize, rng: &mut ChaCha8Rng) -> Vec<Dense> {
    let mut widths = Vec::with_capacity(hidden.len() + 2);
    widths.push(input);
    widths.extend_from_slice(hidden);
    widths.push(classes);
    widths
        .windows(2)
        .map(|w| Dense::new(w[0], w[1], rng))
        .collect()
}

/// Activations of every layer; `[0]` is the input, last are the logits.
fn forward_all(layers: &[Dense], x: &[f64]) -> Vec<Vec<f64>> {
    let mut acts = Vec::with_capacity(layers.len() + 1);
    acts.push(x.to_vec());
    for (l, layer) in layers.iter().enumerate() {
        let mut out = layer.forward(&acts[l]);
        if l + 1 < layers.len() {
            out.iter_mut().for_each(|v| *v = relu(*v));
        }
        acts.push(out);
    }
    acts
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
        .0
}

impl FeedForwardClassifier {
    /// Creates an untrained classifier.
    pub fn new(
        model_type: ModelType,
        input_width: usize,
        classes: usize,
        config: &TrainingConfig,
    ) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            model_type,
            input_width,
            classes,
            layers: build_layers(input_width, &config.hidden_units, classes, &mut rng),
            normalizer: Normalizer::identity(input_width),
            report: None,
        }
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn report(&self) -> Option<&TrainingReport> {
        self.report.as_ref()
    }

    fn check_dataset<'a>(&self, dataset: &'a Dataset) -> Result<Vec<(&'a [f64], usize)>> {
        require_samples(dataset)?;
        dataset
            .samples()
            .iter()
            .map(|s| {
                let x = s.input.as_vector()?;
                ensure_width("classifier sample", x, self.input_width)?;
                match s.target {
                    Target::Class(c) if c < self.classes => Ok((x, c)),
                    Target::Class(c) => Err(PlanForgeError::Validation(format!(
                        "class {c} out of range for {} classes",
                        self.classes
                    ))),
                    Target::Value(_) => Err(PlanForgeError::validation(
                        "classifier samples need class targets",
                    )),
                }
            })
            .collect()
    }
}

/// Mean cross-entropy and accuracy over `indices`.
fn evaluate(layers: &[Dense], data: &[(Vec<f64>, usize)], indices: &[usize]) -> (f64, f64) {
    let mut loss = 0.0;
    let mut correct = 0usize;
    for &i in indices {
        let (x, y) = &data[i];
        let acts = forward_all(layers, x);
        let probs = softmax(&acts[acts.len() - 1]);
        loss -= probs[*y].max(1e-12).ln();
        if argmax(&probs) == *y {
            correct += 1;
        }
    }
    let n = indices.len().max(1) as f64;
    (loss / n, correct as f64 / n)
}

impl Model for FeedForwardClassifier {
    fn model_type(&self) -> ModelType {
        self.model_type
    }

    fn predict(&self, input: &ModelInput) -> Result<Prediction> {
        if self.report.is_none() {
            return Err(PlanForgeError::Validation(format!(
                "{} has not been trained",
                self.model_type
            )));
        }
        let x = self.normalizer.transform(input.as_vector()?)?;
        let acts = forward_all(&self.layers, &x);
        let probabilities = softmax(&acts[acts.len() - 1]);
        let index = argmax(&probabilities);
        Ok(Prediction::Class {
            index,
            confidence: probabilities[index],
            probabilities,
        })
    }

    fn train(&mut self, dataset: &Dataset, config: &TrainingConfig) -> Result<TrainingReport> {
        let raw = self.check_dataset(dataset)?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let (train_idx, val_idx) = split_indices(raw.len(), config.validation_split, &mut rng);

        let normalizer = Normalizer::fit(
            config.normalization,
            self.input_width,
            train_idx.iter().map(|&i| raw[i].0),
        )?;
        let data: Vec<(Vec<f64>, usize)> = raw
            .iter()
            .map(|&(x, y)| Ok((normalizer.transform(x)?, y)))
            .collect::<Result<_>>()?;

        let mut layers = build_layers(self.input_width, &config.hidden_units, self.classes, &mut rng);
        let mut grads: Vec<DenseGrads> = layers.iter().map(Dense::zero_grads).collect();
        let mut adam = Adam::new(config.learning_rate);
        let mut stopping = EarlyStopping::new(config);
        let mut best_layers = layers.clone();
        let mut epochs_run = 0;
        let mut stopped_early = false;
        let mut train_loss = f64::NAN;

        for epoch in 1..=config.epochs {
            epochs_run = epoch;
            for batch in batches(&train_idx, config.batch_size, &mut rng) {
                grads.iter_mut().for_each(DenseGrads::clear);
                for &i in &batch {
                    let (x, y) = &data[i];
                    let acts = forward_all(&layers, x);
                    let mut delta = softmax(&acts[acts.len() - 1]);
                    delta[*y] -= 1.0;
                    for l in (0..layers.len()).rev() {
                        let grad_in = layers[l].backward(&acts[l], &delta, &mut grads[l]);
                        if l > 0 {
                            delta = grad_in
                                .iter()
                                .zip(&acts[l])
                                .map(|(g, a)| g * relu_grad(*a))
                                .collect();
                        }
                    }
                }
                let scale = 1.0 / batch.len() as f64;
                let mut views: Vec<&mut [f64]> = grads
                    .iter_mut()
                    .flat_map(|g| g.tensors_mut())
                    .collect();
                views.iter_mut().for_each(|v| v.iter_mut().for_each(|g| *g *= scale));
                clip_global_norm(&mut views, CLIP_NORM);

                adam.begin_step();
                for (l, layer) in layers.iter_mut().enumerate() {
                    let [w, b] = layer.params_mut();
                    adam.update(2 * l, w, &grads[l].weights);
                    adam.update(2 * l + 1, b, &grads[l].bias);
                }
            }

            let (loss, _) = evaluate(&layers, &data, &train_idx);
            let (val_loss, val_acc) = evaluate(&layers, &data, &val_idx);
            if !loss.is_finite() || !val_loss.is_finite() {
                return Err(PlanForgeError::Training(format!(
                    "{} diverged at epoch {epoch}",
                    self.model_type
                )));
            }
            train_loss = loss;
            trace!(model = %self.model_type, epoch, loss, val_loss, val_acc);

            match stopping.observe(epoch, val_loss) {
                Verdict::Improved => best_layers = layers.clone(),
                Verdict::Continue => {}
                Verdict::Stop => {
                    stopped_early = true;
                    break;
                }
            }
        }

        let (validation_loss, accuracy) = evaluate(&best_layers, &data, &val_idx);
        let report = TrainingReport {
            epochs_run,
            best_epoch: stopping.best_epoch(),
            train_loss,
            validation_loss,
            accuracy,
            residual_std: 0.0,
            sample_count: dataset.len(),
            stopped_early,
        };

        self.layers = best_layers;
        self.normalizer = normalizer;
        self.report = Some(report.clone());
        Ok(report)
    }
}
