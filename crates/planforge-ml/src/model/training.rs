//! Shared training loop pieces: splitting, batching and early stopping.

use planforge_config::TrainingConfig;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs_run: usize,
    /// Epoch whose weights were kept (1-based).
    pub best_epoch: usize,
    pub train_loss: f64,
    pub validation_loss: f64,
    /// Validation accuracy (classifiers) or 1 − normalized RMSE (regressors).
    pub accuracy: f64,
    /// Validation residual std in target units; 0 for classifiers.
    pub residual_std: f64,
    pub sample_count: usize,
    pub stopped_early: bool,
}

/// Shuffles sample indices and holds out a validation tail.
///
/// With a positive split at least one sample is held out and at least one
/// kept; with split 0 the training set doubles as validation set.
pub(crate) fn split_indices<R: Rng>(
    n: usize,
    validation_split: f64,
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(rng);
    if validation_split <= 0.0 || n < 2 {
        return (idx.clone(), idx);
    }
    let val = ((n as f64 * validation_split).round() as usize).clamp(1, n - 1);
    let train = idx.split_off(val);
    (train, idx)
}

/// Iterates shuffled mini-batches of `indices`.
pub(crate) fn batches<R: Rng>(indices: &[usize], batch_size: usize, rng: &mut R) -> Vec<Vec<usize>> {
    let mut order = indices.to_vec();
    order.shuffle(rng);
    order
        .chunks(batch_size.max(1))
        .map(<[usize]>::to_vec)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Improved,
    Continue,
    Stop,
}

/// Stops when validation loss fails to improve by `min_delta` for
/// `patience` consecutive epochs.
#[derive(Debug, Clone)]
pub(crate) struct EarlyStopping {
    patience: usize,
    min_delta: f64,
    best: f64,
    best_epoch: usize,
    wait: usize,
}

impl EarlyStopping {
    pub(crate) fn new(config: &TrainingConfig) -> Self {
        Self {
            patience: config.patience,
            min_delta: config.min_delta,
            best: f64::INFINITY,
            best_epoch: 0,
            wait: 0,
        }
    }

    pub(crate) fn observe(&mut self, epoch: usize, loss: f64) -> Verdict {
        if loss < self.best - self.min_delta {
            self.best = loss;
            self.best_epoch = epoch;
            self.wait = 0;
            return Verdict::Improved;
        }
        self.wait += 1;
        if self.patience > 0 && self.wait >= self.patience {
            Verdict::Stop
        } else {
            Verdict::Continue
        }
    }

    pub(crate) fn best(&self) -> f64 {
        self.best
    }

    pub(crate) fn best_epoch(&self) -> usize {
        self.best_epoch
    }
}
