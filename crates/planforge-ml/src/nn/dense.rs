//! Fully connected layer: `y = W x + b`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::xavier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    /// Row-major `[out_features, in_features]`.
    weights: Vec<f64>,
    bias: Vec<f64>,
    in_features: usize,
    out_features: usize,
}

/// Accumulated gradients of a [`Dense`] layer.
#[derive(Debug, Clone)]
pub struct DenseGrads {
    pub weights: Vec<f64>,
    pub bias: Vec<f64>,
}

impl DenseGrads {
    pub fn clear(&mut self) {
        self.weights.iter_mut().for_each(|g| *g = 0.0);
        self.bias.iter_mut().for_each(|g| *g = 0.0);
    }

    pub fn tensors_mut(&mut self) -> [&mut [f64]; 2] {
        [&mut self.weights, &mut self.bias]
    }
}

impl Dense {
    pub fn new<R: Rng>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        Self {
            weights: xavier(rng, in_features, out_features),
            bias: vec![0.0; out_features],
            in_features,
            out_features,
        }
    }

    #[inline]
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    #[inline]
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn zero_grads(&self) -> DenseGrads {
        DenseGrads {
            weights: vec![0.0; self.weights.len()],
            bias: vec![0.0; self.bias.len()],
        }
    }

    pub fn forward(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.in_features);
        (0..self.out_features)
            .map(|o| {
                let row = &self.weights[o * self.in_features..(o + 1) * self.in_features];
                row.iter().zip(x).map(|(w, xi)| w * xi).sum::<f64>() + self.bias[o]
            })
            .collect()
    }

    /// Accumulates parameter gradients and returns `dL/dx`.
    pub fn backward(&self, x: &[f64], grad_out: &[f64], grads: &mut DenseGrads) -> Vec<f64> {
        let mut grad_in = vec![0.0; self.in_features];
        for (o, &go) in grad_out.iter().enumerate() {
            if go == 0.0 {
                continue;
            }
            grads.bias[o] += go;
            let base = o * self.in_features;
            for i in 0..self.in_features {
                grads.weights[base + i] += go * x[i];
                grad_in[i] += go * self.weights[base + i];
            }
        }
        grad_in
    }

    pub(crate) fn params_mut(&mut self) -> [&mut [f64]; 2] {
        [&mut self.weights, &mut self.bias]
    }
}
