//! Minimal dense and recurrent building blocks.
//!
//! Matrices are flat row-major `Vec<f64>` buffers. Every layer keeps its
//! gradients in a separate `*Grads` struct so parameters stay immutable
//! during a forward/backward pass and are only touched by the optimizer.

mod activation;
mod adam;
mod dense;
mod lstm;

pub use activation::{relu, relu_grad, sigmoid, softmax};
pub use adam::Adam;
pub use dense::{Dense, DenseGrads};
pub use lstm::{Lstm, LstmGrads, LstmTrace};

use rand::Rng;

/// Xavier-uniform initialization for an `out × in` matrix.
pub(crate) fn xavier<R: Rng>(rng: &mut R, fan_in: usize, fan_out: usize) -> Vec<f64> {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    (0..fan_in * fan_out)
        .map(|_| rng.random_range(-limit..limit))
        .collect()
}

/// Scales `grads` in place so their joint L2 norm is at most `max_norm`.
pub(crate) fn clip_global_norm(grads: &mut [&mut [f64]], max_norm: f64) {
    let norm = grads
        .iter()
        .flat_map(|g| g.iter())
        .map(|v| v * v)
        .sum::<f64>()
        .sqrt();
    if norm > max_norm && norm.is_finite() {
        let factor = max_norm / norm;
        for g in grads.iter_mut() {
            g.iter_mut().for_each(|v| *v *= factor);
        }
    }
}

#[cfg(test)]
mod tests;
