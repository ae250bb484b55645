//! Activation functions.

pub fn relu(x: f64) -> f64 {
    x.max(0.0)
}

/// Derivative of ReLU given its output.
pub fn relu_grad(y: f64) -> f64 {
    if y > 0.0 {
        1.0
    } else {
        0.0
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax (max subtraction).
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exp.into_iter().map(|e| e / sum).collect()
    } else {
        vec![1.0 / logits.len().max(1) as f64; logits.len()]
    }
}
