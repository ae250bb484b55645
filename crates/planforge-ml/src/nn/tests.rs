//! Gradient checks for the building blocks.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::*;

#[test]
fn test_softmax_sums_to_one() {
    let probs = softmax(&[1.0, 2.0, 3.0, 1000.0]);
    assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    assert!(probs[3] > 0.99);
}

#[test]
fn test_dense_gradient_matches_finite_difference() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut layer = Dense::new(3, 2, &mut rng);
    let x = [0.5, -1.0, 2.0];
    // L = sum(y)
    let mut grads = layer.zero_grads();
    let grad_in = layer.backward(&x, &[1.0, 1.0], &mut grads);

    let eps = 1e-6;
    let loss = |l: &Dense, x: &[f64]| l.forward(x).iter().sum::<f64>();
    for i in 0..3 {
        let mut xp = x;
        xp[i] += eps;
        let numeric = (loss(&layer, &xp) - loss(&layer, &x)) / eps;
        assert!((numeric - grad_in[i]).abs() < 1e-4);
    }

    let base = loss(&layer, &x);
    let [weights, _] = layer.params_mut();
    weights[1] += eps;
    let numeric = (loss(&layer, &x) - base) / eps;
    assert!((numeric - grads.weights[1]).abs() < 1e-4);
}

#[test]
fn test_lstm_gradient_matches_finite_difference() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut lstm = Lstm::new(2, 3, &mut rng);
    let seq = vec![vec![0.1, -0.4], vec![0.7, 0.2], vec![-0.3, 0.5]];
    let loss = |l: &Lstm| l.forward(&seq).hidden().iter().sum::<f64>();

    let trace = lstm.forward(&seq);
    let mut grads = lstm.zero_grads();
    lstm.backward(&trace, &[1.0; 3], &mut grads);

    let eps = 1e-6;
    let base = loss(&lstm);
    for (tensor, idx) in [(0usize, 3usize), (1, 5), (2, 4)] {
        let analytic = match tensor {
            0 => grads.w[idx],
            1 => grads.u[idx],
            _ => grads.b[idx],
        };
        lstm.params_mut()[tensor][idx] += eps;
        let numeric = (loss(&lstm) - base) / eps;
        lstm.params_mut()[tensor][idx] -= eps;
        assert!(
            (numeric - analytic).abs() < 1e-4,
            "tensor {tensor}[{idx}]: numeric {numeric} vs analytic {analytic}"
        );
    }
}

#[test]
fn test_adam_moves_towards_minimum() {
    let mut adam = Adam::new(0.1);
    let mut x = [5.0];
    for _ in 0..200 {
        adam.begin_step();
        let grad = [2.0 * x[0]];
        adam.update(0, &mut x, &grad);
    }
    assert!(x[0].abs() < 0.5, "{}", x[0]);
}

#[test]
fn test_clip_global_norm() {
    let mut a = vec![3.0];
    let mut b = vec![4.0];
    clip_global_norm(&mut [&mut a, &mut b], 1.0);
    assert!((a[0] - 0.6).abs() < 1e-12);
    assert!((b[0] - 0.8).abs() < 1e-12);
}
