//! Adam optimizer.

#[derive(Debug, Clone, Default)]
struct Moments {
    m: Vec<f64>,
    v: Vec<f64>,
}

/// Adam with per-tensor moment slots.
///
/// Call [`Adam::begin_step`] once per batch, then [`Adam::update`] for each
/// parameter tensor with a stable slot index.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: i32,
    slots: Vec<Moments>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            slots: Vec::new(),
        }
    }

    pub fn begin_step(&mut self) {
        self.t = self.t.saturating_add(1);
    }

    pub fn update(&mut self, slot: usize, params: &mut [f64], grads: &[f64]) {
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, Moments::default);
        }
        let moments = &mut self.slots[slot];
        if moments.m.len() != params.len() {
            moments.m = vec![0.0; params.len()];
            moments.v = vec![0.0; params.len()];
        }
        let t = self.t.max(1);
        let bias1 = 1.0 - self.beta1.powi(t);
        let bias2 = 1.0 - self.beta2.powi(t);
        for i in 0..params.len() {
            let g = grads[i];
            moments.m[i] = self.beta1 * moments.m[i] + (1.0 - self.beta1) * g;
            moments.v[i] = self.beta2 * moments.v[i] + (1.0 - self.beta2) * g * g;
            let m_hat = moments.m[i] / bias1;
            let v_hat = moments.v[i] / bias2;
            params[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}
