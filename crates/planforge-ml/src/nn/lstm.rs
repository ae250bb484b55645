//! Single-layer LSTM with backpropagation through time.
//!
//! Gate blocks are laid out `[input, forget, cell, output]`, each
//! `hidden_size` rows.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{sigmoid, xavier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lstm {
    input_size: usize,
    hidden_size: usize,
    /// `[4H, D]` input weights.
    w: Vec<f64>,
    /// `[4H, H]` recurrent weights.
    u: Vec<f64>,
    /// `[4H]` biases.
    b: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct LstmGrads {
    pub w: Vec<f64>,
    pub u: Vec<f64>,
    pub b: Vec<f64>,
}

impl LstmGrads {
    pub fn clear(&mut self) {
        for buf in [&mut self.w, &mut self.u, &mut self.b] {
            buf.iter_mut().for_each(|g| *g = 0.0);
        }
    }

    pub fn tensors_mut(&mut self) -> [&mut [f64]; 3] {
        [&mut self.w, &mut self.u, &mut self.b]
    }
}

#[derive(Debug, Clone)]
struct Step {
    x: Vec<f64>,
    h_prev: Vec<f64>,
    c_prev: Vec<f64>,
    /// Activated gates `[i, f, g, o]`.
    gates: Vec<f64>,
    tanh_c: Vec<f64>,
}

/// Forward-pass cache needed for the backward pass.
#[derive(Debug, Clone)]
pub struct LstmTrace {
    steps: Vec<Step>,
    hidden: Vec<f64>,
}

impl LstmTrace {
    /// Final hidden state.
    pub fn hidden(&self) -> &[f64] {
        &self.hidden
    }
}

impl Lstm {
    pub fn new<R: Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let mut b = vec![0.0; 4 * hidden_size];
        // Forget gate starts open.
        b[hidden_size..2 * hidden_size]
            .iter_mut()
            .for_each(|v| *v = 1.0);
        Self {
            input_size,
            hidden_size,
            w: xavier(rng, input_size, 4 * hidden_size),
            u: xavier(rng, hidden_size, 4 * hidden_size),
            b,
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn zero_grads(&self) -> LstmGrads {
        LstmGrads {
            w: vec![0.0; self.w.len()],
            u: vec![0.0; self.u.len()],
            b: vec![0.0; self.b.len()],
        }
    }

    pub fn forward(&self, sequence: &[Vec<f64>]) -> LstmTrace {
        let (d, h) = (self.input_size, self.hidden_size);
        let mut h_t = vec![0.0; h];
        let mut c_t = vec![0.0; h];
        let mut steps = Vec::with_capacity(sequence.len());

        for x in sequence {
            debug_assert_eq!(x.len(), d);
            let mut z = self.b.clone();
            for (r, zr) in z.iter_mut().enumerate() {
                let wr = &self.w[r * d..(r + 1) * d];
                let ur = &self.u[r * h..(r + 1) * h];
                *zr += wr.iter().zip(x).map(|(a, b)| a * b).sum::<f64>()
                    + ur.iter().zip(&h_t).map(|(a, b)| a * b).sum::<f64>();
            }
            let mut gates = z;
            for (k, g) in gates.iter_mut().enumerate() {
                *g = if (2 * h..3 * h).contains(&k) {
                    g.tanh()
                } else {
                    sigmoid(*g)
                };
            }
            let mut c_next = vec![0.0; h];
            let mut tanh_c = vec![0.0; h];
            let mut h_next = vec![0.0; h];
            for j in 0..h {
                let (i, f, g, o) = (gates[j], gates[h + j], gates[2 * h + j], gates[3 * h + j]);
                c_next[j] = f * c_t[j] + i * g;
                tanh_c[j] = c_next[j].tanh();
                h_next[j] = o * tanh_c[j];
            }
            steps.push(Step {
                x: x.clone(),
                h_prev: std::mem::replace(&mut h_t, h_next),
                c_prev: std::mem::replace(&mut c_t, c_next),
                gates,
                tanh_c,
            });
        }

        LstmTrace {
            steps,
            hidden: h_t,
        }
    }

    /// Backpropagates `d_hidden` (gradient w.r.t. the final hidden state)
    /// through every step, accumulating into `grads`.
    pub fn backward(&self, trace: &LstmTrace, d_hidden: &[f64], grads: &mut LstmGrads) {
        let (d, h) = (self.input_size, self.hidden_size);
        let mut dh = d_hidden.to_vec();
        let mut dc = vec![0.0; h];
        let mut dz = vec![0.0; 4 * h];

        for step in trace.steps.iter().rev() {
            let gates = &step.gates;
            for j in 0..h {
                let (i, f, g, o) = (gates[j], gates[h + j], gates[2 * h + j], gates[3 * h + j]);
                let tc = step.tanh_c[j];
                let d_o = dh[j] * tc;
                let d_c = dc[j] + dh[j] * o * (1.0 - tc * tc);
                let d_i = d_c * g;
                let d_g = d_c * i;
                let d_f = d_c * step.c_prev[j];
                dc[j] = d_c * f;

                dz[j] = d_i * i * (1.0 - i);
                dz[h + j] = d_f * f * (1.0 - f);
                dz[2 * h + j] = d_g * (1.0 - g * g);
                dz[3 * h + j] = d_o * o * (1.0 - o);
            }

            let mut dh_prev = vec![0.0; h];
            for (r, &dzr) in dz.iter().enumerate() {
                if dzr == 0.0 {
                    continue;
                }
                grads.b[r] += dzr;
                let wrow = r * d;
                for k in 0..d {
                    grads.w[wrow + k] += dzr * step.x[k];
                }
                let urow = r * h;
                for k in 0..h {
                    grads.u[urow + k] += dzr * step.h_prev[k];
                    dh_prev[k] += dzr * self.u[urow + k];
                }
            }
            dh = dh_prev;
        }
    }

    pub(crate) fn params_mut(&mut self) -> [&mut [f64]; 3] {
        [&mut self.w, &mut self.u, &mut self.b]
    }
}
