//! Adam optimiser over ndarray tensors

use ndarray::{Array, Dimension, Zip};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;

/// Step counter and learning rate. Moment buffers live with the caller so
/// they can mirror the parameter layout.
#[derive(Debug, Clone)]
pub(crate) struct Adam {
    learning_rate: f64,
    t: i32,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate, t: 0 }
    }

    /// Advance the step counter; the returned step carries bias corrections
    pub fn next_step(&mut self) -> AdamStep {
        self.t += 1;
        AdamStep {
            learning_rate: self.learning_rate,
            bc1: 1.0 - BETA1.powi(self.t),
            bc2: 1.0 - BETA2.powi(self.t),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AdamStep {
    learning_rate: f64,
    bc1: f64,
    bc2: f64,
}

impl AdamStep {
    pub fn update<D: Dimension>(
        &self,
        param: &mut Array<f64, D>,
        grad: &Array<f64, D>,
        m: &mut Array<f64, D>,
        v: &mut Array<f64, D>,
    ) {
        Zip::from(param).and(grad).and(m).and(v).for_each(|p, &g, m, v| {
            *m = BETA1 * *m + (1.0 - BETA1) * g;
            *v = BETA2 * *v + (1.0 - BETA2) * g * g;
            let m_hat = *m / self.bc1;
            let v_hat = *v / self.bc2;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut adam = Adam::new(0.1);
        let mut p = array![1.0, -1.0];
        let g = array![0.5, -2.0];
        let mut m = array![0.0, 0.0];
        let mut v = array![0.0, 0.0];

        adam.next_step().update(&mut p, &g, &mut m, &mut v);
        // bias-corrected first step is lr * sign(g)
        assert!((p[0] - 0.9).abs() < 1e-6);
        assert!((p[1] + 0.9).abs() < 1e-6);
    }
}
