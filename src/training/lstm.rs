//! LSTM regressor
//!
//! A single recurrent layer encodes the lookback window; its last hidden
//! state feeds a dense ReLU layer and a linear output unit. Training is
//! full backpropagation through time with Adam on mini-batch MSE. Batches
//! are taken in temporal order; within a batch, per-sample gradients are
//! computed in parallel and summed.

use super::optimizer::{Adam, AdamStep};
use super::{check_features, check_training_set, ForecastModel, TrainingSummary};
use crate::error::{LoadcastError, Result, Stage};
use crate::timeseries::WindowSet;
use crate::utils::Timer;
use ndarray::linalg::general_mat_mul;
use ndarray::{s, Array, Array1, Array2, ArrayView1, ArrayView2, ArrayView3, Axis, Dimension};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// LSTM hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LstmConfig {
    /// Recurrent state width
    pub hidden_size: usize,
    /// Width of the ReLU projection
    pub dense_size: usize,
    pub learning_rate: f64,
    /// Passes over the training windows
    pub epochs: usize,
    pub batch_size: usize,
    /// Global L2 norm the batch gradient is clipped to
    pub clip_norm: f64,
    pub seed: u64,
}

impl Default for LstmConfig {
    fn default() -> Self {
        Self {
            hidden_size: 64,
            dense_size: 32,
            learning_rate: 0.001,
            epochs: 10,
            batch_size: 64,
            clip_norm: 1.0,
            seed: 42,
        }
    }
}

impl LstmConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_sizes(mut self, hidden_size: usize, dense_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self.dense_size = dense_size;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("hidden_size", self.hidden_size),
            ("dense_size", self.dense_size),
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(LoadcastError::ConfigError(format!("lstm {} must be positive", name)));
            }
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(LoadcastError::ConfigError(format!(
                "lstm learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.clip_norm.is_finite() && self.clip_norm > 0.0) {
            return Err(LoadcastError::ConfigError(format!(
                "lstm clip_norm must be positive, got {}",
                self.clip_norm
            )));
        }
        Ok(())
    }
}

/// Trainable tensors. Gradients and Adam moments reuse the same layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LstmParams {
    /// Input weights, gates stacked as [input, forget, cell, output]: (4H, F)
    w_x: Array2<f64>,
    /// Recurrent weights: (4H, H)
    w_h: Array2<f64>,
    b: Array1<f64>,
    /// (D, H)
    w_dense: Array2<f64>,
    b_dense: Array1<f64>,
    w_out: Array1<f64>,
    b_out: Array1<f64>,
}

/// Cached activations of one time step
struct Step {
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    c: Array1<f64>,
    tanh_c: Array1<f64>,
}

struct Forward {
    steps: Vec<Step>,
    h_last: Array1<f64>,
    dense_pre: Array1<f64>,
    dense: Array1<f64>,
    output: f64,
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

fn uniform<R: Rng>(rng: &mut R, shape: (usize, usize), limit: f64) -> Array2<f64> {
    Array2::from_shape_fn(shape, |_| rng.gen::<f64>() * 2.0 * limit - limit)
}

fn sum_sq<D: Dimension>(a: &Array<f64, D>) -> f64 {
    a.iter().map(|v| v * v).sum()
}

/// `target += left ⊗ right`
fn outer_add(target: &mut Array2<f64>, left: ArrayView1<'_, f64>, right: ArrayView1<'_, f64>) {
    general_mat_mul(1.0, &left.insert_axis(Axis(1)), &right.insert_axis(Axis(0)), 1.0, target);
}

impl LstmParams {
    fn init<R: Rng>(n_features: usize, hidden: usize, dense: usize, rng: &mut R) -> Self {
        let recurrent_limit = 1.0 / (hidden as f64).sqrt();
        let dense_limit = (2.0 / (hidden + dense) as f64).sqrt();
        let out_limit = (2.0 / (dense + 1) as f64).sqrt();

        let mut b = Array1::zeros(4 * hidden);
        b.slice_mut(s![hidden..2 * hidden]).fill(1.0);

        Self {
            w_x: uniform(rng, (4 * hidden, n_features), recurrent_limit),
            w_h: uniform(rng, (4 * hidden, hidden), recurrent_limit),
            b,
            w_dense: uniform(rng, (dense, hidden), dense_limit),
            b_dense: Array1::zeros(dense),
            w_out: uniform(rng, (1, dense), out_limit).index_axis_move(Axis(0), 0),
            b_out: Array1::zeros(1),
        }
    }

    fn zeros_like(&self) -> Self {
        Self {
            w_x: Array2::zeros(self.w_x.raw_dim()),
            w_h: Array2::zeros(self.w_h.raw_dim()),
            b: Array1::zeros(self.b.len()),
            w_dense: Array2::zeros(self.w_dense.raw_dim()),
            b_dense: Array1::zeros(self.b_dense.len()),
            w_out: Array1::zeros(self.w_out.len()),
            b_out: Array1::zeros(1),
        }
    }

    fn hidden_size(&self) -> usize {
        self.w_h.ncols()
    }

    fn add_assign(&mut self, other: &Self) {
        self.w_x += &other.w_x;
        self.w_h += &other.w_h;
        self.b += &other.b;
        self.w_dense += &other.w_dense;
        self.b_dense += &other.b_dense;
        self.w_out += &other.w_out;
        self.b_out += &other.b_out;
    }

    fn scale(&mut self, factor: f64) {
        self.w_x *= factor;
        self.w_h *= factor;
        self.b *= factor;
        self.w_dense *= factor;
        self.b_dense *= factor;
        self.w_out *= factor;
        self.b_out *= factor;
    }

    fn norm(&self) -> f64 {
        (sum_sq(&self.w_x)
            + sum_sq(&self.w_h)
            + sum_sq(&self.b)
            + sum_sq(&self.w_dense)
            + sum_sq(&self.b_dense)
            + sum_sq(&self.w_out)
            + sum_sq(&self.b_out))
        .sqrt()
    }

    fn apply(&mut self, step: AdamStep, grads: &Self, m: &mut Self, v: &mut Self) {
        step.update(&mut self.w_x, &grads.w_x, &mut m.w_x, &mut v.w_x);
        step.update(&mut self.w_h, &grads.w_h, &mut m.w_h, &mut v.w_h);
        step.update(&mut self.b, &grads.b, &mut m.b, &mut v.b);
        step.update(&mut self.w_dense, &grads.w_dense, &mut m.w_dense, &mut v.w_dense);
        step.update(&mut self.b_dense, &grads.b_dense, &mut m.b_dense, &mut v.b_dense);
        step.update(&mut self.w_out, &grads.w_out, &mut m.w_out, &mut v.w_out);
        step.update(&mut self.b_out, &grads.b_out, &mut m.b_out, &mut v.b_out);
    }

    fn step(&self, x_t: ArrayView1<'_, f64>, h_prev: Array1<f64>, c_prev: Array1<f64>) -> Step {
        let hs = self.hidden_size();
        let z = self.w_x.dot(&x_t) + self.w_h.dot(&h_prev) + &self.b;

        let i = z.slice(s![..hs]).mapv(sigmoid);
        let f = z.slice(s![hs..2 * hs]).mapv(sigmoid);
        let g = z.slice(s![2 * hs..3 * hs]).mapv(f64::tanh);
        let o = z.slice(s![3 * hs..]).mapv(sigmoid);
        let c = &f * &c_prev + &i * &g;
        let tanh_c = c.mapv(f64::tanh);

        Step {
            h_prev,
            c_prev,
            i,
            f,
            g,
            o,
            c,
            tanh_c,
        }
    }

    fn forward(&self, x: ArrayView2<'_, f64>) -> Forward {
        let hs = self.hidden_size();
        let mut h = Array1::zeros(hs);
        let mut c = Array1::zeros(hs);
        let mut steps = Vec::with_capacity(x.nrows());

        for x_t in x.rows() {
            let step = self.step(x_t, h, c);
            h = &step.o * &step.tanh_c;
            c = step.c.clone();
            steps.push(step);
        }

        let dense_pre = self.w_dense.dot(&h) + &self.b_dense;
        let dense = dense_pre.mapv(|v| v.max(0.0));
        let output = self.w_out.dot(&dense) + self.b_out[0];

        Forward {
            steps,
            h_last: h,
            dense_pre,
            dense,
            output,
        }
    }

    /// Gradients of a loss whose derivative w.r.t. the output is `d_output`
    fn backward(&self, x: ArrayView2<'_, f64>, fwd: &Forward, d_output: f64) -> Self {
        let hs = self.hidden_size();
        let mut grads = self.zeros_like();

        grads.w_out = &fwd.dense * d_output;
        grads.b_out[0] = d_output;

        let d_dense_pre: Array1<f64> = self
            .w_out
            .iter()
            .zip(fwd.dense_pre.iter())
            .map(|(&w, &z)| if z > 0.0 { w * d_output } else { 0.0 })
            .collect();
        outer_add(&mut grads.w_dense, d_dense_pre.view(), fwd.h_last.view());
        grads.b_dense.assign(&d_dense_pre);

        let mut dh = self.w_dense.t().dot(&d_dense_pre);
        let mut dc = Array1::<f64>::zeros(hs);
        let mut dz = Array1::<f64>::zeros(4 * hs);

        for (t, step) in fwd.steps.iter().enumerate().rev() {
            for k in 0..hs {
                let d_o = dh[k] * step.tanh_c[k];
                let dc_k = dc[k] + dh[k] * step.o[k] * (1.0 - step.tanh_c[k].powi(2));
                let d_i = dc_k * step.g[k];
                let d_g = dc_k * step.i[k];
                let d_f = dc_k * step.c_prev[k];

                dz[k] = d_i * step.i[k] * (1.0 - step.i[k]);
                dz[hs + k] = d_f * step.f[k] * (1.0 - step.f[k]);
                dz[2 * hs + k] = d_g * (1.0 - step.g[k].powi(2));
                dz[3 * hs + k] = d_o * step.o[k] * (1.0 - step.o[k]);
                dc[k] = dc_k * step.f[k];
            }
            outer_add(&mut grads.w_x, dz.view(), x.row(t));
            outer_add(&mut grads.w_h, dz.view(), step.h_prev.view());
            grads.b += &dz;
            dh = self.w_h.t().dot(&dz);
        }

        grads
    }
}

/// Recurrent sequence-to-scalar regressor
#[derive(Debug, Clone)]
pub struct LstmRegressor {
    config: LstmConfig,
    params: Option<LstmParams>,
    n_features: usize,
}

impl LstmRegressor {
    pub fn new(config: LstmConfig) -> Self {
        Self {
            config,
            params: None,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &LstmConfig {
        &self.config
    }

    /// Sum of per-sample gradients over `batch`, plus the summed squared error
    fn batch_gradient(
        params: &LstmParams,
        inputs: &ArrayView3<'_, f64>,
        targets: &ArrayView1<'_, f64>,
        batch: std::ops::Range<usize>,
    ) -> (LstmParams, f64) {
        let scale = 1.0 / batch.len() as f64;
        batch
            .into_par_iter()
            .map(|i| {
                let x = inputs.index_axis(Axis(0), i);
                let fwd = params.forward(x);
                let err = fwd.output - targets[i];
                (params.backward(x, &fwd, 2.0 * err * scale), err * err)
            })
            .reduce(
                || (params.zeros_like(), 0.0),
                |(mut acc, loss_a), (g, loss_b)| {
                    acc.add_assign(&g);
                    (acc, loss_a + loss_b)
                },
            )
    }
}

impl ForecastModel for LstmRegressor {
    fn fit(&mut self, windows: &WindowSet) -> Result<TrainingSummary> {
        check_training_set(windows)?;
        self.config.validate()?;
        let timer = Timer::start("lstm fit");

        let cfg = &self.config;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(cfg.seed);
        let mut params = LstmParams::init(windows.n_features(), cfg.hidden_size, cfg.dense_size, &mut rng);
        let mut m = params.zeros_like();
        let mut v = params.zeros_like();
        let mut adam = Adam::new(cfg.learning_rate);

        let inputs = windows.inputs();
        let targets = windows.targets();
        let n = windows.len();
        let mut loss_history = Vec::with_capacity(cfg.epochs);

        info!(
            samples = n,
            lookback = windows.lookback(),
            features = windows.n_features(),
            hidden = cfg.hidden_size,
            epochs = cfg.epochs,
            "Training LSTM"
        );

        for epoch in 0..cfg.epochs {
            let mut epoch_loss = 0.0;

            for start in (0..n).step_by(cfg.batch_size) {
                let end = (start + cfg.batch_size).min(n);
                let (mut grads, batch_loss) = Self::batch_gradient(&params, &inputs, &targets, start..end);

                let norm = grads.norm();
                if norm > cfg.clip_norm {
                    grads.scale(cfg.clip_norm / norm);
                }
                params.apply(adam.next_step(), &grads, &mut m, &mut v);
                epoch_loss += batch_loss;
            }

            let epoch_loss = epoch_loss / n as f64;
            if !epoch_loss.is_finite() {
                return Err(LoadcastError::TrainingError(format!(
                    "loss diverged at epoch {}",
                    epoch + 1
                )));
            }
            debug!(epoch = epoch + 1, loss = epoch_loss, "Epoch complete");
            loss_history.push(epoch_loss);
        }

        let final_loss = loss_history.last().copied().unwrap_or(f64::NAN);
        self.params = Some(params);
        self.n_features = windows.n_features();

        info!(final_loss, secs = timer.elapsed_secs(), "LSTM trained");
        Ok(TrainingSummary {
            model: self.name().to_string(),
            samples: n,
            epochs: loss_history.len(),
            loss_history,
            final_loss,
            duration_secs: timer.elapsed_secs(),
        })
    }

    fn predict(&self, inputs: ArrayView3<'_, f64>) -> Result<Array1<f64>> {
        let params = self
            .params
            .as_ref()
            .ok_or(LoadcastError::StateError { stage: Stage::ForecastModel })?;
        check_features(&inputs, self.n_features)?;

        let predictions: Vec<f64> = (0..inputs.len_of(Axis(0)))
            .into_par_iter()
            .map(|i| params.forward(inputs.index_axis(Axis(0), i)).output)
            .collect();
        Ok(Array1::from_vec(predictions))
    }

    fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    fn name(&self) -> &'static str {
        "lstm"
    }
}
