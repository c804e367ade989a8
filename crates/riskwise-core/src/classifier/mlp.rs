//! Feed-forward network classifier
//!
//! ReLU hidden layers, inverted dropout after every hidden layer but the
//! last, single sigmoid output. Trained with binary cross-entropy and Adam.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{ClassifierModel, Dataset, EpochReport, FitControl, FitOptions, FitReport};
use crate::config::TrainingConfig;
use crate::error::{Error, Result};
use crate::models::{FeatureVector, FEATURE_COUNT};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-7;

/// One dense layer with its Adam moments
#[derive(Debug, Clone)]
struct DenseLayer {
    weights: Array2<f64>,
    bias: Array1<f64>,
    m_weights: Array2<f64>,
    v_weights: Array2<f64>,
    m_bias: Array1<f64>,
    v_bias: Array1<f64>,
}

impl DenseLayer {
    /// He-uniform initialization
    fn new(inputs: usize, outputs: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / inputs as f64).sqrt();
        let weights = Array2::from_shape_fn((inputs, outputs), |_| rng.gen_range(-limit..limit));
        Self {
            weights,
            bias: Array1::zeros(outputs),
            m_weights: Array2::zeros((inputs, outputs)),
            v_weights: Array2::zeros((inputs, outputs)),
            m_bias: Array1::zeros(outputs),
            v_bias: Array1::zeros(outputs),
        }
    }

    fn forward(&self, input: &ArrayView2<'_, f64>) -> Array2<f64> {
        input.dot(&self.weights) + &self.bias
    }

    fn adam_step(&mut self, grad_w: &Array2<f64>, grad_b: &Array1<f64>, lr: f64, step: i32) {
        let bc1 = 1.0 - BETA1.powi(step);
        let bc2 = 1.0 - BETA2.powi(step);

        Zip::from(&mut self.weights)
            .and(&mut self.m_weights)
            .and(&mut self.v_weights)
            .and(grad_w)
            .for_each(|w, m, v, &g| {
                *m = BETA1 * *m + (1.0 - BETA1) * g;
                *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                *w -= lr * (*m / bc1) / ((*v / bc2).sqrt() + EPSILON);
            });

        Zip::from(&mut self.bias)
            .and(&mut self.m_bias)
            .and(&mut self.v_bias)
            .and(grad_b)
            .for_each(|b, m, v, &g| {
                *m = BETA1 * *m + (1.0 - BETA1) * g;
                *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                *b -= lr * (*m / bc1) / ((*v / bc2).sqrt() + EPSILON);
            });
    }
}

/// Activations kept from a training forward pass
struct ForwardCache {
    /// Input to each layer (post-activation, post-dropout of the previous one)
    inputs: Vec<Array2<f64>>,
    /// Pre-activation of each hidden layer
    hidden_z: Vec<Array2<f64>>,
    /// Dropout mask of each hidden layer (None when not applied)
    masks: Vec<Option<Array2<f64>>>,
    /// Output logits, one column
    logits: Array2<f64>,
}

/// Multi-layer perceptron for binary risk classification
#[derive(Debug, Clone)]
pub struct MlpClassifier {
    layers: Vec<DenseLayer>,
    dropout: f64,
    learning_rate: f64,
    rng: StdRng,
    step: i32,
}

impl MlpClassifier {
    pub fn new(
        inputs: usize,
        hidden: &[usize],
        dropout: f64,
        learning_rate: f64,
        seed: u64,
    ) -> Result<Self> {
        if inputs == 0 || hidden.iter().any(|w| *w == 0) {
            return Err(Error::TrainingFailed(
                "layer widths must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&dropout) {
            return Err(Error::TrainingFailed(format!(
                "dropout must be in [0, 1), got {}",
                dropout
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut widths = Vec::with_capacity(hidden.len() + 2);
        widths.push(inputs);
        widths.extend_from_slice(hidden);
        widths.push(1);

        let layers = widths
            .windows(2)
            .map(|pair| DenseLayer::new(pair[0], pair[1], &mut rng))
            .collect();

        Ok(Self {
            layers,
            dropout,
            learning_rate,
            rng,
            step: 0,
        })
    }

    /// Build from training configuration over the six-feature input
    pub fn from_config(config: &TrainingConfig, seed: u64) -> Result<Self> {
        Self::new(
            FEATURE_COUNT,
            &config.hidden_layers,
            config.dropout,
            config.learning_rate,
            seed,
        )
    }

    fn hidden_count(&self) -> usize {
        self.layers.len() - 1
    }

    /// Forward pass without dropout, returning logits
    fn logits(&self, input: ArrayView2<'_, f64>) -> Array2<f64> {
        let hidden = self.hidden_count();
        let mut activation = input.to_owned();
        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(&activation.view());
            activation = if i < hidden { z.mapv(relu) } else { z };
        }
        activation
    }

    fn forward_train(&mut self, input: ArrayView2<'_, f64>) -> ForwardCache {
        let hidden = self.hidden_count();
        let keep = 1.0 - self.dropout;
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut hidden_z = Vec::with_capacity(hidden);
        let mut masks = Vec::with_capacity(hidden);
        let mut activation = input.to_owned();

        for i in 0..hidden {
            let z = self.layers[i].forward(&activation.view());
            let mut a = z.mapv(relu);
            // No dropout after the last hidden layer
            let mask = if self.dropout > 0.0 && i + 1 < hidden {
                let rng = &mut self.rng;
                let mask = Array2::from_shape_fn(a.raw_dim(), |_| {
                    if rng.gen::<f64>() < keep {
                        1.0 / keep
                    } else {
                        0.0
                    }
                });
                a *= &mask;
                Some(mask)
            } else {
                None
            };
            inputs.push(activation);
            hidden_z.push(z);
            masks.push(mask);
            activation = a;
        }

        let logits = self.layers[hidden].forward(&activation.view());
        inputs.push(activation);

        ForwardCache {
            inputs,
            hidden_z,
            masks,
            logits,
        }
    }

    /// One optimizer step on a mini-batch, returning its mean loss
    fn train_batch(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        let cache = self.forward_train(x);
        let logits = cache.logits.column(0);
        let n = y.len() as f64;
        let loss = mean_bce(logits, y);

        // d(BCE)/d(logit) = sigmoid(z) - y
        let mut delta = Array2::from_shape_fn((y.len(), 1), |(i, _)| {
            (sigmoid(logits[i]) - y[i]) / n
        });

        self.step += 1;
        let step = self.step;
        let lr = self.learning_rate;
        for i in (0..self.layers.len()).rev() {
            let grad_w = cache.inputs[i].t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));

            if i > 0 {
                let mut upstream = delta.dot(&self.layers[i].weights.t());
                let z = &cache.hidden_z[i - 1];
                Zip::from(&mut upstream).and(z).for_each(|d, &z| {
                    if z <= 0.0 {
                        *d = 0.0;
                    }
                });
                if let Some(mask) = &cache.masks[i - 1] {
                    upstream *= mask;
                }
                delta = upstream;
            }

            self.layers[i].adam_step(&grad_w, &grad_b, lr, step);
        }

        loss
    }

    /// Mean loss and accuracy at the 0.5 decision boundary
    fn evaluate(&self, data: &Dataset) -> (f64, f64) {
        let logits = self.logits(data.features());
        let logits = logits.column(0);
        let labels = data.labels();
        let loss = mean_bce(logits, labels);
        let correct = logits
            .iter()
            .zip(labels.iter())
            .filter(|(z, y)| f64::from(u8::from(sigmoid(**z) >= 0.5)) == **y)
            .count();
        (loss, correct as f64 / data.len() as f64)
    }
}

impl ClassifierModel for MlpClassifier {
    fn name(&self) -> &str {
        "mlp"
    }

    fn fit(
        &mut self,
        train: &Dataset,
        validation: Option<&Dataset>,
        options: &FitOptions,
        on_epoch: &mut dyn FnMut(&EpochReport) -> FitControl,
    ) -> Result<FitReport> {
        if train.is_empty() {
            return Err(Error::TrainingFailed("empty training set".to_string()));
        }
        let validation = validation.filter(|v| !v.is_empty());

        let mut data = train.clone();
        let mut report = FitReport {
            epochs_run: 0,
            final_loss: f64::NAN,
            validation_loss: None,
            validation_accuracy: None,
        };

        for epoch in 1..=options.epochs {
            data.shuffle(&mut self.rng);

            let mut total = 0.0;
            for (x, y) in data.batches(options.batch_size) {
                total += self.train_batch(x, y) * y.len() as f64;
            }
            let loss = total / data.len() as f64;
            if !loss.is_finite() {
                return Err(Error::TrainingFailed(format!(
                    "loss diverged at epoch {}",
                    epoch
                )));
            }

            let (validation_loss, validation_accuracy) = match validation {
                Some(v) => {
                    let (l, a) = self.evaluate(v);
                    (Some(l), Some(a))
                }
                None => (None, None),
            };

            report = FitReport {
                epochs_run: epoch,
                final_loss: loss,
                validation_loss,
                validation_accuracy,
            };
            debug!(
                "epoch {}/{} loss={:.4} val_loss={:?} val_acc={:?}",
                epoch, options.epochs, loss, validation_loss, validation_accuracy
            );

            let epoch_report = EpochReport {
                epoch,
                epochs: options.epochs,
                loss,
                validation_loss,
                validation_accuracy,
            };
            if on_epoch(&epoch_report) == FitControl::Stop {
                return Err(Error::TrainingCancelled);
            }
        }

        Ok(report)
    }

    fn predict(&self, features: &FeatureVector) -> f64 {
        let row = Array2::from_shape_fn((1, FEATURE_COUNT), |(_, j)| features.as_array()[j]);
        sigmoid(self.logits(row.view())[[0, 0]])
    }
}

fn relu(v: f64) -> f64 {
    v.max(0.0)
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Binary cross-entropy computed from logits
fn mean_bce(logits: ArrayView1<'_, f64>, labels: ArrayView1<'_, f64>) -> f64 {
    let total: f64 = logits
        .iter()
        .zip(labels.iter())
        .map(|(&z, &y)| z.max(0.0) - z * y + (-z.abs()).exp().ln_1p())
        .sum();
    total / labels.len().max(1) as f64
}
