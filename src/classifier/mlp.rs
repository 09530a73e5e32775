use log::debug;
use ndarray::{Array1, Array2, Axis};
use rand::{seq::SliceRandom, SeedableRng};
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::{naive_bayes::argmax, Model};
use crate::{
    error::{Error, Result},
    sparse::{SparseMatrix, SparseRow},
};

/// Epochs without improvement after which training stops.
const PATIENCE: usize = 10;

#[derive(Debug, Clone)]
pub struct Mlp {
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
}

#[derive(Debug, Clone)]
pub struct MlpParameters {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub max_epochs: usize,
    pub tolerance: f64,
    pub random_state: u64,
}

struct Activations {
    /// Layer outputs after the activation function, the last one holds class probabilities.
    outputs: Vec<Array2<f64>>,
}

impl Mlp {
    pub fn fit(
        features: &SparseMatrix,
        labels: &[usize],
        class_amount: usize,
        parameters: &MlpParameters,
    ) -> Result<Self> {
        if !(parameters.learning_rate > 0.0) {
            return Err(Error::InvalidParameter {
                name: "learning_rate",
                value: parameters.learning_rate.to_string(),
                reason: "the learning rate must be positive",
            });
        }
        if let Some(width) = parameters.hidden_layers.iter().find(|width| **width == 0) {
            return Err(Error::InvalidParameter {
                name: "hidden_layers",
                value: width.to_string(),
                reason: "hidden layers must not be empty",
            });
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(parameters.random_state);
        let mut mlp = Self::initialise(
            features.column_amount(),
            &parameters.hidden_layers,
            class_amount,
            &mut rng,
        )?;

        let batch_size = parameters.batch_size.max(1);
        let mut order: Vec<_> = (0..features.row_amount()).collect();
        let mut best_loss = f64::INFINITY;
        let mut epochs_without_improvement = 0;
        for epoch in 0..parameters.max_epochs {
            order.shuffle(&mut rng);
            let mut loss = 0.0;
            for batch in order.chunks(batch_size) {
                loss += mlp.train_batch(features, labels, batch, parameters.learning_rate);
            }
            loss /= features.row_amount().max(1) as f64;

            if loss < best_loss - parameters.tolerance {
                best_loss = loss;
                epochs_without_improvement = 0;
            } else {
                epochs_without_improvement += 1;
                if epochs_without_improvement >= PATIENCE {
                    debug!("Stopping after epoch {epoch} with loss {loss}");
                    break;
                }
            }
        }

        Ok(mlp)
    }

    fn initialise(
        input_width: usize,
        hidden_layers: &[usize],
        class_amount: usize,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Result<Self> {
        let widths: Vec<_> = std::iter::once(input_width)
            .chain(hidden_layers.iter().copied())
            .chain(std::iter::once(class_amount))
            .collect();

        let mut weights = Vec::new();
        let mut biases = Vec::new();
        for pair in widths.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            let deviation = (2.0 / (fan_in + fan_out).max(1) as f64).sqrt();
            let normal = Normal::new(0.0, deviation).map_err(|_| Error::InvalidParameter {
                name: "hidden_layers",
                value: format!("{hidden_layers:?}"),
                reason: "the layer widths give no valid weight initialisation",
            })?;
            weights.push(Array2::from_shape_fn((fan_in, fan_out), |_| normal.sample(&mut *rng)));
            biases.push(Array1::zeros(fan_out));
        }

        Ok(Self { weights, biases })
    }

    fn forward(&self, features: &SparseMatrix, rows: &[usize]) -> Activations {
        let first = &self.weights[0];
        let mut input = Array2::<f64>::zeros((rows.len(), first.ncols()));
        for (batch_row, row) in rows.iter().enumerate() {
            let mut output = input.row_mut(batch_row);
            for (column, value) in features.row(*row).iter() {
                output.scaled_add(value, &first.row(column));
            }
        }
        input += &self.biases[0];

        let layer_amount = self.weights.len();
        let mut outputs = Vec::with_capacity(layer_amount);
        let mut current = input;
        for layer in 0..layer_amount {
            if layer > 0 {
                current = current.dot(&self.weights[layer]) + &self.biases[layer];
            }
            if layer + 1 < layer_amount {
                current.mapv_inplace(|value| value.max(0.0));
            } else {
                softmax_rows(&mut current);
            }
            outputs.push(current.clone());
        }

        Activations { outputs }
    }

    fn train_batch(
        &mut self,
        features: &SparseMatrix,
        labels: &[usize],
        rows: &[usize],
        learning_rate: f64,
    ) -> f64 {
        let activations = self.forward(features, rows);
        let layer_amount = self.weights.len();
        let probabilities = &activations.outputs[layer_amount - 1];

        let mut loss = 0.0;
        let mut delta = probabilities.clone();
        for (batch_row, row) in rows.iter().enumerate() {
            let label = labels[*row];
            loss -= probabilities[[batch_row, label]].max(1e-12).ln();
            delta[[batch_row, label]] -= 1.0;
        }
        delta /= rows.len() as f64;

        for layer in (1..layer_amount).rev() {
            let input = &activations.outputs[layer - 1];
            let weight_gradient = input.t().dot(&delta);
            let bias_gradient = delta.sum_axis(Axis(0));

            let mut next_delta = delta.dot(&self.weights[layer].t());
            next_delta.zip_mut_with(input, |gradient, output| {
                if *output <= 0.0 {
                    *gradient = 0.0;
                }
            });

            self.weights[layer].scaled_add(-learning_rate, &weight_gradient);
            self.biases[layer].scaled_add(-learning_rate, &bias_gradient);
            delta = next_delta;
        }

        // The input layer only changes in the rows of non-zero features.
        for (batch_row, row) in rows.iter().enumerate() {
            for (column, value) in features.row(*row).iter() {
                self.weights[0]
                    .row_mut(column)
                    .scaled_add(-learning_rate * value, &delta.row(batch_row));
            }
        }
        let bias_gradient = delta.sum_axis(Axis(0));
        self.biases[0].scaled_add(-learning_rate, &bias_gradient);

        loss
    }

    fn probabilities(&self, row: SparseRow<'_>) -> Array1<f64> {
        let mut single = SparseMatrix::new(self.weights[0].nrows());
        single.push_row(row.iter());
        let activations = self.forward(&single, &[0]);
        activations.outputs[self.weights.len() - 1].row(0).to_owned()
    }
}

fn softmax_rows(values: &mut Array2<f64>) {
    for mut row in values.rows_mut() {
        let maximum = row.fold(f64::NEG_INFINITY, |maximum, value| maximum.max(*value));
        row.mapv_inplace(|value| (value - maximum).exp());
        let sum = row.sum();
        row /= sum;
    }
}

impl Model for Mlp {
    fn predict_row(&self, row: SparseRow<'_>) -> usize {
        argmax(self.probabilities(row).iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::separable_dataset;

    fn parameters(hidden_layers: Vec<usize>) -> MlpParameters {
        MlpParameters {
            hidden_layers,
            learning_rate: 0.1,
            batch_size: 4,
            max_epochs: 500,
            tolerance: 1e-6,
            random_state: 64,
        }
    }

    #[test]
    fn separates_disjoint_vocabularies() {
        let (features, labels) = separable_dataset();
        let model = Mlp::fit(&features, &labels, 3, &parameters(vec![8, 4])).unwrap();
        assert_eq!(model.predict(&features), labels);
    }

    #[test]
    fn works_without_hidden_layers() {
        let (features, labels) = separable_dataset();
        let model = Mlp::fit(&features, &labels, 3, &parameters(Vec::new())).unwrap();
        assert_eq!(model.predict(&features), labels);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (features, labels) = separable_dataset();
        let model = Mlp::fit(&features, &labels, 3, &parameters(vec![5])).unwrap();
        let probabilities = model.probabilities(features.row(0));
        assert_eq!(probabilities.len(), 3);
        assert!((probabilities.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_hidden_layer_is_rejected() {
        let (features, labels) = separable_dataset();
        assert!(matches!(
            Mlp::fit(&features, &labels, 3, &parameters(vec![4, 0])),
            Err(Error::InvalidParameter {
                name: "hidden_layers",
                ..
            })
        ));
    }
}
