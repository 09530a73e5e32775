use rand::{seq::SliceRandom, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::{naive_bayes::argmax, Model};
use crate::{
    error::{Error, Result},
    sparse::{SparseMatrix, SparseRow},
};

/// The bias is an additional constant feature and is regularised with the weights.
#[derive(Debug, Clone)]
pub struct LinearSvm {
    weights: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Copy)]
pub struct SvmParameters {
    pub c: f64,
    pub epochs: usize,
    pub random_state: u64,
}

/// A weight vector stored as `scale * direction`, so that shrinking is constant time.
struct ScaledWeights {
    scale: f64,
    direction: Vec<f64>,
}

impl ScaledWeights {
    fn decision(&self, row: SparseRow<'_>) -> f64 {
        let bias_index = self.direction.len() - 1;
        self.scale * (row.dot(&self.direction) + self.direction[bias_index])
    }

    fn shrink(&mut self, factor: f64) {
        self.scale *= factor;
        if self.scale < 1e-9 {
            self.direction.iter_mut().for_each(|weight| *weight *= self.scale);
            self.scale = 1.0;
        }
    }

    fn add(&mut self, row: SparseRow<'_>, step: f64) {
        let step = step / self.scale;
        for (column, value) in row.iter() {
            self.direction[column] += step * value;
        }
        let bias_index = self.direction.len() - 1;
        self.direction[bias_index] += step;
    }

    fn into_weights(self) -> Vec<f64> {
        let scale = self.scale;
        self.direction.into_iter().map(|weight| weight * scale).collect()
    }
}

impl LinearSvm {
    pub fn fit(
        features: &SparseMatrix,
        labels: &[usize],
        class_amount: usize,
        parameters: SvmParameters,
    ) -> Result<Self> {
        if !(parameters.c > 0.0) {
            return Err(Error::InvalidParameter {
                name: "svm_c",
                value: parameters.c.to_string(),
                reason: "the regularisation constant must be positive",
            });
        }
        if parameters.epochs == 0 {
            return Err(Error::InvalidParameter {
                name: "iterations",
                value: parameters.epochs.to_string(),
                reason: "at least one epoch is required",
            });
        }

        let row_amount = features.row_amount();
        let lambda = 1.0 / (parameters.c * row_amount.max(1) as f64);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(parameters.random_state);
        let mut order: Vec<_> = (0..row_amount).collect();

        let mut weights = Vec::with_capacity(class_amount);
        for class in 0..class_amount {
            let mut scaled = ScaledWeights {
                scale: 1.0,
                direction: vec![0.0; features.column_amount() + 1],
            };
            // Starting at step two keeps the first shrink factor above zero.
            let mut step = 2usize;
            for _ in 0..parameters.epochs {
                order.shuffle(&mut rng);
                for row_index in &order {
                    let row = features.row(*row_index);
                    let target = if labels[*row_index] == class { 1.0 } else { -1.0 };
                    let learning_rate = 1.0 / (lambda * step as f64);
                    let margin = target * scaled.decision(row);

                    scaled.shrink(1.0 - 1.0 / step as f64);
                    if margin < 1.0 {
                        scaled.add(row, learning_rate * target);
                    }
                    step += 1;
                }
            }
            weights.push(scaled.into_weights());
        }

        Ok(Self { weights })
    }

    fn decision(&self, class: usize, row: SparseRow<'_>) -> f64 {
        let weights = &self.weights[class];
        row.dot(weights) + weights[weights.len() - 1]
    }
}

impl Model for LinearSvm {
    fn predict_row(&self, row: SparseRow<'_>) -> usize {
        argmax((0..self.weights.len()).map(|class| self.decision(class, row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::separable_dataset;

    fn parameters() -> SvmParameters {
        SvmParameters {
            c: 1.0,
            epochs: 50,
            random_state: 64,
        }
    }

    #[test]
    fn separates_disjoint_vocabularies() {
        let (features, labels) = separable_dataset();
        let model = LinearSvm::fit(&features, &labels, 3, parameters()).unwrap();
        assert_eq!(model.predict(&features), labels);
    }

    #[test]
    fn training_is_reproducible() {
        let (features, labels) = separable_dataset();
        let a = LinearSvm::fit(&features, &labels, 3, parameters()).unwrap();
        let b = LinearSvm::fit(&features, &labels, 3, parameters()).unwrap();
        assert_eq!(a.weights, b.weights);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let (features, labels) = separable_dataset();
        let mut invalid = parameters();
        invalid.c = 0.0;
        assert!(LinearSvm::fit(&features, &labels, 3, invalid).is_err());
        invalid = parameters();
        invalid.epochs = 0;
        assert!(LinearSvm::fit(&features, &labels, 3, invalid).is_err());
    }
}
