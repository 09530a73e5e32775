use super::Model;
use crate::{
    error::{Error, Result},
    sparse::{SparseMatrix, SparseRow},
};

#[derive(Debug, Clone)]
pub struct NaiveBayes {
    log_priors: Vec<f64>,
    log_probabilities: Vec<Vec<f64>>,
}

impl NaiveBayes {
    pub fn fit(
        features: &SparseMatrix,
        labels: &[usize],
        class_amount: usize,
        alpha: f64,
    ) -> Result<Self> {
        if !(alpha > 0.0) {
            return Err(Error::InvalidParameter {
                name: "nb_alpha",
                value: alpha.to_string(),
                reason: "the smoothing must be positive",
            });
        }

        let column_amount = features.column_amount();
        let mut feature_sums = vec![vec![0.0; column_amount]; class_amount];
        let mut class_sizes = vec![0usize; class_amount];
        for (row_index, (row, label)) in features.rows().zip(labels).enumerate() {
            class_sizes[*label] += 1;
            for (column, value) in row.iter() {
                if value < 0.0 {
                    return Err(Error::NegativeFeatureValue {
                        row: row_index,
                        column,
                        value,
                    });
                }
                feature_sums[*label][column] += value;
            }
        }

        let total = labels.len() as f64;
        let log_priors = class_sizes
            .iter()
            .map(|size| {
                if *size == 0 {
                    f64::NEG_INFINITY
                } else {
                    (*size as f64 / total).ln()
                }
            })
            .collect();
        let log_probabilities = feature_sums
            .into_iter()
            .map(|sums| {
                let denominator = (sums.iter().sum::<f64>() + alpha * column_amount as f64).ln();
                sums.into_iter()
                    .map(|sum| (sum + alpha).ln() - denominator)
                    .collect()
            })
            .collect();

        Ok(Self {
            log_priors,
            log_probabilities,
        })
    }
}

impl Model for NaiveBayes {
    fn predict_row(&self, row: SparseRow<'_>) -> usize {
        argmax(
            self.log_priors
                .iter()
                .zip(&self.log_probabilities)
                .map(|(prior, probabilities)| prior + row.dot(probabilities)),
        )
    }
}

/// Index of the largest value, the first one on ties.
pub(super) fn argmax(values: impl IntoIterator<Item = f64>) -> usize {
    let mut best = (0, f64::NEG_INFINITY);
    for (index, value) in values.into_iter().enumerate() {
        if value > best.1 {
            best = (index, value);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::separable_dataset;

    #[test]
    fn separates_disjoint_vocabularies() {
        let (features, labels) = separable_dataset();
        let model = NaiveBayes::fit(&features, &labels, 3, 1.0).unwrap();
        assert_eq!(model.predict(&features), labels);
    }

    #[test]
    fn negative_features_are_rejected() {
        let mut features = SparseMatrix::new(2);
        features.push_row([(1, -1.0)]);
        assert!(matches!(
            NaiveBayes::fit(&features, &[0], 1, 1.0),
            Err(Error::NegativeFeatureValue { row: 0, column: 1, .. })
        ));
    }

    #[test]
    fn argmax_prefers_first() {
        assert_eq!(argmax([1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax([f64::NEG_INFINITY, -5.0]), 1);
    }
}
