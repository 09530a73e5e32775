use crate::sparse::SparseMatrix;

/// Divides every feature by its standard deviation on the rows it was fitted on.
///
/// The features are not centred, so sparse rows stay sparse.
#[derive(Debug, Clone)]
pub struct Scaler {
    factors: Vec<f64>,
}

impl Scaler {
    pub fn fit(features: &SparseMatrix) -> Self {
        let rows = features.row_amount().max(1) as f64;
        let mut sums = vec![0.0; features.column_amount()];
        let mut squared_sums = vec![0.0; features.column_amount()];
        for row in features.rows() {
            for (column, value) in row.iter() {
                sums[column] += value;
                squared_sums[column] += value * value;
            }
        }

        let factors = sums
            .iter()
            .zip(&squared_sums)
            .map(|(sum, squared_sum)| {
                let mean = sum / rows;
                let variance = (squared_sum / rows - mean * mean).max(0.0);
                let deviation = variance.sqrt();
                if deviation > f64::EPSILON {
                    1.0 / deviation
                } else {
                    1.0
                }
            })
            .collect();

        Self { factors }
    }

    pub fn transform(&self, features: &SparseMatrix) -> SparseMatrix {
        features.scale_columns(&self.factors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_by_standard_deviation() {
        let mut training = SparseMatrix::new(3);
        training.push_row([(0, 1.0), (1, 5.0)]);
        training.push_row([(0, 3.0), (1, 5.0)]);
        training.push_row([]);
        training.push_row([(0, 4.0), (1, 5.0)]);

        let scaler = Scaler::fit(&training);
        let scaled = scaler.transform(&training);

        // Column 0 has mean 2 and variance 2.5.
        assert!((scaled.row(1).get(0) - 3.0 / 2.5f64.sqrt()).abs() < 1e-12);
        // Column 1 has mean 3.75 and variance 4.6875.
        assert!((scaled.row(0).get(1) - 5.0 / 4.6875f64.sqrt()).abs() < 1e-12);
        assert!(scaled.row(2).is_empty());
    }

    #[test]
    fn constant_columns_are_left_alone() {
        let mut training = SparseMatrix::new(2);
        training.push_row([(0, 2.0)]);
        training.push_row([(0, 2.0)]);
        let scaler = Scaler::fit(&training);

        let mut held_out = SparseMatrix::new(2);
        held_out.push_row([(0, 2.0), (1, 7.0)]);
        let scaled = scaler.transform(&held_out);
        assert_eq!(scaled.row(0).get(0), 2.0);
        assert_eq!(scaled.row(0).get(1), 7.0);
    }
}
