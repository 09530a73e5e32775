use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Column indices within each row are strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    column_amount: usize,
    row_offsets: Vec<usize>,
    columns: Vec<usize>,
    values: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct SparseRow<'matrix> {
    columns: &'matrix [usize],
    values: &'matrix [f64],
}

impl SparseMatrix {
    pub fn new(column_amount: usize) -> Self {
        Self {
            column_amount,
            row_offsets: vec![0],
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Appends a row, sorting its entries by column and dropping explicit zeros.
    pub fn push_row(&mut self, entries: impl IntoIterator<Item = (usize, f64)>) {
        let mut entries: Vec<_> = entries.into_iter().filter(|(_, value)| *value != 0.0).collect();
        entries.sort_unstable_by_key(|(column, _)| *column);

        for (column, value) in entries {
            debug_assert!(column < self.column_amount);
            if self.columns.len() > self.row_offsets[self.row_offsets.len() - 1]
                && self.columns.last() == Some(&column)
            {
                if let Some(last) = self.values.last_mut() {
                    *last += value;
                }
            } else {
                self.columns.push(column);
                self.values.push(value);
            }
        }
        self.row_offsets.push(self.columns.len());
    }

    pub fn row_amount(&self) -> usize {
        self.row_offsets.len() - 1
    }

    pub fn column_amount(&self) -> usize {
        self.column_amount
    }

    pub fn non_zero_amount(&self) -> usize {
        self.values.len()
    }

    pub fn row(&self, row: usize) -> SparseRow<'_> {
        let range = self.row_offsets[row]..self.row_offsets[row + 1];
        SparseRow {
            columns: &self.columns[range.clone()],
            values: &self.values[range],
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = SparseRow<'_>> {
        (0..self.row_amount()).map(|row| self.row(row))
    }

    pub fn slice_rows(&self, rows: Range<usize>) -> Self {
        self.select_rows(rows)
    }

    pub fn select_rows(&self, rows: impl IntoIterator<Item = usize>) -> Self {
        let mut result = Self::new(self.column_amount);
        for row in rows {
            let row = self.row(row);
            result.columns.extend_from_slice(row.columns);
            result.values.extend_from_slice(row.values);
            result.row_offsets.push(result.columns.len());
        }
        result
    }

    pub fn scale_columns(&self, factors: &[f64]) -> Self {
        debug_assert_eq!(factors.len(), self.column_amount);
        let mut result = self.clone();
        for (value, column) in result.values.iter_mut().zip(&result.columns) {
            *value *= factors[*column];
        }
        result
    }

    /// Scales every row to unit euclidean length, rows without entries stay empty.
    pub fn normalise_rows(&mut self) {
        for row in 0..self.row_amount() {
            let range = self.row_offsets[row]..self.row_offsets[row + 1];
            let norm = self.values[range.clone()]
                .iter()
                .map(|value| value * value)
                .sum::<f64>()
                .sqrt();
            if norm > 0.0 {
                self.values[range].iter_mut().for_each(|value| *value /= norm);
            }
        }
    }
}

impl<'matrix> SparseRow<'matrix> {
    pub fn iter(self) -> impl Iterator<Item = (usize, f64)> + 'matrix {
        self.columns.iter().copied().zip(self.values.iter().copied())
    }

    pub fn get(self, column: usize) -> f64 {
        match self.columns.binary_search(&column) {
            Ok(index) => self.values[index],
            Err(_) => 0.0,
        }
    }

    pub fn dot(self, dense: &[f64]) -> f64 {
        self.iter().map(|(column, value)| value * dense[column]).sum()
    }

    #[cfg(test)]
    pub fn is_empty(self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    features: SparseMatrix,
    labels: Vec<usize>,
}

impl FeatureSet {
    pub fn new(features: SparseMatrix, labels: Vec<usize>) -> Result<Self> {
        if features.row_amount() != labels.len() {
            return Err(Error::MisalignedRows {
                rows: features.row_amount(),
                labels: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    pub fn features(&self) -> &SparseMatrix {
        &self.features
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn slice(&self, rows: Range<usize>) -> Self {
        Self {
            features: self.features.slice_rows(rows.clone()),
            labels: self.labels[rows].to_vec(),
        }
    }

    pub fn select(&self, rows: &[usize]) -> Self {
        Self {
            features: self.features.select_rows(rows.iter().copied()),
            labels: rows.iter().map(|row| self.labels[*row]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> SparseMatrix {
        let mut matrix = SparseMatrix::new(4);
        matrix.push_row([(2, 1.0), (0, 3.0)]);
        matrix.push_row([]);
        matrix.push_row([(3, 4.0), (1, 0.0), (3, 1.0)]);
        matrix
    }

    #[test]
    fn rows_are_sorted_and_merged() {
        let matrix = example();
        assert_eq!(matrix.row_amount(), 3);
        assert_eq!(matrix.non_zero_amount(), 3);
        assert_eq!(matrix.row(0).iter().collect::<Vec<_>>(), [(0, 3.0), (2, 1.0)]);
        assert!(matrix.row(1).is_empty());
        assert_eq!(matrix.row(2).iter().collect::<Vec<_>>(), [(3, 5.0)]);
        assert_eq!(matrix.row(0).get(2), 1.0);
        assert_eq!(matrix.row(0).get(1), 0.0);
        assert_eq!(matrix.row(0).dot(&[1.0, 1.0, 2.0, 1.0]), 5.0);
    }

    #[test]
    fn slicing_keeps_rows() {
        let matrix = example();
        let slice = matrix.slice_rows(1..3);
        assert_eq!(slice.row_amount(), 2);
        assert_eq!(slice.column_amount(), 4);
        assert_eq!(slice.row(1).iter().collect::<Vec<_>>(), [(3, 5.0)]);

        let selection = matrix.select_rows([2, 0]);
        assert_eq!(selection.row(0).get(3), 5.0);
        assert_eq!(selection.row(1).get(0), 3.0);
    }

    #[test]
    fn normalisation_and_scaling() {
        let mut matrix = example();
        matrix.normalise_rows();
        let row = matrix.row(0);
        assert!((row.get(0) - 3.0 / 10f64.sqrt()).abs() < 1e-12);
        assert!(matrix.row(1).is_empty());
        assert_eq!(matrix.row(2).get(3), 1.0);

        let scaled = example().scale_columns(&[2.0, 1.0, 0.5, 1.0]);
        assert_eq!(scaled.row(0).iter().collect::<Vec<_>>(), [(0, 6.0), (2, 0.5)]);
    }

    #[test]
    fn feature_set_keeps_rows_and_labels_together() {
        assert!(matches!(
            FeatureSet::new(example(), vec![0, 1]),
            Err(Error::MisalignedRows { rows: 3, labels: 2 })
        ));

        let set = FeatureSet::new(example(), vec![0, 1, 2]).unwrap();
        let slice = set.slice(1..3);
        assert_eq!(slice.labels(), [1, 2]);
        assert_eq!(slice.features().row(1).get(3), 5.0);

        let selection = set.select(&[2, 0]);
        assert_eq!(selection.labels(), [2, 0]);
        assert_eq!(selection.features().row(1).get(0), 3.0);
    }
}
