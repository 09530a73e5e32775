use std::cmp::Ordering;

use log::debug;

use super::{naive_bayes::argmax, Model};
use crate::sparse::{SparseMatrix, SparseRow};

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        class: usize,
    },
    Split {
        column: usize,
        threshold: f64,
        /// Rows with a value at most the threshold.
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
pub struct TreeParameters {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

struct Split {
    column: usize,
    threshold: f64,
    gain: f64,
}

fn entropy(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|count| **count > 0)
        .map(|count| {
            let p = *count as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

fn class_counts(rows: &[usize], labels: &[usize], class_amount: usize) -> Vec<usize> {
    let mut counts = vec![0; class_amount];
    for row in rows {
        counts[labels[*row]] += 1;
    }
    counts
}

impl DecisionTree {
    pub fn fit(
        features: &SparseMatrix,
        labels: &[usize],
        class_amount: usize,
        parameters: TreeParameters,
    ) -> Self {
        let columns = ColumnIndex::new(features);
        let mut tree = Self { nodes: Vec::new() };
        let rows: Vec<_> = (0..features.row_amount()).collect();
        let mut membership = vec![false; features.row_amount()];
        tree.grow(
            &columns,
            labels,
            class_amount,
            parameters,
            rows,
            0,
            &mut membership,
        );
        debug!(
            "Grew a decision tree of depth {} with {} nodes",
            tree.depth(),
            tree.nodes.len()
        );
        tree
    }

    #[allow(clippy::too_many_arguments)]
    fn grow(
        &mut self,
        columns: &ColumnIndex,
        labels: &[usize],
        class_amount: usize,
        parameters: TreeParameters,
        rows: Vec<usize>,
        depth: usize,
        membership: &mut [bool],
    ) -> usize {
        let counts = class_counts(&rows, labels, class_amount);
        let majority = argmax(counts.iter().map(|count| *count as f64));
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf { class: majority });

        let pure = counts.iter().filter(|count| **count > 0).count() <= 1;
        let too_deep = parameters.max_depth.is_some_and(|max_depth| depth >= max_depth);
        if pure || too_deep || rows.len() < parameters.min_samples_split.max(2) {
            return index;
        }

        for row in &rows {
            membership[*row] = true;
        }
        let split = best_split(columns, labels, &counts, &rows, membership);
        for row in &rows {
            membership[*row] = false;
        }
        let Some(split) = split else {
            return index;
        };

        let (left_rows, right_rows): (Vec<_>, Vec<_>) = rows
            .into_iter()
            .partition(|row| columns.value(*row, split.column) <= split.threshold);

        let left = self.grow(
            columns,
            labels,
            class_amount,
            parameters,
            left_rows,
            depth + 1,
            membership,
        );
        let right = self.grow(
            columns,
            labels,
            class_amount,
            parameters,
            right_rows,
            depth + 1,
            membership,
        );
        self.nodes[index] = Node::Split {
            column: split.column,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    pub fn depth(&self) -> usize {
        fn depth(nodes: &[Node], index: usize) -> usize {
            match nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + depth(nodes, left).max(depth(nodes, right))
                }
            }
        }
        depth(&self.nodes, 0)
    }
}

impl Model for DecisionTree {
    fn predict_row(&self, row: SparseRow<'_>) -> usize {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                Node::Leaf { class } => return class,
                Node::Split {
                    column,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row.get(column) <= threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

struct ColumnIndex<'matrix> {
    features: &'matrix SparseMatrix,
    /// Per column, the rows with a non-zero value and that value.
    columns: Vec<Vec<(usize, f64)>>,
}

impl<'matrix> ColumnIndex<'matrix> {
    fn new(features: &'matrix SparseMatrix) -> Self {
        let mut columns = vec![Vec::new(); features.column_amount()];
        for (row_index, row) in features.rows().enumerate() {
            for (column, value) in row.iter() {
                columns[column].push((row_index, value));
            }
        }
        Self { features, columns }
    }

    fn value(&self, row: usize, column: usize) -> f64 {
        self.features.row(row).get(column)
    }
}

fn best_split(
    columns: &ColumnIndex,
    labels: &[usize],
    counts: &[usize],
    rows: &[usize],
    membership: &[bool],
) -> Option<Split> {
    let total = rows.len();
    let parent_entropy = entropy(counts, total);
    let mut best: Option<Split> = None;

    // Values of one column at the node as (value, class, multiplicity).
    let mut entries = Vec::new();
    for (column, column_entries) in columns.columns.iter().enumerate() {
        entries.clear();
        let mut zero_counts = counts.to_vec();
        for (row, value) in column_entries {
            if membership[*row] {
                entries.push((*value, labels[*row], 1));
                zero_counts[labels[*row]] -= 1;
            }
        }
        if entries.is_empty() {
            continue;
        }
        entries.extend(
            zero_counts
                .iter()
                .enumerate()
                .filter(|(_, count)| **count > 0)
                .map(|(class, count)| (0.0, class, *count)),
        );
        entries.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut left_counts = vec![0; counts.len()];
        let mut left_total = 0;
        for window in 0..entries.len() - 1 {
            let (value, class, multiplicity) = entries[window];
            left_counts[class] += multiplicity;
            left_total += multiplicity;

            let next_value = entries[window + 1].0;
            if next_value <= value {
                continue;
            }

            let right_counts: Vec<_> = counts
                .iter()
                .zip(&left_counts)
                .map(|(count, left)| count - left)
                .collect();
            let right_total = total - left_total;
            let child_entropy = (left_total as f64 * entropy(&left_counts, left_total)
                + right_total as f64 * entropy(&right_counts, right_total))
                / total as f64;
            let gain = parent_entropy - child_entropy;

            if gain > 1e-12 && best.as_ref().map_or(true, |best| gain > best.gain) {
                best = Some(Split {
                    column,
                    threshold: (value + next_value) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}
