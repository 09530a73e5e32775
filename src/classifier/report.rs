use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class scores of a prediction, divisions by zero count as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    class_names: Vec<String>,
    scores: Vec<ClassScores>,
    accuracy: f64,
    total: usize,
    predicted_amounts: Vec<usize>,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl ClassificationReport {
    /// All labels must be lower than the amount of class names.
    pub fn new(truth: &[usize], predictions: &[usize], class_names: &[String]) -> Self {
        assert_eq!(truth.len(), predictions.len());
        let class_amount = class_names.len();

        let mut true_positives = vec![0; class_amount];
        let mut predicted_amounts = vec![0; class_amount];
        let mut supports = vec![0; class_amount];
        for (truth, prediction) in truth.iter().zip(predictions) {
            supports[*truth] += 1;
            predicted_amounts[*prediction] += 1;
            if truth == prediction {
                true_positives[*truth] += 1;
            }
        }

        let scores = (0..class_amount)
            .map(|class| {
                let precision = ratio(true_positives[class], predicted_amounts[class]);
                let recall = ratio(true_positives[class], supports[class]);
                let f1_score = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassScores {
                    precision,
                    recall,
                    f1_score,
                    support: supports[class],
                }
            })
            .collect();

        Self {
            class_names: class_names.to_vec(),
            scores,
            accuracy: ratio(true_positives.iter().sum(), truth.len()),
            total: truth.len(),
            predicted_amounts,
        }
    }

    #[cfg(test)]
    pub fn scores(&self) -> &[ClassScores] {
        &self.scores
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn predicted_amounts(&self) -> &[usize] {
        &self.predicted_amounts
    }

    pub fn macro_average(&self) -> ClassScores {
        let amount = self.scores.len().max(1) as f64;
        ClassScores {
            precision: self.scores.iter().map(|s| s.precision).sum::<f64>() / amount,
            recall: self.scores.iter().map(|s| s.recall).sum::<f64>() / amount,
            f1_score: self.scores.iter().map(|s| s.f1_score).sum::<f64>() / amount,
            support: self.total,
        }
    }

    pub fn weighted_average(&self) -> ClassScores {
        let weight = |scores: &ClassScores| ratio(scores.support, self.total);
        ClassScores {
            precision: self.scores.iter().map(|s| s.precision * weight(s)).sum(),
            recall: self.scores.iter().map(|s| s.recall * weight(s)).sum(),
            f1_score: self.scores.iter().map(|s| s.f1_score * weight(s)).sum(),
            support: self.total,
        }
    }
}

impl Display for ClassificationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let width = self
            .class_names
            .iter()
            .map(String::len)
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or_default();
        let row = |f: &mut Formatter<'_>, name: &str, scores: &ClassScores| {
            writeln!(
                f,
                "{name:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                scores.precision, scores.recall, scores.f1_score, scores.support
            )
        };

        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (name, scores) in self.class_names.iter().zip(&self.scores) {
            row(f, name, scores)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total
        )?;
        row(f, "macro avg", &self.macro_average())?;
        row(f, "weighted avg", &self.weighted_average())?;

        writeln!(f)?;
        writeln!(f, "predicted classes")?;
        for (name, amount) in self.class_names.iter().zip(&self.predicted_amounts) {
            writeln!(f, "{name:>width$}  {amount:>9}")?;
        }
        Ok(())
    }
}
