use std::{
    fmt::{self, Display, Formatter},
    fs,
    path::Path,
    str::FromStr,
};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use self::{
    mlp::{Mlp, MlpParameters},
    naive_bayes::NaiveBayes,
    report::ClassificationReport,
    scaler::Scaler,
    split::{split_rows, test_amount_for_ratio},
    svm::{LinearSvm, SvmParameters},
    tree::{DecisionTree, TreeParameters},
};
use crate::{
    error::{Error, Result},
    sparse::{FeatureSet, SparseMatrix, SparseRow},
};

pub mod mlp;
pub mod naive_bayes;
pub mod report;
pub mod scaler;
pub mod split;
pub mod svm;
pub mod tree;

pub trait Model {
    fn predict_row(&self, row: SparseRow<'_>) -> usize;

    fn predict(&self, features: &SparseMatrix) -> Vec<usize> {
        features.rows().map(|row| self.predict_row(row)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelMode {
    NaiveBayes,
    DecisionTree,
    LinearSvm,
    Mlp,
}

impl ModelMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NaiveBayes => "nb",
            Self::DecisionTree => "dtc",
            Self::LinearSvm => "svc",
            Self::Mlp => "mlp",
        }
    }
}

impl FromStr for ModelMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "nb" | "cnb" => Ok(Self::NaiveBayes),
            "dtc" => Ok(Self::DecisionTree),
            "svc" => Ok(Self::LinearSvm),
            "mlp" | "cnn" => Ok(Self::Mlp),
            other => Err(Error::UnsupportedMode(other.to_string())),
        }
    }
}

impl Display for ModelMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    #[serde(default = "default_hidden_layers")]
    pub hidden_layers: Vec<usize>,
    /// Epochs of the SVM and the maximum epochs of the MLP.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_random_state")]
    pub random_state: u64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub tree_max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_svm_c")]
    pub svm_c: f64,
    #[serde(default = "default_nb_alpha")]
    pub nb_alpha: f64,
}

fn default_hidden_layers() -> Vec<usize> { vec![8, 4] }
fn default_iterations() -> usize { 200 }
fn default_random_state() -> u64 { 64 }
fn default_learning_rate() -> f64 { 0.01 }
fn default_batch_size() -> usize { 32 }
fn default_tolerance() -> f64 { 1e-4 }
fn default_min_samples_split() -> usize { 2 }
fn default_svm_c() -> f64 { 1.0 }
fn default_nb_alpha() -> f64 { 1.0 }

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            hidden_layers: default_hidden_layers(),
            iterations: default_iterations(),
            random_state: default_random_state(),
            learning_rate: default_learning_rate(),
            batch_size: default_batch_size(),
            tolerance: default_tolerance(),
            tree_max_depth: None,
            min_samples_split: default_min_samples_split(),
            svm_c: default_svm_c(),
            nb_alpha: default_nb_alpha(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitSize {
    Ratio(f64),
    Count(usize),
}

impl SplitSize {
    /// Integers are row counts, floats are ratios.
    pub fn from_value(value: &toml::Value) -> Result<Self> {
        match value {
            toml::Value::Integer(count) => usize::try_from(*count)
                .map(Self::Count)
                .map_err(|_| Error::UnsupportedSplitSize(count.to_string())),
            toml::Value::Float(ratio) => Ok(Self::Ratio(*ratio)),
            other => Err(Error::UnsupportedSplitSize(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub features: SparseMatrix,
    pub labels: Option<Vec<usize>>,
}

impl Validation {
    pub fn new(features: SparseMatrix, labels: Option<Vec<usize>>) -> Result<Self> {
        if let Some(labels) = &labels {
            if labels.len() != features.row_amount() {
                return Err(Error::MisalignedRows {
                    rows: features.row_amount(),
                    labels: labels.len(),
                });
            }
        }
        Ok(Self { features, labels })
    }
}

struct Evaluation {
    training: FeatureSet,
    features: SparseMatrix,
    truth: Vec<usize>,
}

fn prepare_evaluation(
    training: &FeatureSet,
    validation: Option<&Validation>,
    split: SplitSize,
    random_state: u64,
) -> Result<Evaluation> {
    match split {
        SplitSize::Ratio(ratio) => {
            if !(ratio > 0.0 && ratio < 1.0) {
                return Err(Error::UnsupportedSplitSize(ratio.to_string()));
            }
            let row_split = split_rows(
                training.len(),
                test_amount_for_ratio(training.len(), ratio),
                random_state,
            )?;
            let test = training.select(&row_split.test);
            let remaining = training.select(&row_split.training);

            match validation {
                // The explicit rows replace the internal test rows.
                Some(validation) => {
                    let truth = match &validation.labels {
                        Some(labels) => labels.clone(),
                        None if validation.features.row_amount() == test.len() => {
                            test.labels().to_vec()
                        }
                        None => {
                            return Err(Error::SplitSizeMismatch {
                                requested: test.len(),
                                available: validation.features.row_amount(),
                            })
                        }
                    };
                    Ok(Evaluation {
                        training: remaining,
                        features: validation.features.clone(),
                        truth,
                    })
                }
                None => Ok(Evaluation {
                    training: remaining,
                    features: test.features().clone(),
                    truth: test.labels().to_vec(),
                }),
            }
        }
        SplitSize::Count(count) => {
            let validation = validation
                .filter(|validation| validation.features.row_amount() > 0)
                .ok_or(Error::MissingValidationData)?;
            if count != validation.features.row_amount() {
                return Err(Error::SplitSizeMismatch {
                    requested: count,
                    available: validation.features.row_amount(),
                });
            }

            match &validation.labels {
                Some(labels) => Ok(Evaluation {
                    training: training.clone(),
                    features: validation.features.clone(),
                    truth: labels.clone(),
                }),
                None => {
                    let row_split = split_rows(training.len(), count, random_state)?;
                    debug!("Drawing {count} reference labels from the training rows");
                    Ok(Evaluation {
                        training: training.select(&row_split.training),
                        features: validation.features.clone(),
                        truth: training.select(&row_split.test).labels().to_vec(),
                    })
                }
            }
        }
    }
}

fn train(
    mode: ModelMode,
    training: &FeatureSet,
    class_amount: usize,
    hyperparameters: &Hyperparameters,
) -> Result<Box<dyn Model>> {
    let features = training.features();
    let labels = training.labels();
    Ok(match mode {
        ModelMode::NaiveBayes => Box::new(NaiveBayes::fit(
            features,
            labels,
            class_amount,
            hyperparameters.nb_alpha,
        )?),
        ModelMode::DecisionTree => Box::new(DecisionTree::fit(
            features,
            labels,
            class_amount,
            TreeParameters {
                max_depth: hyperparameters.tree_max_depth,
                min_samples_split: hyperparameters.min_samples_split,
            },
        )),
        ModelMode::LinearSvm => Box::new(LinearSvm::fit(
            features,
            labels,
            class_amount,
            SvmParameters {
                c: hyperparameters.svm_c,
                epochs: hyperparameters.iterations,
                random_state: hyperparameters.random_state,
            },
        )?),
        ModelMode::Mlp => Box::new(Mlp::fit(
            features,
            labels,
            class_amount,
            &MlpParameters {
                hidden_layers: hyperparameters.hidden_layers.clone(),
                learning_rate: hyperparameters.learning_rate,
                batch_size: hyperparameters.batch_size,
                max_epochs: hyperparameters.iterations,
                tolerance: hyperparameters.tolerance,
                random_state: hyperparameters.random_state,
            },
        )?),
    })
}

/// With [`SplitSize::Ratio`] a seeded share of the training rows is held out,
/// and explicit validation rows are predicted in its place if given.
/// With [`SplitSize::Count`] the validation rows are predicted.
/// Without their labels, as many reference labels are drawn from the training rows.
pub fn fit_and_report(
    training: &FeatureSet,
    mode: &str,
    validation: Option<&Validation>,
    split: SplitSize,
    class_names: &[String],
    hyperparameters: &Hyperparameters,
    destination: impl AsRef<Path>,
) -> Result<ClassificationReport> {
    let destination = destination.as_ref();
    let mode: ModelMode = mode.parse()?;

    let class_amount = class_names.len();
    if let Some(maximum) = training.labels().iter().max() {
        if *maximum >= class_amount {
            return Err(Error::ClassNameCountMismatch {
                names: class_amount,
                classes: maximum + 1,
            });
        }
    }

    let evaluation = prepare_evaluation(
        training,
        validation,
        split,
        hyperparameters.random_state,
    )?;
    if let Some(unknown) = evaluation.truth.iter().find(|label| **label >= class_amount) {
        return Err(Error::UnknownClass(*unknown));
    }
    if evaluation.training.is_empty() {
        return Err(Error::NotEnoughTrainingRows {
            held_out: evaluation.truth.len(),
            available: training.len(),
        });
    }

    let scaler = Scaler::fit(evaluation.training.features());
    let scaled_training = FeatureSet::new(
        scaler.transform(evaluation.training.features()),
        evaluation.training.labels().to_vec(),
    )?;
    let scaled_features = scaler.transform(&evaluation.features);

    info!(
        "Training {mode} on {} rows and predicting {} rows",
        scaled_training.len(),
        scaled_features.row_amount()
    );
    let model = train(mode, &scaled_training, class_amount, hyperparameters)?;
    let predictions = model.predict(&scaled_features);
    let report = ClassificationReport::new(&evaluation.truth, &predictions, class_names);

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(destination, report.to_string())?;
    info!(
        "Wrote {mode} report with accuracy {:.2} to {destination:?}",
        report.accuracy()
    );

    Ok(report)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Four rows per class, class `c` only uses columns `2c` and `2c + 1`.
    pub fn separable_dataset() -> (SparseMatrix, Vec<usize>) {
        let mut features = SparseMatrix::new(6);
        let mut labels = Vec::new();
        for class in 0..3 {
            for row in 0..4 {
                features.push_row([(2 * class, 1.0 + row as f64), (2 * class + 1, 2.0)]);
                labels.push(class);
            }
        }
        (features, labels)
    }

    fn training() -> FeatureSet {
        let (features, labels) = separable_dataset();
        FeatureSet::new(features, labels).unwrap()
    }

    fn class_names() -> Vec<String> {
        ["alpha", "beta", "gamma"].map(String::from).to_vec()
    }

    #[test]
    fn modes_and_aliases() {
        assert_eq!("cnb".parse::<ModelMode>().unwrap(), ModelMode::NaiveBayes);
        assert_eq!("cnn".parse::<ModelMode>().unwrap(), ModelMode::Mlp);
        assert_eq!("svc".parse::<ModelMode>().unwrap().name(), "svc");
    }

    #[test]
    fn unsupported_mode_writes_nothing() {
        let directory = tempfile::tempdir().unwrap();
        let destination = directory.path().join("group").join("unsupported.txt");
        let result = fit_and_report(
            &training(),
            "unsupported",
            None,
            SplitSize::Ratio(0.25),
            &class_names(),
            &Hyperparameters::default(),
            &destination,
        );

        assert!(matches!(result, Err(Error::UnsupportedMode(mode)) if mode == "unsupported"));
        assert!(!directory.path().join("group").exists());
    }

    #[test]
    fn count_requires_validation_data() {
        let directory = tempfile::tempdir().unwrap();
        let result = fit_and_report(
            &training(),
            "nb",
            None,
            SplitSize::Count(2),
            &class_names(),
            &Hyperparameters::default(),
            directory.path().join("nb.txt"),
        );
        assert!(matches!(result, Err(Error::MissingValidationData)));
    }

    #[test]
    fn count_must_match_validation_rows() {
        let directory = tempfile::tempdir().unwrap();
        let (features, _) = separable_dataset();
        let validation = Validation::new(features.slice_rows(0..3), None).unwrap();
        let result = fit_and_report(
            &training(),
            "nb",
            Some(&validation),
            SplitSize::Count(2),
            &class_names(),
            &Hyperparameters::default(),
            directory.path().join("nb.txt"),
        );
        assert!(matches!(
            result,
            Err(Error::SplitSizeMismatch {
                requested: 2,
                available: 3
            })
        ));
    }

    #[test]
    fn labeled_validation_is_reported_into_new_directories() {
        let directory = tempfile::tempdir().unwrap();
        let destination = directory.path().join("predictions").join("group").join("nb.txt");
        let (features, _) = separable_dataset();
        let validation = Validation::new(features.slice_rows(4..8), Some(vec![1; 4])).unwrap();

        let report = fit_and_report(
            &training(),
            "nb",
            Some(&validation),
            SplitSize::Count(4),
            &class_names(),
            &Hyperparameters::default(),
            &destination,
        )
        .unwrap();

        assert_eq!(report.accuracy(), 1.0);
        assert_eq!(report.predicted_amounts(), [0, 4, 0]);
        let written = fs::read_to_string(&destination).unwrap();
        assert_eq!(written, report.to_string());
        assert!(written.contains("beta"));
    }

    #[test]
    fn unlabeled_validation_draws_reference_labels() {
        let directory = tempfile::tempdir().unwrap();
        let (features, _) = separable_dataset();
        let validation = Validation::new(features.slice_rows(0..3), None).unwrap();

        let report = fit_and_report(
            &training(),
            "dtc",
            Some(&validation),
            SplitSize::Count(3),
            &class_names(),
            &Hyperparameters::default(),
            directory.path().join("dtc.txt"),
        )
        .unwrap();

        let support: usize = report.scores().iter().map(|scores| scores.support).sum();
        assert_eq!(support, 3);
        assert_eq!(report.predicted_amounts().iter().sum::<usize>(), 3);
    }

    #[test]
    fn ratio_splits_the_training_rows() {
        let directory = tempfile::tempdir().unwrap();
        for mode in ["nb", "dtc", "svc", "mlp"] {
            let report = fit_and_report(
                &training(),
                mode,
                None,
                SplitSize::Ratio(0.25),
                &class_names(),
                &Hyperparameters::default(),
                directory.path().join(format!("{mode}.txt")),
            )
            .unwrap();
            let support: usize = report.scores().iter().map(|scores| scores.support).sum();
            assert_eq!(support, 3);
        }
    }

    #[test]
    fn ratio_outside_unit_interval_is_rejected() {
        let directory = tempfile::tempdir().unwrap();
        for ratio in [0.0, 1.0, 1.5] {
            let result = fit_and_report(
                &training(),
                "nb",
                None,
                SplitSize::Ratio(ratio),
                &class_names(),
                &Hyperparameters::default(),
                directory.path().join("nb.txt"),
            );
            assert!(matches!(result, Err(Error::UnsupportedSplitSize(_))));
        }
    }

    #[test]
    fn labels_need_class_names() {
        let directory = tempfile::tempdir().unwrap();
        let result = fit_and_report(
            &training(),
            "nb",
            None,
            SplitSize::Ratio(0.25),
            &class_names()[..2],
            &Hyperparameters::default(),
            directory.path().join("nb.txt"),
        );
        assert!(matches!(
            result,
            Err(Error::ClassNameCountMismatch {
                names: 2,
                classes: 3
            })
        ));
    }

    #[test]
    fn unknown_ground_truth_is_rejected() {
        let directory = tempfile::tempdir().unwrap();
        let (features, _) = separable_dataset();
        let validation = Validation::new(features.slice_rows(0..2), Some(vec![0, 7])).unwrap();
        let result = fit_and_report(
            &training(),
            "nb",
            Some(&validation),
            SplitSize::Count(2),
            &class_names(),
            &Hyperparameters::default(),
            directory.path().join("nb.txt"),
        );
        assert!(matches!(result, Err(Error::UnknownClass(7))));
    }

    #[test]
    fn empty_training_set_is_rejected() {
        let directory = tempfile::tempdir().unwrap();
        let (features, _) = separable_dataset();
        let training = FeatureSet::new(SparseMatrix::new(6), Vec::new()).unwrap();
        let validation = Validation::new(features.slice_rows(0..2), Some(vec![0, 0])).unwrap();
        let result = fit_and_report(
            &training,
            "dtc",
            Some(&validation),
            SplitSize::Count(2),
            &class_names(),
            &Hyperparameters::default(),
            directory.path().join("dtc.txt"),
        );
        assert!(matches!(
            result,
            Err(Error::NotEnoughTrainingRows {
                held_out: 2,
                available: 0
            })
        ));
        assert!(!directory.path().join("dtc.txt").exists());
    }

    #[test]
    fn split_sizes_from_configuration_values() {
        assert_eq!(
            SplitSize::from_value(&toml::Value::Integer(12)).unwrap(),
            SplitSize::Count(12)
        );
        assert_eq!(
            SplitSize::from_value(&toml::Value::Float(0.3)).unwrap(),
            SplitSize::Ratio(0.3)
        );
        assert!(matches!(
            SplitSize::from_value(&toml::Value::String("half".into())),
            Err(Error::UnsupportedSplitSize(_))
        ));
        assert!(SplitSize::from_value(&toml::Value::Integer(-1)).is_err());
    }
}
