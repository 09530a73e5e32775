use std::{fs, path::PathBuf};

use log::{info, warn};

use crate::{
    blocks::ClassBlocks,
    classifier::{fit_and_report, report::ClassificationReport, SplitSize, Validation},
    combine::combine_directory,
    config::PipelineConfig,
    entrez::{fetch_terms, EntrezClient},
    error::{Error, Result},
    extract::{check_term_overlaps, extract_directory},
    kmer::create_kmer_corpus,
    partition::Partition,
    vectorize::VectorizedCorpus,
};

#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub group: String,
    pub mode: String,
    pub destination: PathBuf,
    pub report: ClassificationReport,
}

/// Name of the predictions directory of the internal training split.
pub const TRAINING_SPLIT_GROUP: &str = "training_split";

pub fn fetch(config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    let client = EntrezClient::new(config.fetch.entrez_settings())?;
    fetch_terms(
        &client,
        &config.fetch.terms,
        config.fetch.max_records,
        config.fetch.batch_size,
        config.entries_dir(),
    )
}

pub fn extract(config: &PipelineConfig) -> Result<usize> {
    let mut extracted = 0;
    for source in &config.sources {
        check_term_overlaps(&source.pairs, config.strict_terms)?;
        info!("Extracting sequences of source {:?}", source.name);
        extracted += extract_directory(
            config.entries_dir(),
            config.sequences_dir(&source.name),
            &source.pairs,
            &source.entries,
        )?;
    }
    Ok(extracted)
}

pub fn combine(config: &PipelineConfig) -> Result<usize> {
    for source in &config.sources {
        combine_directory(
            config.sequences_dir(&source.name),
            config.combined_source_path(&source.name),
        )?;
    }
    combine_directory(config.combined_dir(), config.corpus_path())
}

pub fn kmers(config: &PipelineConfig) -> Result<usize> {
    let output = config.kmer_corpus_path();
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    create_kmer_corpus(
        config.corpus_path(),
        output,
        config.kmers.window,
        config.kmers.step,
    )
}

pub fn vectorize(config: &PipelineConfig) -> Result<VectorizedCorpus> {
    let vectorizer = config.vectorizer.vectorizer()?;
    let partition = Partition::load(config.kmer_corpus_path())?;
    info!("Class counts: {:?}", partition.class_counts());

    let corpus = VectorizedCorpus::from_partition(&partition, &vectorizer)?;
    let output = config.features_path();
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    corpus.save(&output)?;
    info!("Saved features to {output:?}");
    Ok(corpus)
}

/// Turns a group name into a single path component.
pub fn group_directory_name(name: &str) -> String {
    let name = name.trim().replace(['/', '\\'], "_");
    if name.is_empty() || name == "." || name == ".." {
        "group".to_string()
    } else {
        name
    }
}

pub fn evaluate(config: &PipelineConfig) -> Result<Vec<EvaluationOutcome>> {
    let evaluation = &config.evaluation;
    if evaluation.training_classes.is_empty() {
        return Err(Error::InvalidParameter {
            name: "training_classes",
            value: "[]".to_string(),
            reason: "at least one class is needed for training",
        });
    }

    let corpus = VectorizedCorpus::load(config.features_path())?;
    let blocks = ClassBlocks::new(&corpus.class_counts);
    let training_range = blocks.group_range(&evaluation.training_classes)?;
    let training = corpus.feature_set.slice(training_range.clone());
    info!(
        "Training on rows {training_range:?} of {} with classes {:?}",
        blocks.row_amount(),
        evaluation.training_classes
    );

    let predictions = config.predictions_dir();
    let mut outcomes = Vec::new();
    for group in &evaluation.held_out {
        let range = blocks.group_range(&group.classes)?;
        if range.start < training_range.end && training_range.start < range.end {
            warn!(
                "Held-out group {:?} overlaps with the training classes",
                group.name
            );
        }

        let rows = range.len();
        let features = corpus.feature_set.features().slice_rows(range);
        let labels = group.expected_class.map(|class| vec![class; rows]);
        let validation = Validation::new(features, labels)?;
        let split = group.split_size(rows)?;
        let directory = predictions.join(group_directory_name(&group.name));

        info!("Predicting for {}", group.name);
        for mode in &evaluation.modes {
            let destination = directory.join(format!("{mode}.txt"));
            let report = fit_and_report(
                &training,
                mode,
                Some(&validation),
                split,
                &evaluation.class_names,
                &config.hyperparameters,
                &destination,
            )?;
            outcomes.push(EvaluationOutcome {
                group: group.name.clone(),
                mode: mode.clone(),
                destination,
                report,
            });
        }
    }

    if let Some(ratio) = evaluation.validation_ratio {
        let directory = predictions.join(TRAINING_SPLIT_GROUP);
        for mode in &evaluation.modes {
            let destination = directory.join(format!("{mode}.txt"));
            let report = fit_and_report(
                &training,
                mode,
                None,
                SplitSize::Ratio(ratio),
                &evaluation.class_names,
                &config.hyperparameters,
                &destination,
            )?;
            outcomes.push(EvaluationOutcome {
                group: TRAINING_SPLIT_GROUP.to_string(),
                mode: mode.clone(),
                destination,
                report,
            });
        }
    }

    for outcome in &outcomes {
        info!(
            "{} / {}: accuracy {:.2}, predicted per class {:?}, report in {:?}",
            outcome.group,
            outcome.mode,
            outcome.report.accuracy(),
            outcome.report.predicted_amounts(),
            outcome.destination
        );
    }
    Ok(outcomes)
}

pub fn run(config: &PipelineConfig) -> Result<Vec<EvaluationOutcome>> {
    fetch(config)?;
    process(config)
}

pub fn process(config: &PipelineConfig) -> Result<Vec<EvaluationOutcome>> {
    extract(config)?;
    combine(config)?;
    kmers(config)?;
    vectorize(config)?;
    evaluate(config)
}
