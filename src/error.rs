use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("sequence parse error: {0}")]
    Fastx(#[from] needletail::errors::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("feature serialisation error: {0}")]
    FeatureSerialisation(#[from] ciborium::ser::Error<std::io::Error>),

    #[error("feature deserialisation error: {0}")]
    FeatureDeserialisation(#[from] ciborium::de::Error<std::io::Error>),

    #[error("the record database reported an error for term {term:?}: {message}")]
    Entrez { term: String, message: String },

    #[error("the list of search terms is empty")]
    EmptyTermList,

    #[error("none of the {0} search terms could be fetched")]
    NoTermsFetched(usize),

    #[error("no entry file in {0:?} could be processed")]
    NoEntriesProcessed(PathBuf),

    #[error(
        "model mode {0:?} is not supported, expected one of \"nb\", \"dtc\", \"svc\" or \"mlp\""
    )]
    UnsupportedMode(String),

    #[error("vectorizer mode {0:?} is not supported, expected \"tfidf\" or \"count\"")]
    UnsupportedVectorizerMode(String),

    #[error(
        "held-out size {0} is not supported, \
         expected a ratio in (0.0, 1.0) or a positive row count"
    )]
    UnsupportedSplitSize(String),

    #[error("a held-out row count was given, but no held-out data")]
    MissingValidationData,

    #[error(
        "the requested held-out size {requested} does not match the {available} available rows"
    )]
    SplitSizeMismatch { requested: usize, available: usize },

    #[error("the parameter {name} = {value} is invalid: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("class ids must form 0..K without gaps, but the observed ids are {observed:?}")]
    SparseClassIds { observed: Vec<usize> },

    #[error("the classes {0:?} do not form a contiguous block")]
    NonContiguousGroup(Vec<usize>),

    #[error("class {0} is unknown")]
    UnknownClass(usize),

    #[error("{names} class names were given, but the labels need {classes}")]
    ClassNameCountMismatch { names: usize, classes: usize },

    #[error(
        "the term {narrower:?} (class {narrower_class}) \
         overlaps with the term {broader:?} (class {broader_class})"
    )]
    OverlappingTerms {
        broader: String,
        broader_class: usize,
        narrower: String,
        narrower_class: usize,
    },

    #[error("the corpus is empty")]
    EmptyCorpus,

    #[error("line {line} of {path:?} is not a labeled sequence: {content:?}")]
    MalformedLabeledLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("the sequence {0:?} contains whitespace")]
    InvalidSequence(String),

    #[error("the feature matrix has {rows} rows, but there are {labels} labels")]
    MisalignedRows { rows: usize, labels: usize },

    #[error("naive Bayes requires non-negative features, but row {row} column {column} is {value}")]
    NegativeFeatureValue { row: usize, column: usize, value: f64 },

    #[error("holding out {held_out} of {available} rows leaves nothing to train on")]
    NotEnoughTrainingRows { held_out: usize, available: usize },
}
