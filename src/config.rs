use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    classifier::{Hyperparameters, SplitSize},
    entrez::{EntrezSettings, PLACEHOLDER_EMAIL},
    error::Result,
    extract::TermClassPair,
    kmer::kmer_corpus_file_name,
    vectorize::{features_file_name, Vectorizer},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Reject term lists where a term of one class contains the term of another.
    #[serde(default)]
    pub strict_terms: bool,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub kmers: KmerConfig,
    #[serde(default)]
    pub vectorizer: VectorizerConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub hyperparameters: Hyperparameters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub terms: Vec<String>,
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_tool")]
    pub tool: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KmerConfig {
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_step")]
    pub step: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerConfig {
    #[serde(default = "default_vectorizer_mode")]
    pub mode: String,
    #[serde(default = "default_ngram_min")]
    pub ngram_min: usize,
    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub pairs: Vec<TermClassPair>,
    /// Entry file names to read, all entry files if empty.
    #[serde(default)]
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_modes")]
    pub modes: Vec<String>,
    /// Contiguous class ids the models are trained on.
    #[serde(default)]
    pub training_classes: Vec<usize>,
    #[serde(default)]
    pub class_names: Vec<String>,
    #[serde(default)]
    pub validation_ratio: Option<f64>,
    #[serde(default)]
    pub held_out: Vec<HeldOutGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeldOutGroup {
    pub name: String,
    pub classes: Vec<usize>,
    /// The training class the rows of this group should be predicted as.
    #[serde(default)]
    pub expected_class: Option<usize>,
    /// A row count or a ratio, the row count of the group if absent.
    #[serde(default)]
    pub split: Option<toml::Value>,
}

impl HeldOutGroup {
    pub fn split_size(&self, rows: usize) -> Result<SplitSize> {
        match &self.split {
            Some(value) => SplitSize::from_value(value),
            None => Ok(SplitSize::Count(rows)),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_max_records() -> usize { 100 }
fn default_batch_size() -> usize { 10 }
fn default_email() -> String { PLACEHOLDER_EMAIL.to_string() }
fn default_tool() -> String { env!("CARGO_PKG_NAME").to_string() }
fn default_timeout_secs() -> u64 { 60 }
fn default_retries() -> usize { 3 }
fn default_window() -> usize { 3 }
fn default_step() -> usize { 1 }
fn default_vectorizer_mode() -> String { "tfidf".to_string() }
fn default_ngram_min() -> usize { 4 }
fn default_ngram_max() -> usize { 4 }
fn default_modes() -> Vec<String> { ["nb", "dtc", "svc", "mlp"].map(String::from).to_vec() }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            strict_terms: false,
            fetch: FetchConfig::default(),
            kmers: KmerConfig::default(),
            vectorizer: VectorizerConfig::default(),
            sources: Vec::new(),
            evaluation: EvaluationConfig::default(),
            hyperparameters: Hyperparameters::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            terms: Vec::new(),
            max_records: default_max_records(),
            batch_size: default_batch_size(),
            email: default_email(),
            api_key: None,
            tool: default_tool(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
        }
    }
}

impl Default for KmerConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            step: default_step(),
        }
    }
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            mode: default_vectorizer_mode(),
            ngram_min: default_ngram_min(),
            ngram_max: default_ngram_max(),
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            modes: default_modes(),
            training_classes: Vec::new(),
            class_names: Vec::new(),
            validation_ratio: None,
            held_out: Vec::new(),
        }
    }
}

impl FetchConfig {
    pub fn entrez_settings(&self) -> EntrezSettings {
        EntrezSettings {
            email: self.email.clone(),
            tool: self.tool.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            retries: self.retries,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl VectorizerConfig {
    pub fn vectorizer(&self) -> Result<Vectorizer> {
        Vectorizer::new(self.mode.parse()?, self.ngram_min, self.ngram_max)
    }
}

impl PipelineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn entries_dir(&self) -> PathBuf {
        self.data_dir.join("entries")
    }

    pub fn sequences_dir(&self, source: &str) -> PathBuf {
        self.data_dir.join("sequences").join(source)
    }

    pub fn combined_dir(&self) -> PathBuf {
        self.data_dir.join("combined_data")
    }

    pub fn combined_source_path(&self, source: &str) -> PathBuf {
        self.combined_dir().join(format!("{source}.txt"))
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.data_dir.join("corpus").join("combined_sequences.txt")
    }

    pub fn kmer_corpus_path(&self) -> PathBuf {
        self.data_dir
            .join("kmers")
            .join(kmer_corpus_file_name(self.kmers.window))
    }

    pub fn features_path(&self) -> PathBuf {
        self.data_dir
            .join("features")
            .join(features_file_name(self.kmers.window))
    }

    pub fn predictions_dir(&self) -> PathBuf {
        self.data_dir.join("predictions")
    }
}
