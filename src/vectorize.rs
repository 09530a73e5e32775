//! Turns k-mer documents into sparse feature rows.
//!
//! The k-mers of a document are treated as words, and the features are n-grams of
//! consecutive k-mers. Columns are assigned in lexicographic order of the n-grams.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
    str::FromStr,
};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    partition::Partition,
    sparse::{FeatureSet, SparseMatrix},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorizerMode {
    /// Rows are normalised to unit length.
    Tfidf,
    Count,
}

impl FromStr for VectorizerMode {
    type Err = Error;

    fn from_str(mode: &str) -> Result<Self> {
        match mode {
            "tfidf" => Ok(Self::Tfidf),
            "count" => Ok(Self::Count),
            other => Err(Error::UnsupportedVectorizerMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vectorizer {
    mode: VectorizerMode,
    ngram_min: usize,
    ngram_max: usize,
}

impl Vectorizer {
    pub fn new(mode: VectorizerMode, ngram_min: usize, ngram_max: usize) -> Result<Self> {
        if ngram_min == 0 {
            return Err(Error::InvalidParameter {
                name: "ngram_min",
                value: ngram_min.to_string(),
                reason: "n-grams must contain at least one k-mer",
            });
        }
        if ngram_max < ngram_min {
            return Err(Error::InvalidParameter {
                name: "ngram_max",
                value: ngram_max.to_string(),
                reason: "the n-gram range must not be empty",
            });
        }

        Ok(Self {
            mode,
            ngram_min,
            ngram_max,
        })
    }

    fn for_each_ngram(&self, document: &str, mut f: impl FnMut(String)) {
        let tokens: Vec<_> = document.split_whitespace().collect();
        for n in self.ngram_min..=self.ngram_max {
            for window in tokens.windows(n) {
                f(window.join(" "));
            }
        }
    }

    pub fn fit_transform<'document>(
        &self,
        documents: impl IntoIterator<Item = &'document str> + Clone,
    ) -> (BTreeMap<String, usize>, SparseMatrix) {
        let mut document_frequencies = BTreeMap::<String, usize>::new();
        let mut document_amount = 0;
        for document in documents.clone() {
            let mut seen = HashSet::new();
            self.for_each_ngram(document, |ngram| {
                seen.insert(ngram);
            });
            for ngram in seen {
                *document_frequencies.entry(ngram).or_default() += 1;
            }
            document_amount += 1;
        }

        let inverse_document_frequencies: Vec<_> = document_frequencies
            .values()
            .map(|frequency| {
                ((1.0 + document_amount as f64) / (1.0 + *frequency as f64)).ln() + 1.0
            })
            .collect();
        let vocabulary: BTreeMap<_, _> = document_frequencies
            .into_keys()
            .enumerate()
            .map(|(column, ngram)| (ngram, column))
            .collect();

        let mut matrix = SparseMatrix::new(vocabulary.len());
        for document in documents {
            let mut counts = HashMap::<usize, usize>::new();
            self.for_each_ngram(document, |ngram| {
                if let Some(column) = vocabulary.get(&ngram) {
                    *counts.entry(*column).or_default() += 1;
                }
            });

            matrix.push_row(counts.into_iter().map(|(column, count)| match self.mode {
                VectorizerMode::Tfidf => {
                    (column, count as f64 * inverse_document_frequencies[column])
                }
                VectorizerMode::Count => (column, count as f64),
            }));
        }

        if self.mode == VectorizerMode::Tfidf {
            matrix.normalise_rows();
        }

        (vocabulary, matrix)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizedCorpus {
    pub feature_set: FeatureSet,
    pub class_counts: Vec<usize>,
    pub vocabulary_size: usize,
    pub mode: VectorizerMode,
}

impl VectorizedCorpus {
    pub fn from_partition(partition: &Partition, vectorizer: &Vectorizer) -> Result<Self> {
        let (vocabulary, matrix) = vectorizer.fit_transform(
            partition
                .documents()
                .iter()
                .map(|document| document.document.as_str()),
        );
        info!(
            "Vectorized {} documents into {} features with {} non-zero entries",
            matrix.row_amount(),
            vocabulary.len(),
            matrix.non_zero_amount()
        );

        Ok(Self {
            feature_set: FeatureSet::new(matrix, partition.labels())?,
            class_counts: partition.class_counts().to_vec(),
            vocabulary_size: vocabulary.len(),
            mode: vectorizer.mode,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut output = BufWriter::new(File::create(path)?);
        ciborium::into_writer(self, &mut output)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let input = BufReader::new(File::open(path)?);
        Ok(ciborium::from_reader(input)?)
    }
}

pub fn features_file_name(window: usize) -> String {
    format!("{window}_features.cbor")
}
