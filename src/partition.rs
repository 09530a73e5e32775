use std::path::Path;

use crate::{
    error::{Error, Result},
    kmer::{read_kmer_corpus, KmerDocument},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    documents: Vec<KmerDocument>,
    class_counts: Vec<usize>,
}

impl Partition {
    /// Sorts the documents stably by class.
    ///
    /// The classes must be exactly `0..K` for some `K`, otherwise the class counts
    /// could not be used as offsets.
    pub fn from_documents(mut documents: Vec<KmerDocument>) -> Result<Self> {
        if documents.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        documents.sort_by_key(|document| document.class);

        let mut class_counts = Vec::new();
        let mut observed = Vec::new();
        for document in &documents {
            if observed.last() != Some(&document.class) {
                observed.push(document.class);
                class_counts.push(0);
            }
            if let Some(count) = class_counts.last_mut() {
                *count += 1;
            }
        }

        if observed.iter().enumerate().any(|(index, class)| index != *class) {
            return Err(Error::SparseClassIds { observed });
        }

        Ok(Self {
            documents,
            class_counts,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_documents(read_kmer_corpus(path)?)
    }

    pub fn documents(&self) -> &[KmerDocument] {
        &self.documents
    }

    pub fn class_counts(&self) -> &[usize] {
        &self.class_counts
    }

    pub fn labels(&self) -> Vec<usize> {
        self.documents.iter().map(|document| document.class).collect()
    }
}
