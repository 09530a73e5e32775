use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    labeled::{write_labeled_sequences, LabeledSequence},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermClassPair {
    pub term: String,
    pub class: usize,
}

impl TermClassPair {
    #[cfg(test)]
    pub fn new(term: impl Into<String>, class: usize) -> Self {
        Self {
            term: term.into(),
            class,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub description: String,
    pub sequence: String,
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub sequences: Vec<LabeledSequence>,
    pub dropped: usize,
    pub warnings: Vec<String>,
}

/// Returns the class of the first pair whose term occurs in the description, ignoring case.
///
/// Pairs are tested in list order and the first match wins.
#[cfg(test)]
pub fn match_class(description: &str, pairs: &[TermClassPair]) -> Option<usize> {
    match_pair(description, pairs).map(|index| pairs[index].class)
}

fn match_pair(description: &str, pairs: &[TermClassPair]) -> Option<usize> {
    let description = description.to_lowercase();
    pairs
        .iter()
        .position(|pair| description.contains(&pair.term.to_lowercase()))
}

/// Lists pairs `(broader, narrower)` where the broader term is a substring of the
/// narrower one but maps to a different class.
pub fn overlapping_terms(pairs: &[TermClassPair]) -> Vec<(&TermClassPair, &TermClassPair)> {
    let mut result = Vec::new();
    for broader in pairs {
        for narrower in pairs {
            if std::ptr::eq(broader, narrower) || broader.class == narrower.class {
                continue;
            }
            if narrower
                .term
                .to_lowercase()
                .contains(&broader.term.to_lowercase())
            {
                result.push((broader, narrower));
            }
        }
    }
    result
}

pub fn check_term_overlaps(pairs: &[TermClassPair], strict: bool) -> Result<()> {
    for (broader, narrower) in overlapping_terms(pairs) {
        if strict {
            return Err(Error::OverlappingTerms {
                broader: broader.term.clone(),
                broader_class: broader.class,
                narrower: narrower.term.clone(),
                narrower_class: narrower.class,
            });
        }
        warn!(
            "Term {:?} (class {}) is contained in term {:?} (class {}), \
             the earlier pair in the list takes precedence",
            broader.term, broader.class, narrower.term, narrower.class
        );
    }
    Ok(())
}

pub fn extract_labeled_sequences(
    records: impl IntoIterator<Item = SequenceRecord>,
    pairs: &[TermClassPair],
) -> Extraction {
    let mut extraction = Extraction::default();
    let mut matched_pairs = BTreeSet::new();
    let mut invalid = 0;

    for record in records {
        let Some(index) = match_pair(&record.description, pairs) else {
            extraction.dropped += 1;
            continue;
        };

        match LabeledSequence::new(&record.sequence, pairs[index].class) {
            Ok(labeled) => {
                matched_pairs.insert(index);
                extraction.sequences.push(labeled);
            }
            Err(_) => {
                invalid += 1;
                extraction.dropped += 1;
            }
        }
    }

    for (index, pair) in pairs.iter().enumerate() {
        if !matched_pairs.contains(&index) {
            extraction.warnings.push(format!(
                "The term and class pair {:?} - {} has not been found",
                pair.term, pair.class
            ));
        }
    }
    if invalid > 0 {
        extraction
            .warnings
            .push(format!("Dropped {invalid} records whose sequence contains whitespace"));
    }
    if extraction.dropped > invalid {
        extraction.warnings.push(format!(
            "Dropped {} records that match no term",
            extraction.dropped - invalid
        ));
    }

    extraction
}

pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<SequenceRecord>> {
    let path = path.as_ref();
    if fs::metadata(path)?.len() == 0 {
        return Ok(Vec::new());
    }

    let mut reader = needletail::parse_fastx_file(path)?;
    let mut records = Vec::new();
    while let Some(record) = reader.next() {
        let record = record?;
        records.push(SequenceRecord {
            description: String::from_utf8_lossy(record.id()).into_owned(),
            sequence: String::from_utf8_lossy(&record.seq()).into_owned(),
        });
    }
    Ok(records)
}

pub fn sorted_files(directory: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Extracts labeled sequences from every entry file, writing one `<file name>.txt` per entry.
///
/// If `entries` is non-empty, only the listed file names are read.
/// Files that fail to parse are skipped.
pub fn extract_directory(
    input_directory: impl AsRef<Path>,
    output_directory: impl AsRef<Path>,
    pairs: &[TermClassPair],
    entries: &[String],
) -> Result<usize> {
    let input_directory = input_directory.as_ref();
    let output_directory = output_directory.as_ref();
    fs::create_dir_all(output_directory)?;

    let files = if entries.is_empty() {
        sorted_files(input_directory)?
    } else {
        entries
            .iter()
            .map(|entry| input_directory.join(entry))
            .collect()
    };

    let mut processed = 0;
    let mut extracted = 0;
    for file in &files {
        let records = match read_records(file) {
            Ok(records) => records,
            Err(error) => {
                error!("Skipping {file:?}: {error}");
                continue;
            }
        };

        let extraction = extract_labeled_sequences(records, pairs);
        for warning in &extraction.warnings {
            warn!("{}: {warning}", file.display());
        }

        let Some(file_name) = file.file_name() else {
            continue;
        };
        let mut output_name = file_name.to_os_string();
        output_name.push(".txt");
        let output = output_directory.join(output_name);
        info!("Writing into {output:?}");
        write_labeled_sequences(&output, &extraction.sequences)?;

        processed += 1;
        extracted += extraction.sequences.len();
    }

    if processed == 0 && !files.is_empty() {
        return Err(Error::NoEntriesProcessed(input_directory.to_path_buf()));
    }
    Ok(extracted)
}
