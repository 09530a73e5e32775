use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    labeled::{is_valid_sequence, read_labeled_sequences, LabeledSequence},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmerDocument {
    #[serde(rename = "sequence")]
    pub document: String,
    pub class: usize,
}

fn check_window(window: usize, step: usize) -> Result<()> {
    if window == 0 {
        return Err(Error::InvalidParameter {
            name: "window",
            value: window.to_string(),
            reason: "the window size must be at least 1",
        });
    }
    if step == 0 {
        return Err(Error::InvalidParameter {
            name: "step",
            value: step.to_string(),
            reason: "the step size must be at least 1",
        });
    }
    Ok(())
}

/// Slides a window of `window` characters with step `step` over the sequence.
///
/// Every window is followed by a single space, so a sequence of length `l >= window`
/// yields `(l - window) / step + 1` tokens and a shorter sequence yields an empty document.
pub fn kmer_document(sequence: &str, window: usize, step: usize) -> Result<String> {
    check_window(window, step)?;

    if !is_valid_sequence(sequence) {
        return Err(Error::InvalidSequence(sequence.to_string()));
    }
    if sequence.len() < window {
        return Ok(String::new());
    }

    let token_count = (sequence.len() - window) / step + 1;
    let mut document = String::with_capacity(token_count * (window + 1));
    for start in (0..=sequence.len() - window).step_by(step) {
        document.push_str(&sequence[start..start + window]);
        document.push(' ');
    }

    Ok(document)
}

pub fn kmer_documents(
    sequences: &[LabeledSequence],
    window: usize,
    step: usize,
) -> Result<Vec<KmerDocument>> {
    sequences
        .iter()
        .map(|labeled| {
            Ok(KmerDocument {
                document: kmer_document(&labeled.sequence, window, step)?,
                class: labeled.class,
            })
        })
        .collect()
}

pub fn kmer_corpus_file_name(window: usize) -> String {
    format!("{window}_kmers.csv")
}

pub fn create_kmer_corpus(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    window: usize,
    step: usize,
) -> Result<usize> {
    check_window(window, step)?;
    let sequences = read_labeled_sequences(input)?;
    let documents = kmer_documents(&sequences, window, step)?;
    write_kmer_corpus(&output, &documents)?;

    info!(
        "Wrote {} k-mer documents (window {window}, step {step}) into {:?}",
        documents.len(),
        output.as_ref()
    );
    Ok(documents.len())
}

pub fn write_kmer_corpus(path: impl AsRef<Path>, documents: &[KmerDocument]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for document in documents {
        writer.serialize(document)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_kmer_corpus(path: impl AsRef<Path>) -> Result<Vec<KmerDocument>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut documents = Vec::new();
    for document in reader.deserialize() {
        documents.push(document?);
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_follow_window_and_step() {
        let sequence = "acgtacgtac";
        for window in 1..=sequence.len() {
            for step in 1..=4 {
                let document = kmer_document(sequence, window, step).unwrap();
                let tokens: Vec<_> = document.split(' ').filter(|t| !t.is_empty()).collect();

                assert_eq!(tokens.len(), (sequence.len() - window) / step + 1);
                assert!(document.ends_with(' '));
                for (index, token) in tokens.iter().enumerate() {
                    assert_eq!(token.len(), window);
                    assert_eq!(*token, &sequence[index * step..index * step + window]);
                }
            }
        }
    }

    #[test]
    fn exact_document() {
        assert_eq!(kmer_document("acgtac", 3, 1).unwrap(), "acg cgt gta tac ");
        assert_eq!(kmer_document("acgtac", 3, 2).unwrap(), "acg gta ");
        assert_eq!(kmer_document("acgtac", 6, 5).unwrap(), "acgtac ");
    }

    #[test]
    fn short_sequence_gives_empty_document() {
        assert_eq!(kmer_document("ac", 3, 1).unwrap(), "");
        assert_eq!(kmer_document("ac", 3, 1).unwrap(), "");
        assert_eq!(kmer_document("", 1, 1).unwrap(), "");
    }

    #[test]
    fn zero_window_or_step_fails() {
        assert!(matches!(
            kmer_document("acgt", 0, 1),
            Err(Error::InvalidParameter { name: "window", .. })
        ));
        assert!(matches!(
            kmer_document("acgt", 2, 0),
            Err(Error::InvalidParameter { name: "step", .. })
        ));
    }

    #[test]
    fn non_ascii_sequence_fails() {
        assert!(matches!(
            kmer_document("acgµacgt", 2, 1),
            Err(Error::InvalidSequence(_))
        ));
    }

    #[test]
    fn corpus_file_keeps_pairs() {
        let directory = tempfile::tempdir().unwrap();
        let input = directory.path().join("combined.txt");
        let output = directory.path().join(kmer_corpus_file_name(2));
        std::fs::write(&input, "sequence class\nacgt 1\nacgt 0\nt 2\n").unwrap();

        assert_eq!(create_kmer_corpus(&input, &output, 2, 1).unwrap(), 3);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "sequence,class\nac cg gt ,1\nac cg gt ,0\n,2\n"
        );

        let documents = read_kmer_corpus(&output).unwrap();
        assert_eq!(documents.len(), 3);
        assert_eq!(documents[1].class, 0);
        assert_eq!(documents[0].document, "ac cg gt ");
        assert_eq!(documents[2].document, "");
    }
}
