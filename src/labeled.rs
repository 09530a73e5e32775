//! Labeled sequences and their plain text file format.
//!
//! One record per line: the lowercase sequence, a single space and the class id.
//! Combined corpora carry an additional [`CORPUS_HEADER`] line.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use crate::error::{Error, Result};

pub const CORPUS_HEADER: &str = "sequence class";

pub fn is_valid_sequence(sequence: &str) -> bool {
    sequence.is_ascii() && !sequence.chars().any(char::is_whitespace)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSequence {
    pub sequence: String,
    pub class: usize,
}

impl LabeledSequence {
    /// Lowercases the sequence. Sequences must be ASCII without whitespace.
    pub fn new(sequence: &str, class: usize) -> Result<Self> {
        if !is_valid_sequence(sequence) {
            return Err(Error::InvalidSequence(sequence.to_string()));
        }

        Ok(Self {
            sequence: sequence.to_lowercase(),
            class,
        })
    }

    fn parse(line: &str, path: &Path, line_number: usize) -> Result<Self> {
        let malformed = || Error::MalformedLabeledLine {
            path: path.to_path_buf(),
            line: line_number,
            content: line.to_string(),
        };

        let (sequence, class) = line.rsplit_once(' ').ok_or_else(malformed)?;
        let class = class.trim().parse().map_err(|_| malformed())?;
        if !is_valid_sequence(sequence) {
            return Err(malformed());
        }

        Ok(Self {
            sequence: sequence.to_string(),
            class,
        })
    }
}

pub fn write_labeled_sequences(
    path: impl AsRef<Path>,
    sequences: &[LabeledSequence],
) -> Result<()> {
    let mut output = BufWriter::new(File::create(path)?);
    for labeled in sequences {
        writeln!(output, "{} {}", labeled.sequence, labeled.class)?;
    }
    output.flush()?;
    Ok(())
}

/// Header lines and empty lines are skipped, so both formats can be read.
pub fn read_labeled_sequences(path: impl AsRef<Path>) -> Result<Vec<LabeledSequence>> {
    let path = path.as_ref();
    let input = BufReader::new(File::open(path)?);

    let mut result = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line == CORPUS_HEADER {
            continue;
        }
        result.push(LabeledSequence::parse(line, path, index + 1)?);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_order() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("labeled.txt");
        let sequences = vec![
            LabeledSequence::new("ACGTN", 2).unwrap(),
            LabeledSequence::new("ttga", 0).unwrap(),
            LabeledSequence::new("acgtn", 2).unwrap(),
        ];

        write_labeled_sequences(&path, &sequences).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "acgtn 2\nttga 0\nacgtn 2\n"
        );
        assert_eq!(read_labeled_sequences(&path).unwrap(), sequences);
    }

    #[test]
    fn header_is_skipped() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("corpus.txt");
        std::fs::write(&path, "sequence class\nacg 1\n\nttt 0\n").unwrap();

        let sequences = read_labeled_sequences(&path).unwrap();
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].class, 1);
        assert_eq!(sequences[1].sequence, "ttt");
    }

    #[test]
    fn whitespace_in_sequence_is_rejected() {
        assert!(matches!(
            LabeledSequence::new("ac gt", 1),
            Err(Error::InvalidSequence(_))
        ));
    }

    #[test]
    fn non_ascii_sequence_is_rejected() {
        assert!(matches!(
            LabeledSequence::new("acgtå", 1),
            Err(Error::InvalidSequence(_))
        ));

        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("corpus.txt");
        std::fs::write(&path, "sequence class\nacgt 1\nacµt 0\n").unwrap();
        assert!(matches!(
            read_labeled_sequences(&path),
            Err(Error::MalformedLabeledLine { line: 3, .. })
        ));
    }

    #[test]
    fn malformed_line_names_position() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("broken.txt");
        std::fs::write(&path, "acgt 1\nacgt x\n").unwrap();

        match read_labeled_sequences(&path) {
            Err(Error::MalformedLabeledLine { line, content, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(content, "acgt x");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
