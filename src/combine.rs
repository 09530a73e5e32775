use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use log::info;

use crate::{error::Result, extract::sorted_files, labeled::CORPUS_HEADER};

/// Headers of already combined inputs are dropped, so combined corpora can be combined again.
pub fn combine_directory(
    input_directory: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<usize> {
    let input_directory = input_directory.as_ref();
    let output = output.as_ref();
    fs::create_dir_all(input_directory)?;
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    let inputs: Vec<_> = sorted_files(input_directory)?
        .into_iter()
        .filter(|file| !same_file(file, output))
        .collect();

    let mut writer = BufWriter::new(File::create(output)?);
    writeln!(writer, "{CORPUS_HEADER}")?;

    let mut records = 0;
    for input in &inputs {
        for line in BufReader::new(File::open(input)?).lines() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() || line == CORPUS_HEADER {
                continue;
            }
            writeln!(writer, "{line}")?;
            records += 1;
        }
    }
    writer.flush()?;

    info!(
        "Combined {records} records from {} files into {output:?}",
        inputs.len()
    );
    Ok(records)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeled::read_labeled_sequences;

    #[test]
    fn combines_in_name_order() {
        let directory = tempfile::tempdir().unwrap();
        let input = directory.path().join("sequences");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("b.txt"), "gggg 1\n").unwrap();
        fs::write(input.join("a.txt"), "acgt 0\ntttt 0\n").unwrap();

        let output = directory.path().join("combined").join("viruses.txt");
        assert_eq!(combine_directory(&input, &output).unwrap(), 3);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "sequence class\nacgt 0\ntttt 0\ngggg 1\n"
        );
    }

    #[test]
    fn combined_files_can_be_combined_again() {
        let directory = tempfile::tempdir().unwrap();
        let combined = directory.path().join("combined_data");
        fs::create_dir_all(&combined).unwrap();
        fs::write(combined.join("hosts.txt"), "sequence class\naaaa 3\n").unwrap();
        fs::write(combined.join("viruses.txt"), "sequence class\ncccc 0\n").unwrap();

        // The output lives inside the input directory and must not read itself.
        let output = combined.join("zz_all.txt");
        fs::write(&output, "sequence class\nstale 9\n").unwrap();

        assert_eq!(combine_directory(&combined, &output).unwrap(), 2);
        let sequences = read_labeled_sequences(&output).unwrap();
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].class, 3);
        assert_eq!(sequences[1].class, 0);
    }

    #[test]
    fn missing_input_directory_is_created() {
        let directory = tempfile::tempdir().unwrap();
        let input = directory.path().join("does_not_exist");
        let output = directory.path().join("out.txt");

        assert_eq!(combine_directory(&input, &output).unwrap(), 0);
        assert!(input.is_dir());
        assert_eq!(fs::read_to_string(&output).unwrap(), "sequence class\n");
    }
}
