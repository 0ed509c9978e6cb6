pub mod dna;

use std::path::Path;

/// Default output prefix for a reads file: directory, gzip suffix and sequence extension stripped.
pub fn default_prefix(reads_file: &str) -> String {
    let name = Path::new(reads_file)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(reads_file);
    let stem = name.strip_suffix(".gz").unwrap_or(name);
    for ext in [".fasta", ".fastq", ".fa", ".fq", ".fna"] {
        if let Some(s) = stem.strip_suffix(ext) {
            return s.to_string();
        }
    }
    stem.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_strips_directory_and_extensions() {
        assert_eq!(default_prefix("data/reads.fa"), "reads");
        assert_eq!(default_prefix("/tmp/run1/reads.fastq.gz"), "reads");
        assert_eq!(default_prefix("reads.ec.fq"), "reads.ec");
        assert_eq!(default_prefix("reads"), "reads");
    }
}
