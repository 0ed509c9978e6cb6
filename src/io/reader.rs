use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{anyhow, Result};
use flate2::read::MultiGzDecoder;

use super::fasta::FastaReader;
use super::fastq::FastqReader;
use super::SeqRecord;

type DynBufRead = Box<dyn BufRead + Send>;

enum Format {
    Fasta(FastaReader<DynBufRead>),
    Fastq(FastqReader<DynBufRead>),
    Empty,
}

/// Reads FASTA or FASTQ, plain or gzip-compressed; the format is sniffed
/// from the first non-blank byte and the gzip magic.
pub struct SeqReader {
    format: Format,
}

impl SeqReader {
    pub fn open(path: &str) -> Result<Self> {
        let fh = File::open(path).map_err(|e| anyhow!("cannot open reads file '{}': {}", path, e))?;
        let mut buf = BufReader::new(fh);
        let gz = {
            let head = buf.fill_buf()?;
            head.len() >= 2 && head[0] == 0x1f && head[1] == 0x8b
        };
        let inner: DynBufRead = if gz {
            Box::new(BufReader::new(MultiGzDecoder::new(buf)))
        } else {
            Box::new(buf)
        };
        Self::from_reader(inner).map_err(|e| anyhow!("cannot read '{}': {}", path, e))
    }

    pub fn from_reader(mut reader: DynBufRead) -> Result<Self> {
        let format = match first_symbol(&mut reader)? {
            None => Format::Empty,
            Some(b'>') => Format::Fasta(FastaReader::new(reader)),
            Some(b'@') => Format::Fastq(FastqReader::new(reader)),
            Some(b) => return Err(anyhow!("unrecognised sequence format (first byte '{}')", b as char)),
        };
        Ok(Self { format })
    }

    pub fn next_record(&mut self) -> Result<Option<SeqRecord>> {
        match &mut self.format {
            Format::Fasta(r) => r.next_record(),
            Format::Fastq(r) => r.next_record(),
            Format::Empty => Ok(None),
        }
    }
}

impl Iterator for SeqReader {
    type Item = Result<SeqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Skips leading whitespace and returns the first remaining byte without consuming it.
fn first_symbol(reader: &mut DynBufRead) -> Result<Option<u8>> {
    loop {
        let (skip, first) = {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(None);
            }
            let skip = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            (skip, buf.get(skip).copied())
        };
        reader.consume(skip);
        if first.is_some() {
            return Ok(first);
        }
    }
}
