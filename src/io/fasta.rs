use anyhow::{bail, Result};
use std::io::BufRead;

use super::SeqRecord;

enum Line {
    Eof,
    Header(String),
    Data,
}

/// Multi-line FASTA reader. Sequence lines are concatenated with whitespace removed.
pub struct FastaReader<R: BufRead> {
    reader: R,
    buf: String,
    pending: Option<String>,
    finished: bool,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), pending: None, finished: false }
    }

    /// Reads one line into `buf` and classifies it.
    fn advance(&mut self) -> Result<Line> {
        self.buf.clear();
        if self.reader.read_line(&mut self.buf)? == 0 {
            self.finished = true;
            return Ok(Line::Eof);
        }
        Ok(match self.buf.strip_prefix('>') {
            Some(rest) => Line::Header(rest.trim().to_string()),
            None => Line::Data,
        })
    }

    pub fn next_record(&mut self) -> Result<Option<SeqRecord>> {
        if self.finished {
            return Ok(None);
        }

        let header = match self.pending.take() {
            Some(h) => h,
            None => loop {
                match self.advance()? {
                    Line::Eof => return Ok(None),
                    Line::Header(h) => break h,
                    Line::Data if self.buf.trim().is_empty() => {}
                    Line::Data => bail!("FASTA sequence data before first header: '{}'", self.buf.trim()),
                }
            },
        };
        let (id, desc) = super::split_header(&header);

        let mut seq = Vec::new();
        loop {
            match self.advance()? {
                Line::Eof => break,
                Line::Header(next) => {
                    self.pending = Some(next);
                    break;
                }
                Line::Data => seq.extend(
                    self.buf.bytes().filter(|b| !b.is_ascii_whitespace()).map(|b| b.to_ascii_uppercase()),
                ),
            }
        }

        Ok(Some(SeqRecord { id, desc, seq }))
    }
}
