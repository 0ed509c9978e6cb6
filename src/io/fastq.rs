use anyhow::{anyhow, Result};
use std::io::BufRead;

use super::SeqRecord;

/// Four-line FASTQ reader. Qualities are validated for length and then dropped;
/// overlap discovery only needs the bases.
pub struct FastqReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    line_no: usize,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), done: false, line_no: 0 }
    }

    fn read_line(&mut self) -> Result<usize> {
        self.buf.clear();
        let n = self.reader.read_line(&mut self.buf)?;
        if n > 0 { self.line_no += 1; }
        Ok(n)
    }

    pub fn next_record(&mut self) -> Result<Option<SeqRecord>> {
        if self.done { return Ok(None); }

        // header line starting with '@', blank lines between records are tolerated
        loop {
            if self.read_line()? == 0 { self.done = true; return Ok(None); }
            if !self.buf.trim().is_empty() { break; }
        }
        let header = self
            .buf
            .strip_prefix('@')
            .ok_or_else(|| anyhow!("FASTQ header not starting with '@' at line {}", self.line_no))?
            .trim_end()
            .to_string();
        let (id, desc) = super::split_header(&header);

        // sequence line
        if self.read_line()? == 0 { return Err(anyhow!("unexpected EOF after header of '{}'", id)); }
        let seq: Vec<u8> = self.buf.trim_end().bytes().map(|b| b.to_ascii_uppercase()).collect();

        // plus line
        if self.read_line()? == 0 || !self.buf.starts_with('+') {
            return Err(anyhow!("missing '+' line for '{}' at line {}", id, self.line_no));
        }

        // quality line
        if self.read_line()? == 0 { return Err(anyhow!("missing quality line for '{}'", id)); }
        let qual_len = self.buf.trim_end().len();
        if qual_len != seq.len() {
            return Err(anyhow!("seq/qual length mismatch for '{}' ({} vs {})", id, seq.len(), qual_len));
        }

        Ok(Some(SeqRecord { id, desc, seq }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_records_and_skip_blank_lines() {
        let data = b"@r1 lane1\nacgt\n+\nIIII\n\n@r2\nGG\n+r2\nII\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));

        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "r1");
        assert_eq!(r1.desc.as_deref(), Some("lane1"));
        assert_eq!(r1.seq, b"ACGT");

        let r2 = r.next_record().unwrap().unwrap();
        assert_eq!(r2.id, "r2");
        assert_eq!(r2.seq, b"GG");

        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn quality_length_mismatch_is_an_error() {
        let data = b"@r1\nACGT\n+\nIII\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));
        assert!(r.next_record().is_err());
    }

    #[test]
    fn truncated_record_is_an_error() {
        let data = b"@r1\nACGT\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));
        assert!(r.next_record().is_err());
    }
}
