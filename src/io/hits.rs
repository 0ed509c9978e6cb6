use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::str::FromStr;

use anyhow::{anyhow, Result};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::OverlapError;
use crate::index::interval::Interval;
use crate::overlap::block::{HitBlock, ReadEnd, Strand};

/// Raw overlap output for one read, before rows are mapped to reads.
///
/// `<ordinal>\t<0|1>[\t<lower> <upper> <len> <diffs> <S|P> <+|->]*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitLine {
    pub ordinal: usize,
    pub is_substring: bool,
    pub blocks: Vec<HitBlock>,
}

impl fmt::Display for HitLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.ordinal, u8::from(self.is_substring))?;
        for b in &self.blocks {
            write!(f, "\t{}", b)?;
        }
        Ok(())
    }
}

fn field<T: FromStr>(tok: Option<&str>, what: &str, line: &str) -> Result<T, OverlapError> {
    tok.and_then(|t| t.parse().ok())
        .ok_or_else(|| OverlapError::HitFormat(format!("bad {} in '{}'", what, line)))
}

impl FromStr for HitBlock {
    type Err = OverlapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut it = s.split(' ');
        let lower: usize = field(it.next(), "lower bound", s)?;
        let upper: usize = field(it.next(), "upper bound", s)?;
        let overlap_len = field(it.next(), "overlap length", s)?;
        let num_diffs = field(it.next(), "difference count", s)?;
        let end = it
            .next()
            .and_then(ReadEnd::from_code)
            .ok_or_else(|| OverlapError::HitFormat(format!("bad read end in '{}'", s)))?;
        let strand = it
            .next()
            .and_then(Strand::from_code)
            .ok_or_else(|| OverlapError::HitFormat(format!("bad strand in '{}'", s)))?;
        if it.next().is_some() || lower >= upper {
            return Err(OverlapError::HitFormat(format!("bad block '{}'", s)));
        }
        Ok(HitBlock { interval: Interval::new(lower, upper), overlap_len, num_diffs, end, strand })
    }
}

impl FromStr for HitLine {
    type Err = OverlapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut it = s.split('\t');
        let ordinal = field(it.next(), "read ordinal", s)?;
        let is_substring = match it.next() {
            Some("0") => false,
            Some("1") => true,
            _ => return Err(OverlapError::HitFormat(format!("bad substring flag in '{}'", s))),
        };
        let blocks = it.map(HitBlock::from_str).collect::<Result<Vec<_>, _>>()?;
        Ok(HitLine { ordinal, is_substring, blocks })
    }
}

/// Gzip-compressed, append-only hit file owned by a single worker.
pub struct HitWriter {
    path: String,
    inner: GzEncoder<BufWriter<File>>,
}

impl HitWriter {
    pub fn create(path: &str) -> Result<Self> {
        let file = File::create(path).map_err(|e| anyhow!("cannot create hit file '{}': {}", path, e))?;
        Ok(Self { path: path.to_string(), inner: GzEncoder::new(BufWriter::new(file), Compression::default()) })
    }

    pub fn write_line(&mut self, line: &HitLine) -> Result<()> {
        writeln!(self.inner, "{}", line)?;
        Ok(())
    }

    /// Flushes the gzip trailer; returns the file path.
    pub fn finish(self) -> Result<String> {
        let mut buf = self.inner.finish()?;
        buf.flush()?;
        Ok(self.path)
    }
}

pub struct HitReader {
    lines: Lines<BufReader<MultiGzDecoder<File>>>,
}

impl HitReader {
    pub fn open(path: &str) -> Result<Self> {
        let file = File::open(path).map_err(|e| anyhow!("cannot open hit file '{}': {}", path, e))?;
        Ok(Self { lines: BufReader::new(MultiGzDecoder::new(file)).lines() })
    }
}

impl Iterator for HitReader {
    type Item = Result<HitLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(l) => l,
                Err(e) => return Some(Err(e.into())),
            };
            if line.is_empty() {
                continue;
            }
            return Some(line.parse::<HitLine>().map_err(Into::into));
        }
    }
}
