use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use flate2::write::GzEncoder;
use flate2::Compression;

/// `HT` record: parameters the graph was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRecord {
    pub error_rate: f64,
    pub min_overlap: usize,
    pub input_file: String,
    pub containments: bool,
    pub transitive: bool,
}

impl fmt::Display for HeaderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HT\tVN:i:1\tER:f:{}\tOL:i:{}\tIN:Z:{}\tCN:i:{}\tTE:i:{}",
            self.error_rate,
            self.min_overlap,
            self.input_file,
            u8::from(self.containments),
            u8::from(self.transitive)
        )
    }
}

/// `VT` record: one per input read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexRecord {
    pub id: String,
    pub seq: String,
    pub substring: bool,
}

impl fmt::Display for VertexRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VT\t{}\t{}\tSS:i:{}", self.id, self.seq, u8::from(self.substring))
    }
}

/// `ED` record. Coordinates are 0-based with inclusive ends; B's are on B's forward strand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
    pub ids: [String; 2],
    pub start: [usize; 2],
    pub end: [usize; 2],
    pub len: [usize; 2],
    pub reverse_complement: bool,
    pub num_diffs: usize,
    pub containment: bool,
}

impl fmt::Display for EdgeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ED\t{} {} {} {} {} {} {} {} {} {}\tCT:i:{}",
            self.ids[0],
            self.ids[1],
            self.start[0],
            self.end[0],
            self.len[0],
            self.start[1],
            self.end[1],
            self.len[1],
            u8::from(self.reverse_complement),
            self.num_diffs,
            u8::from(self.containment)
        )
    }
}

impl FromStr for EdgeRecord {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut cols = s.split('\t');
        if cols.next() != Some("ED") {
            bail!("not an edge record: '{}'", s);
        }
        let body: Vec<&str> = cols.next().unwrap_or("").split(' ').collect();
        if body.len() != 10 {
            bail!("edge record needs 10 fields: '{}'", s);
        }
        let num = |i: usize| -> Result<usize> {
            body[i].parse().map_err(|_| anyhow!("bad number '{}' in '{}'", body[i], s))
        };
        let flag = |v: &str| -> Result<bool> {
            match v {
                "0" => Ok(false),
                "1" => Ok(true),
                _ => Err(anyhow!("bad flag '{}' in '{}'", v, s)),
            }
        };
        let containment = match cols.next() {
            Some(tag) => flag(tag.strip_prefix("CT:i:").ok_or_else(|| anyhow!("bad tag '{}'", tag))?)?,
            None => false,
        };
        Ok(EdgeRecord {
            ids: [body[0].to_string(), body[1].to_string()],
            start: [num(2)?, num(5)?],
            end: [num(3)?, num(6)?],
            len: [num(4)?, num(7)?],
            reverse_complement: flag(body[8])?,
            num_diffs: num(9)?,
            containment,
        })
    }
}

/// Graph output; paths ending in `.gz` are gzip-compressed.
pub enum AsqgWriter {
    Plain(BufWriter<File>),
    Compressed(GzEncoder<BufWriter<File>>),
}

impl AsqgWriter {
    pub fn create(path: &str) -> Result<Self> {
        let file = File::create(path).map_err(|e| anyhow!("cannot create graph file '{}': {}", path, e))?;
        let buf = BufWriter::new(file);
        Ok(if path.ends_with(".gz") {
            AsqgWriter::Compressed(GzEncoder::new(buf, Compression::default()))
        } else {
            AsqgWriter::Plain(buf)
        })
    }

    fn out(&mut self) -> &mut dyn Write {
        match self {
            AsqgWriter::Plain(w) => w,
            AsqgWriter::Compressed(w) => w,
        }
    }

    pub fn write_header(&mut self, header: &HeaderRecord) -> Result<()> {
        writeln!(self.out(), "{}", header)?;
        Ok(())
    }

    pub fn write_vertex(&mut self, vertex: &VertexRecord) -> Result<()> {
        writeln!(self.out(), "{}", vertex)?;
        Ok(())
    }

    pub fn write_edge(&mut self, edge: &EdgeRecord) -> Result<()> {
        writeln!(self.out(), "{}", edge)?;
        Ok(())
    }

    pub fn finish(self) -> Result<()> {
        match self {
            AsqgWriter::Plain(mut w) => w.flush()?,
            AsqgWriter::Compressed(w) => w.finish()?.flush()?,
        }
        Ok(())
    }
}
