use anyhow::{anyhow, bail, Result};
use std::collections::VecDeque;
use std::io::BufRead;

/// Line that closes the header block of a simulated-read file.
pub const HEADER_END: &str = "##Header End";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    Forward,
    Reverse,
}

/// One simulated read with the position it was drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlnRecord {
    pub ref_name: String,
    pub read_name: String,
    /// Known origin of the read in the reference.
    pub position: i64,
    pub strand: Strand,
    /// Error-free sequence as drawn from the reference.
    pub original: Vec<u8>,
    /// Sequence as the sequencer reported it.
    pub seq: Vec<u8>,
}

/// Reader for simulator output: a header block ended by [`HEADER_END`],
/// then records of six whitespace-separated fields
/// `ref_name read_name position strand original observed`.
pub struct AlnReader<R: BufRead> {
    reader: R,
    buf: String,
    tokens: VecDeque<String>,
    header_done: bool,
    line_no: usize,
}

impl<R: BufRead> AlnReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            tokens: VecDeque::new(),
            header_done: false,
            line_no: 0,
        }
    }

    fn skip_header(&mut self) -> Result<()> {
        loop {
            self.buf.clear();
            let n = self.reader.read_line(&mut self.buf)?;
            if n == 0 {
                bail!("read file ended before the '{}' line", HEADER_END);
            }
            self.line_no += 1;
            if self.buf.trim_end() == HEADER_END {
                self.header_done = true;
                return Ok(());
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<String>> {
        while self.tokens.is_empty() {
            self.buf.clear();
            let n = self.reader.read_line(&mut self.buf)?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            self.tokens.extend(self.buf.split_whitespace().map(str::to_string));
        }
        Ok(self.tokens.pop_front())
    }

    pub fn next_record(&mut self) -> Result<Option<AlnRecord>> {
        if !self.header_done {
            self.skip_header()?;
        }

        let ref_name = match self.next_token()? {
            Some(t) => t,
            None => return Ok(None),
        };
        let mut fields = Vec::with_capacity(5);
        for _ in 0..5 {
            match self.next_token()? {
                Some(t) => fields.push(t),
                None => bail!("truncated read record '{}' at line {}", ref_name, self.line_no),
            }
        }
        let mut fields = fields.into_iter();
        let read_name = fields.next().unwrap_or_default();
        let pos_s = fields.next().unwrap_or_default();
        let strand_s = fields.next().unwrap_or_default();
        let original = fields.next().unwrap_or_default().into_bytes();
        let seq = fields.next().unwrap_or_default().into_bytes();

        let position = pos_s
            .parse::<i64>()
            .map_err(|e| anyhow!("read '{}': bad position '{}': {}", read_name, pos_s, e))?;
        let strand = match strand_s.as_str() {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            other => bail!("read '{}': strand must be '+' or '-', got '{}'", read_name, other),
        };

        Ok(Some(AlnRecord { ref_name, read_name, position, strand, original, seq }))
    }
}

impl<R: BufRead> Iterator for AlnReader<R> {
    type Item = Result<AlnRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

pub fn open_aln(path: &str) -> Result<AlnReader<std::io::BufReader<std::fs::File>>> {
    let fh = std::fs::File::open(path)
        .map_err(|e| anyhow!("cannot open read file '{}': {}", path, e))?;
    Ok(AlnReader::new(std::io::BufReader::new(fh)))
}
