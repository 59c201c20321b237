use anyhow::{anyhow, Result};
use std::io::BufRead;

#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

pub struct FastaReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    peek_header: Option<String>,
    started: bool,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            done: false,
            peek_header: None,
            started: false,
        }
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.done {
            return Ok(None);
        }

        let mut seq: Vec<u8> = Vec::new();

        // Find header line. Bases before the first header form a record with
        // an empty id.
        let header = if let Some(h) = self.peek_header.take() {
            h
        } else {
            loop {
                self.buf.clear();
                let n = self.reader.read_line(&mut self.buf)?;
                if n == 0 {
                    self.done = true;
                    return Ok(None);
                }
                if self.buf.starts_with('>') {
                    break self.buf[1..].trim().to_string();
                }
                if !self.started && !self.buf.trim().is_empty() {
                    push_bases(&mut seq, &self.buf);
                    break String::new();
                }
            }
        };
        self.started = true;

        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // Read sequence lines
        loop {
            self.buf.clear();
            let n = self.reader.read_line(&mut self.buf)?;
            if n == 0 {
                self.done = true;
                break;
            }
            if self.buf.starts_with('>') {
                self.peek_header = Some(self.buf[1..].trim().to_string());
                break;
            }
            push_bases(&mut seq, &self.buf);
        }

        Ok(Some(FastaRecord { id, desc, seq }))
    }
}

fn push_bases(seq: &mut Vec<u8>, line: &str) {
    for &b in line.as_bytes() {
        match b {
            b'\n' | b'\r' | b' ' | b'\t' => {}
            _ => seq.push(b.to_ascii_uppercase()),
        }
    }
}

/// Concatenates every record into one coordinate space, stopping after
/// `max_len` bases when given.
pub fn read_reference_from<R: BufRead>(reader: R, max_len: Option<usize>) -> Result<Vec<u8>> {
    let mut reader = FastaReader::new(reader);
    let mut text = Vec::new();
    let mut n_seqs = 0usize;
    while let Some(rec) = reader.next_record()? {
        n_seqs += 1;
        log::debug!("reference record '{}' ({} bases)", rec.id, rec.seq.len());
        text.extend_from_slice(&rec.seq);
        if let Some(max) = max_len {
            if text.len() >= max {
                text.truncate(max);
                break;
            }
        }
    }
    log::info!("read {} reference records, {} bases", n_seqs, text.len());
    Ok(text)
}

pub fn read_reference(path: &str, max_len: Option<usize>) -> Result<Vec<u8>> {
    let fh = std::fs::File::open(path)
        .map_err(|e| anyhow!("cannot open reference FASTA '{}': {}", path, e))?;
    let text = read_reference_from(std::io::BufReader::new(fh), max_len)?;
    if text.is_empty() {
        anyhow::bail!("FASTA file '{}' contains no bases", path);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_simple_fasta() {
        let data = b">chr1 first\nACgTNN\n>chr2\nAAA\n";
        let mut r = FastaReader::new(Cursor::new(&data[..]));

        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "chr1");
        assert_eq!(r1.desc.as_deref(), Some("first"));
        assert_eq!(r1.seq, b"ACGTNN");

        let r2 = r.next_record().unwrap().unwrap();
        assert_eq!(r2.id, "chr2");
        assert_eq!(r2.desc, None);
        assert_eq!(r2.seq, b"AAA");

        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn parse_fasta_with_crlf_and_whitespace() {
        let data = b">chr1 desc\r\nAC g t n\r\n acgt\r\n>chr2 \r\n N N N \r\n";
        let mut r = FastaReader::new(Cursor::new(&data[..]));

        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.seq, b"ACGTNACGT");
        let r2 = r.next_record().unwrap().unwrap();
        assert_eq!(r2.id, "chr2");
        assert_eq!(r2.seq, b"NNN");
        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn headerless_sequence_is_kept() {
        let data = b"\nACGT\nTT\n>chr2\nGG\n";
        let mut r = FastaReader::new(Cursor::new(&data[..]));

        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "");
        assert_eq!(r1.seq, b"ACGTTT");
        let r2 = r.next_record().unwrap().unwrap();
        assert_eq!(r2.seq, b"GG");
        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn reference_concatenates_records() {
        let data = b">a\nACGT\n>b\nGGCC\n";
        let text = read_reference_from(Cursor::new(&data[..]), None).unwrap();
        assert_eq!(text, b"ACGTGGCC");
        let text = read_reference_from(Cursor::new(&data[..]), Some(6)).unwrap();
        assert_eq!(text, b"ACGTGG");
    }
}
