use anyhow::{anyhow, Result};
use rayon::prelude::*;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::align::bml::BestMatch;
use crate::align::search::search_read;
use crate::index::MapperIndex;
use crate::io::aln::{AlnRecord, Strand};
use crate::util::dna;

/// Reads between mapping progress messages.
pub const READ_PROGRESS_INTERVAL: usize = 1000;

/// Where the search left one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Candidates were scored; `location` is `None` when no alignment scored
    /// above zero.
    Mapped { location: Option<i64>, score: i32 },
    Satellite,
    NotMapped,
}

/// Verdict on a read whose origin is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Correct,
    Wrong,
    Satellite,
    NotMapped,
}

/// Maps one read. `best` is reset first and holds the best candidate after.
pub fn map_read(index: &MapperIndex, read: &[u8], best: &mut BestMatch) -> ReadOutcome {
    let read = dna::normalize_seq(read);
    let outcome = search_read(index, &read, best);
    if outcome.satellite {
        ReadOutcome::Satellite
    } else if outcome.mapped {
        ReadOutcome::Mapped { location: best.location(), score: best.score() }
    } else {
        ReadOutcome::NotMapped
    }
}

pub fn classify(outcome: ReadOutcome, known: i64, answer_margin: u64) -> Classification {
    match outcome {
        ReadOutcome::Satellite => Classification::Satellite,
        ReadOutcome::NotMapped => Classification::NotMapped,
        ReadOutcome::Mapped { location: Some(loc), .. } if loc.abs_diff(known) <= answer_margin => {
            Classification::Correct
        }
        ReadOutcome::Mapped { .. } => Classification::Wrong,
    }
}

/// Tally of read classifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scoreboard {
    pub correct: usize,
    pub wrong: usize,
    pub satellite: usize,
    pub not_mapped: usize,
}

impl Scoreboard {
    pub fn record(&mut self, c: Classification) {
        match c {
            Classification::Correct => self.correct += 1,
            Classification::Wrong => self.wrong += 1,
            Classification::Satellite => self.satellite += 1,
            Classification::NotMapped => self.not_mapped += 1,
        }
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.correct += other.correct;
        self.wrong += other.wrong;
        self.satellite += other.satellite;
        self.not_mapped += other.not_mapped;
        self
    }

    pub fn total(&self) -> usize {
        self.correct + self.wrong + self.satellite + self.not_mapped
    }
}

impl fmt::Display for Scoreboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Correctly mapped: {:>5}", self.correct)?;
        writeln!(f, "Wrongly mapped:   {:>5}", self.wrong)?;
        writeln!(f, "Satellite:        {:>5}", self.satellite)?;
        writeln!(f, "Not mapped:       {:>5}", self.not_mapped)?;
        write!(f, "Total:            {:>5}", self.total())
    }
}

/// Classifies every forward-strand record on a pool of `threads` workers.
/// The index is shared read-only; each worker owns its own [`BestMatch`].
pub fn map_records(index: &MapperIndex, records: &[AlnRecord], threads: usize) -> Result<Scoreboard> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| anyhow!("cannot start {} mapping threads: {}", threads, e))?;

    let cfg = &index.config;
    let done = AtomicUsize::new(0);
    let t = Instant::now();
    let board = pool.install(|| {
        records
            .par_iter()
            .filter(|rec| rec.strand == Strand::Forward)
            .map_init(
                || BestMatch::new(cfg.scoring),
                |best, rec| {
                    let outcome = map_read(index, &rec.seq, best);
                    let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                    if n % READ_PROGRESS_INTERVAL == 0 {
                        log::info!("processed {} reads", n);
                    }
                    classify(outcome, rec.position, cfg.answer_margin)
                },
            )
            .fold(Scoreboard::default, |mut board, c| {
                board.record(c);
                board
            })
            .reduce(Scoreboard::default, Scoreboard::merge)
    });
    log::info!("mapped {} reads in {:.2?}", board.total(), t.elapsed());
    Ok(board)
}

/// Reads forward-strand records, up to `max_reads` of them, then maps them.
pub fn map_aln_file(index: &MapperIndex, path: &str, threads: usize) -> Result<Scoreboard> {
    let reader = crate::io::aln::open_aln(path)?;
    let max = index.config.max_reads.unwrap_or(usize::MAX);
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for rec in reader {
        let rec = rec?;
        if rec.strand == Strand::Reverse {
            skipped += 1;
            continue;
        }
        records.push(rec);
        if records.len() >= max {
            break;
        }
    }
    log::info!("{} forward reads loaded, {} reverse reads skipped", records.len(), skipped);
    map_records(index, &records, threads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_within_margin() {
        let m = ReadOutcome::Mapped { location: Some(1010), score: 90 };
        assert_eq!(classify(m, 1000, 10), Classification::Correct);
        assert_eq!(classify(m, 1000, 9), Classification::Wrong);
        assert_eq!(classify(m, 1020, 10), Classification::Correct);
    }

    #[test]
    fn classify_other_outcomes() {
        assert_eq!(classify(ReadOutcome::Satellite, 5, 100), Classification::Satellite);
        assert_eq!(classify(ReadOutcome::NotMapped, 5, 100), Classification::NotMapped);
        let unscored = ReadOutcome::Mapped { location: None, score: 0 };
        assert_eq!(classify(unscored, 0, 100), Classification::Wrong);
    }

    #[test]
    fn scoreboard_tally_and_display() {
        let mut a = Scoreboard::default();
        a.record(Classification::Correct);
        a.record(Classification::Correct);
        a.record(Classification::NotMapped);
        let mut b = Scoreboard::default();
        b.record(Classification::Satellite);
        let total = a.merge(b);
        assert_eq!(total, Scoreboard { correct: 2, wrong: 0, satellite: 1, not_mapped: 1 });
        let text = total.to_string();
        assert!(text.starts_with("Correctly mapped:     2"));
        assert!(text.ends_with("Total:                4"));
    }
}
