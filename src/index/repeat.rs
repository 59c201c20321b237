use rustc_hash::FxHashMap;

use crate::util::dna;
use crate::util::stats::count_histogram;

/// Occurrence count of every seed of the reference.
#[derive(Debug, Default)]
pub struct RepeatCounter {
    counts: FxHashMap<u64, u32>,
}

impl RepeatCounter {
    /// Counting-only pass over the reference.
    pub fn count(reference: &[u8], seed_len: usize) -> Self {
        let mut counts = FxHashMap::default();
        for (pos, seed) in dna::seeds(reference, seed_len) {
            *counts.entry(seed).or_insert(0u32) += 1;
            if (pos + 1) % super::PROGRESS_INTERVAL == 0 {
                log::info!("counted seeds over {} bases", pos + 1);
            }
        }
        Self { counts }
    }

    pub fn get(&self, seed: u64) -> Option<u32> {
        self.counts.get(&seed).copied()
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// `(occurrences, number_of_seeds)` pairs, ascending.
    pub fn histogram(&self) -> Vec<(u32, usize)> {
        count_histogram(self.counts.values().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_overlapping_seeds() {
        let rc = RepeatCounter::count(b"AAAAAC", 3);
        assert_eq!(rc.get(dna::encode_seed(b"AAA").unwrap()), Some(3));
        assert_eq!(rc.get(dna::encode_seed(b"AAC").unwrap()), Some(1));
        assert_eq!(rc.get(dna::encode_seed(b"CCC").unwrap()), None);
        assert_eq!(rc.distinct(), 2);
    }

    #[test]
    fn histogram_of_counts() {
        let rc = RepeatCounter::count(b"AAAAAC", 3);
        assert_eq!(rc.histogram(), vec![(1, 1), (3, 1)]);
    }
}
