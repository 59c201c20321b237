use crate::align::sw::{local_align_with_buf, LocalAlignment, ScoringParams, SwBuffer};

/// Best candidate location seen so far for the read being mapped.
///
/// Candidates are offered one at a time with [`consider`](Self::consider);
/// only a strictly better score replaces the current best.
#[derive(Debug)]
pub struct BestMatch {
    params: ScoringParams,
    score: i32,
    location: Option<i64>,
    buf: SwBuffer,
}

impl BestMatch {
    pub fn new(params: ScoringParams) -> Self {
        Self { params, score: 0, location: None, buf: SwBuffer::new() }
    }

    /// Forgets the previous read.
    pub fn init(&mut self) {
        self.score = 0;
        self.location = None;
    }

    /// Aligns `read` against `window`, which starts at reference position
    /// `window_start`. Returns whether this candidate became the best.
    pub fn consider(&mut self, window: &[u8], read: &[u8], window_start: usize) -> bool {
        let aln = local_align_with_buf(read, window, self.params, &mut self.buf);
        self.offer(aln, window_start)
    }

    fn offer(&mut self, aln: LocalAlignment, window_start: usize) -> bool {
        if aln.score <= self.score {
            return false;
        }
        self.score = aln.score;
        // shift by the gaps the alignment found before its end cell
        self.location = Some(window_start as i64 + aln.end_col as i64 - aln.end_row as i64);
        true
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn location(&self) -> Option<i64> {
        self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let bm = BestMatch::new(ScoringParams::default());
        assert_eq!(bm.score(), 0);
        assert_eq!(bm.location(), None);
    }

    #[test]
    fn location_is_read_start() {
        let mut bm = BestMatch::new(ScoringParams::default());
        let window = b"TTTTTTGATTACAGATTACATTTTTT";
        assert!(bm.consider(window, b"GATTACAGATTACA", 1000));
        assert_eq!(bm.score(), 14);
        assert_eq!(bm.location(), Some(1006));
    }

    #[test]
    fn keeps_strictly_better_only() {
        let mut bm = BestMatch::new(ScoringParams::default());
        assert!(bm.consider(b"GATTACA", b"GATTACA", 50));
        // equal score elsewhere does not replace
        assert!(!bm.consider(b"GATTACA", b"GATTACA", 900));
        assert_eq!(bm.location(), Some(50));
        // a worse candidate does not either
        assert!(!bm.consider(b"GATTCCA", b"GATTACA", 10));
        assert_eq!(bm.location(), Some(50));
    }

    #[test]
    fn zero_score_is_never_recorded() {
        let mut bm = BestMatch::new(ScoringParams::default());
        assert!(!bm.consider(b"CCCC", b"AAAA", 7));
        assert_eq!(bm.location(), None);
    }

    #[test]
    fn init_resets() {
        let mut bm = BestMatch::new(ScoringParams::default());
        bm.consider(b"ACGT", b"ACGT", 3);
        bm.init();
        assert_eq!(bm.score(), 0);
        assert_eq!(bm.location(), None);
    }

    #[test]
    fn location_can_precede_window() {
        let mut bm = BestMatch::new(ScoringParams::default());
        // read overhangs the left edge of the window by two bases
        bm.consider(b"ACGTAC", b"TTACGTAC", 0);
        assert_eq!(bm.location(), Some(-2));
    }
}
