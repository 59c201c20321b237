use serde::{Deserialize, Serialize};

/// Additive scores of the alignment model; penalties are negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringParams {
    pub match_score: i32,
    pub mismatch_score: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self { match_score: 1, mismatch_score: -1, gap_open: -3, gap_extend: -2 }
    }
}

/// Best local alignment: its score and the cell where it ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LocalAlignment {
    pub score: i32,
    /// Index into the read.
    pub end_row: usize,
    /// Index into the reference window.
    pub end_col: usize,
}

/// 仿射间隙 Smith-Waterman 局部对齐（仅得分与终点，不回溯）
pub fn local_align(read: &[u8], window: &[u8], p: ScoringParams) -> LocalAlignment {
    local_align_with_buf(read, window, p, &mut SwBuffer::new())
}

/// Boundary score that keeps later read bases from starting at column 0.
pub const BOUNDARY_SCORE: i32 = -100;

/// 滚动行缓冲区，可跨调用复用
#[derive(Debug, Default)]
pub struct SwBuffer {
    align: Vec<i32>,
    insert: Vec<i32>,
    delete: Vec<i32>,
}

impl SwBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, size: usize) {
        for v in [&mut self.align, &mut self.insert, &mut self.delete] {
            v.clear();
            v.resize(size, 0);
        }
    }
}

/// Three-state local alignment over one rolling row per state.
///
/// `align` extends the diagonal predecessor's best state, `insert` consumes a
/// read base against a reference gap (from the cell above) and `delete`
/// consumes a reference base against a read gap (from the cell to the left).
/// Every state is floored at zero. The first cell, in row-major order, that
/// reaches the maximum is reported.
///
/// Only the first read base may open an alignment at window column 0: the
/// boundary column left of it scores [`BOUNDARY_SCORE`] for `align` and
/// `delete`, and a growing read gap for `insert`.
pub fn local_align_with_buf(read: &[u8], window: &[u8], p: ScoringParams, buf: &mut SwBuffer) -> LocalAlignment {
    let n = window.len();
    let mut best = LocalAlignment::default();
    if read.is_empty() || n == 0 {
        return best;
    }

    // index j + 1 holds column j; index 0 is the boundary column
    buf.reset(n + 1);
    let SwBuffer { align, insert, delete } = buf;

    for (i, &q) in read.iter().enumerate() {
        let (mut align_diag, mut insert_diag, mut delete_diag) = if i == 0 {
            (0, 0, 0)
        } else {
            (BOUNDARY_SCORE, p.gap_open + (i as i32 - 1) * p.gap_extend, BOUNDARY_SCORE)
        };
        align[0] = BOUNDARY_SCORE;
        insert[0] = p.gap_open + i as i32 * p.gap_extend;
        delete[0] = BOUNDARY_SCORE;

        for (j, &r) in window.iter().enumerate() {
            let subst = if q == r && q != b'N' { p.match_score } else { p.mismatch_score };

            let a = (align_diag.max(insert_diag).max(delete_diag) + subst).max(0);
            let ins = (align[j + 1] + p.gap_open).max(insert[j + 1] + p.gap_extend).max(0);
            let del = (align[j] + p.gap_open).max(delete[j] + p.gap_extend).max(0);

            let cell = a.max(ins).max(del);
            if cell > best.score {
                best = LocalAlignment { score: cell, end_row: i, end_col: j };
            }

            align_diag = align[j + 1];
            insert_diag = insert[j + 1];
            delete_diag = delete[j + 1];
            align[j + 1] = a;
            insert[j + 1] = ins;
            delete[j + 1] = del;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> ScoringParams {
        ScoringParams::default()
    }

    #[test]
    fn self_alignment_is_maximal() {
        let s = b"ACGTTGCAAGGCTTACGATC";
        let res = local_align(s, s, p());
        assert_eq!(res.score, s.len() as i32 * p().match_score);
        assert_eq!((res.end_row, res.end_col), (s.len() - 1, s.len() - 1));
    }

    #[test]
    fn single_substitution_costs_match_minus_mismatch() {
        let s = b"ACGTTGCAAGGCTTACGATC";
        let mut t = s.to_vec();
        t[10] = b'T';
        let res = local_align(&t, s, p());
        let self_score = s.len() as i32;
        assert_eq!(res.score, self_score - (p().match_score - p().mismatch_score));
        assert_eq!((res.end_row, res.end_col), (s.len() - 1, s.len() - 1));
    }

    #[test]
    fn disjoint_sequences_score_zero() {
        let res = local_align(b"AAAAAAAA", b"CCCCCCCC", p());
        assert_eq!(res, LocalAlignment::default());
    }

    #[test]
    fn n_never_matches() {
        assert_eq!(local_align(b"NNNN", b"NNNN", p()).score, 0);
    }

    #[test]
    fn read_inside_longer_window() {
        let window = b"TTTTTTGATTACAGATTACATTTTTT";
        let read = b"GATTACAGATTACA";
        let res = local_align(read, window, p());
        assert_eq!(res.score, 14);
        assert_eq!(res.end_row, 13);
        assert_eq!(res.end_col, 19);
        // start of the read in the window
        assert_eq!(res.end_col - res.end_row, 6);
    }

    #[test]
    fn deletion_in_read_shifts_end_column() {
        // read lacks the reference base at window index 12
        let window = b"ACGTTGCAAGGCATTACGATCGGA";
        let read = b"ACGTTGCAAGGCTTACGATCGGA";
        let res = local_align(read, window, p());
        assert_eq!((res.end_row, res.end_col), (read.len() - 1, window.len() - 1));
        // 23 matches, one gap opened
        assert_eq!(res.score, 23 + p().gap_open);
    }

    #[test]
    fn ties_keep_first_cell() {
        // "AC" occurs twice in the window, the first one wins
        let res = local_align(b"AC", b"ACGAC", p());
        assert_eq!(res, LocalAlignment { score: 2, end_row: 1, end_col: 1 });
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(local_align(b"", b"ACGT", p()).score, 0);
        assert_eq!(local_align(b"ACGT", b"", p()).score, 0);
    }

    #[test]
    fn later_read_bases_cannot_start_at_first_column() {
        // the read overhangs the window by one base; its ACGT tail may not
        // open at column 0, so the alignment loses the first match
        let res = local_align(b"TACGT", b"ACGT", p());
        assert_eq!(res, LocalAlignment { score: 3, end_row: 4, end_col: 3 });
        // the first read base still can
        assert_eq!(local_align(b"ACGTT", b"ACGT", p()).score, 4);
    }

    #[test]
    fn buffer_reuse() {
        let mut buf = SwBuffer::new();
        let r1 = local_align_with_buf(b"ACGT", b"ACGT", p(), &mut buf);
        assert_eq!(r1.score, 4);
        let r2 = local_align_with_buf(b"ACGT", b"TTTTTTTTACGT", p(), &mut buf);
        assert_eq!(r2, LocalAlignment { score: 4, end_row: 3, end_col: 11 });
    }
}
