/// Bits used per encoded base.
pub const BITS_PER_BASE: u32 = 2;

/// Longest seed that still fits in a `u64`.
pub const MAX_SEED_LEN: usize = 32;

/// 2-bit code of a base: A=0, C=1, G=2, T=3. Anything else has no code.
#[inline]
pub fn encode_base(b: u8) -> Option<u64> {
    match b {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

/// Upper-cases ACGT and turns every other byte into `N`, in place.
pub fn normalize_seq_mut(seq: &mut [u8]) {
    for b in seq.iter_mut() {
        *b = match b.to_ascii_uppercase() {
            up @ (b'A' | b'C' | b'G' | b'T') => up,
            _ => b'N',
        };
    }
}

/// Owned copy of `seq` normalized by [`normalize_seq_mut`], keeping positions.
pub fn normalize_seq(seq: &[u8]) -> Vec<u8> {
    let mut out = seq.to_vec();
    normalize_seq_mut(&mut out);
    out
}

/// Mask selecting the low `2 * seed_len` bits.
#[inline]
pub fn seed_mask(seed_len: usize) -> u64 {
    debug_assert!(seed_len >= 1 && seed_len <= MAX_SEED_LEN);
    if seed_len >= MAX_SEED_LEN {
        u64::MAX
    } else {
        (1u64 << (BITS_PER_BASE as usize * seed_len)) - 1
    }
}

/// Encodes a whole slice as one seed. Returns `None` if any base has no code.
pub fn encode_seed(bases: &[u8]) -> Option<u64> {
    let mut seed = 0u64;
    for &b in bases {
        seed = (seed << BITS_PER_BASE) | encode_base(b)?;
    }
    Some(seed & seed_mask(bases.len().clamp(1, MAX_SEED_LEN)))
}

/// Rolling 2-bit seed over a base stream.
///
/// A base outside `{A,C,G,T}` breaks the window: no seed is produced until
/// `seed_len` valid bases have been pushed again.
#[derive(Debug, Clone)]
pub struct SeedWindow {
    seed: u64,
    mask: u64,
    seed_len: usize,
    valid: usize,
}

impl SeedWindow {
    pub fn new(seed_len: usize) -> Self {
        Self { seed: 0, mask: seed_mask(seed_len), seed_len, valid: 0 }
    }

    /// Pushes one base; returns the seed ending at this base once it is full.
    #[inline]
    pub fn push(&mut self, base: u8) -> Option<u64> {
        match encode_base(base) {
            Some(code) => {
                self.seed = ((self.seed << BITS_PER_BASE) | code) & self.mask;
                if self.valid < self.seed_len {
                    self.valid += 1;
                }
                (self.valid == self.seed_len).then_some(self.seed)
            }
            None => {
                self.reset();
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.seed = 0;
        self.valid = 0;
    }
}

/// Every seed of `seq` as `(index_of_last_base, seed)`.
pub fn seeds(seq: &[u8], seed_len: usize) -> impl Iterator<Item = (usize, u64)> + '_ {
    let mut window = SeedWindow::new(seed_len);
    seq.iter()
        .enumerate()
        .filter_map(move |(i, &b)| window.push(b).map(|s| (i, s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_case_insensitive() {
        assert_eq!(encode_base(b'a'), Some(0));
        assert_eq!(encode_base(b'T'), Some(3));
        assert_eq!(encode_base(b'N'), None);
    }

    #[test]
    fn window_emits_after_seed_len_bases() {
        let got: Vec<_> = seeds(b"ACGTA", 3).collect();
        // ACG = 0b00_01_10, CGT = 0b01_10_11, GTA = 0b10_11_00
        assert_eq!(got, vec![(2, 0b000110), (3, 0b011011), (4, 0b101100)]);
    }

    #[test]
    fn window_matches_encode_seed() {
        let seq = b"GATTACAGATTACA";
        for (end, s) in seeds(seq, 5) {
            assert_eq!(Some(s), encode_seed(&seq[end + 1 - 5..=end]));
        }
    }

    #[test]
    fn non_acgt_breaks_window() {
        let got: Vec<_> = seeds(b"ACNGTA", 2).collect();
        assert_eq!(got.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![1, 4, 5]);
    }

    #[test]
    fn full_width_seed_mask() {
        assert_eq!(seed_mask(32), u64::MAX);
        assert_eq!(seed_mask(1), 0b11);
    }

    #[test]
    fn normalize_keeps_positions() {
        assert_eq!(normalize_seq(b"acgRt"), b"ACGNT");
    }

    #[test]
    fn normalize_in_place() {
        let mut seq = b"nAc-gT*".to_vec();
        normalize_seq_mut(&mut seq);
        assert_eq!(seq, b"NACNGTN");
    }
}
