use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::config::LayerSpec;

/// Bits per memory word.
pub const WORD_BITS: usize = 32;

/// How the sibling filters of one group are laid out in memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// All bits of one filter are contiguous, filters are concatenated.
    Grouped,
    /// Bit `b` of every sibling is contiguous, so one query touches a single
    /// `bf_amount`-bit span.
    #[default]
    Interleaved,
}

impl Layout {
    /// Bit index of `(hier_offset, sibling, hash)` inside the layer memory.
    #[inline]
    pub fn bit_index(self, hier_offset: usize, sibling: usize, hash: usize, spec: &LayerSpec) -> usize {
        match self {
            Layout::Grouped => hier_offset + sibling * spec.bf_size + hash,
            Layout::Interleaved => hier_offset + hash * spec.bf_amount + sibling,
        }
    }
}

/// Splits a bit index into `(word, bit_in_word)`.
#[inline]
pub fn word_and_bit(bit: usize) -> (usize, u32) {
    (bit / WORD_BITS, (bit % WORD_BITS) as u32)
}

// bit 0 of a word is its most significant bit
#[inline]
fn bit_mask(bit_in_word: u32) -> u32 {
    1u32 << (WORD_BITS as u32 - 1 - bit_in_word)
}

/// 一层布隆过滤器：`bf_total` 个单哈希过滤器打包在同一块位内存中。
///
/// 每 `bf_amount` 个兄弟过滤器组成一组，对应上一层的一个过滤器；
/// 组在内存中的起点即层级偏移（hierarchical offset）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitFilterLayer {
    spec: LayerSpec,
    layout: Layout,
    hash_factor: u64,
    hash_mask: u64,
    memory: Vec<u32>,
}

impl BitFilterLayer {
    pub fn new(spec: LayerSpec, layout: Layout, hash_factor: u64) -> Result<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            layout,
            hash_factor,
            hash_mask: spec.bf_size as u64 - 1,
            memory: vec![0u32; spec.memory_words()],
        })
    }

    pub fn spec(&self) -> &LayerSpec {
        &self.spec
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn hash_factor(&self) -> u64 {
        self.hash_factor
    }

    pub fn memory(&self) -> &[u32] {
        &self.memory
    }

    pub fn memory_bytes(&self) -> usize {
        self.memory.len() * std::mem::size_of::<u32>()
    }

    /// Checks that a deserialized layer still agrees with its own geometry.
    pub fn check(&self) -> Result<()> {
        self.spec.validate()?;
        if self.memory.len() != self.spec.memory_words() {
            bail!(
                "layer memory holds {} words but its geometry needs {}",
                self.memory.len(),
                self.spec.memory_words()
            );
        }
        if self.hash_mask != self.spec.bf_size as u64 - 1 {
            bail!("hash mask {:#x} does not fit bf_size {}", self.hash_mask, self.spec.bf_size);
        }
        Ok(())
    }

    /// Number of sibling groups the layer can hold.
    pub fn groups(&self) -> usize {
        self.spec.bf_total / self.spec.bf_amount
    }

    /// Reference positions the layer can address.
    pub fn position_capacity(&self) -> usize {
        self.groups().saturating_mul(self.spec.group_span())
    }

    #[inline]
    pub fn hash(&self, seed: u64) -> usize {
        ((seed ^ self.hash_factor) & self.hash_mask) as usize
    }

    /// Memory offset, in bits, of sibling group `group`.
    #[inline]
    pub fn group_offset(&self, group: usize) -> usize {
        group * self.spec.group_bits()
    }

    /// `(hier_offset, sibling)` of the filter that owns reference `position`.
    #[inline]
    pub fn locate(&self, position: usize) -> (usize, usize) {
        let span = self.spec.group_span();
        let group = position / span;
        let sibling = (position % span) / self.spec.seed_range;
        (self.group_offset(group), sibling)
    }

    #[inline]
    fn address(&self, hier_offset: usize, sibling: usize, hash: usize) -> (usize, u32) {
        word_and_bit(self.layout.bit_index(hier_offset, sibling, hash, &self.spec))
    }

    #[inline]
    fn is_set(&self, hier_offset: usize, sibling: usize, hash: usize) -> bool {
        let (word, bit) = self.address(hier_offset, sibling, hash);
        self.memory[word] & bit_mask(bit) != 0
    }

    /// Records `seed` in the filter owning `position` (the seed's last base).
    pub fn insert(&mut self, seed: u64, position: usize) {
        debug_assert!(
            position < self.position_capacity(),
            "position {} outside layer capacity {}",
            position,
            self.position_capacity()
        );
        let hash = self.hash(seed);
        let (hier_offset, sibling) = self.locate(position);
        let (word, bit) = self.address(hier_offset, sibling, hash);
        self.memory[word] |= bit_mask(bit);
    }

    /// Membership of `seed` in every sibling of the group at `hier_offset`.
    ///
    /// With `or_adjacent`, sibling `i` also reports a hit when sibling `i + 1`
    /// holds the seed, so a read straddling two filters counts fully in the
    /// first one.
    pub fn query(&self, seed: u64, hier_offset: usize, or_adjacent: bool) -> impl Iterator<Item = bool> + '_ {
        let hash = self.hash(seed);
        let amount = self.spec.bf_amount;
        (0..amount).map(move |i| {
            self.is_set(hier_offset, i, hash)
                || (or_adjacent && i + 1 < amount && self.is_set(hier_offset, i + 1, hash))
        })
    }

    /// Count of set bits, for fill-ratio reporting.
    pub fn count_ones(&self) -> u64 {
        self.memory.iter().map(|w| w.count_ones() as u64).sum()
    }

    pub fn fill_ratio(&self) -> f64 {
        let bits = (self.memory.len() * WORD_BITS) as f64;
        if bits == 0.0 {
            0.0
        } else {
            self.count_ones() as f64 / bits
        }
    }

    /// Dumps the memory word by word in native byte order, without header.
    pub fn write_bin_to<W: Write>(&self, mut w: W) -> Result<()> {
        for word in &self.memory {
            w.write_all(&word.to_ne_bytes())?;
        }
        w.flush()?;
        Ok(())
    }

    /// Restores a dump written by [`write_bin_to`](Self::write_bin_to) for a
    /// layer of the same geometry.
    pub fn read_bin_from<R: Read>(&mut self, mut r: R) -> Result<()> {
        let mut bytes = Vec::with_capacity(self.memory_bytes());
        r.read_to_end(&mut bytes)?;
        if bytes.len() != self.memory_bytes() {
            bail!(
                "filter dump holds {} bytes but the layer needs {}",
                bytes.len(),
                self.memory_bytes()
            );
        }
        for (word, chunk) in self.memory.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(())
    }

    /// Eight hex digits per word, sixteen words per line.
    pub fn write_hex_to<W: Write>(&self, mut w: W) -> Result<()> {
        for (i, word) in self.memory.iter().enumerate() {
            write!(w, "{:08x}", word)?;
            if i % 16 == 15 {
                writeln!(w)?;
            }
        }
        w.flush()?;
        Ok(())
    }

    pub fn write_bin(&self, path: &Path) -> Result<()> {
        let f = std::fs::File::create(path)
            .map_err(|e| anyhow!("cannot create filter dump '{}': {}", path.display(), e))?;
        log::info!("writing Bloom filter content to {}", path.display());
        self.write_bin_to(BufWriter::new(f))
    }

    pub fn read_bin(&mut self, path: &Path) -> Result<()> {
        let f = std::fs::File::open(path)
            .map_err(|e| anyhow!("cannot open filter dump '{}': {}", path.display(), e))?;
        log::info!("reading Bloom filter content from {}", path.display());
        self.read_bin_from(std::io::BufReader::new(f))
            .map_err(|e| anyhow!("'{}': {}", path.display(), e))
    }

    pub fn write_hex(&self, path: &Path) -> Result<()> {
        let f = std::fs::File::create(path)
            .map_err(|e| anyhow!("cannot create hex dump '{}': {}", path.display(), e))?;
        log::info!("writing Bloom filter hex dump to {}", path.display());
        self.write_hex_to(BufWriter::new(f))
    }
}
