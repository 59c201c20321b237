use anyhow::{anyhow, bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::align::sw::ScoringParams;
use crate::index::layer::{Layout, WORD_BITS};
use crate::util::dna::MAX_SEED_LEN;

/// Seed of the generator the per-layer hash factors are drawn from.
pub const DEFAULT_HASH_SEED: u64 = 666;

/// Geometry of one cascade layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Bits per Bloom filter; a power of two.
    pub bf_size: usize,
    /// Sibling filters under one parent filter.
    pub bf_amount: usize,
    /// Filters the layer holds over all parent contexts.
    pub bf_total: usize,
    /// Reference positions covered by one filter.
    pub seed_range: usize,
}

impl LayerSpec {
    pub fn new(bf_size: usize, bf_amount: usize, bf_total: usize, seed_range: usize) -> Self {
        Self { bf_size, bf_amount, bf_total, seed_range }
    }

    /// Positions covered by one group of `bf_amount` siblings.
    #[inline]
    pub fn group_span(&self) -> usize {
        self.seed_range * self.bf_amount
    }

    /// Bits occupied by one group of siblings.
    #[inline]
    pub fn group_bits(&self) -> usize {
        self.bf_size * self.bf_amount
    }

    pub fn memory_words(&self) -> usize {
        (self.bf_size / WORD_BITS) * self.bf_total
    }

    pub fn validate(&self) -> Result<()> {
        if !self.bf_size.is_power_of_two() || self.bf_size < WORD_BITS {
            bail!("bf_size {} must be a power of two >= {}", self.bf_size, WORD_BITS);
        }
        if self.bf_amount == 0 {
            bail!("bf_amount must be positive");
        }
        if self.seed_range == 0 {
            bail!("seed_range must be positive");
        }
        if self.bf_total < self.bf_amount || self.bf_total % self.bf_amount != 0 {
            bail!(
                "bf_total {} must be a positive multiple of bf_amount {}",
                self.bf_total,
                self.bf_amount
            );
        }
        Ok(())
    }
}

/// `SIZE:AMOUNT:RANGE[:TOTAL]`. A missing TOTAL is left as 0 and filled in by
/// [`MapperConfig::fill_layer_totals`].
impl FromStr for LayerSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.split(':').collect();
        if fields.len() != 3 && fields.len() != 4 {
            bail!("layer '{}' is not SIZE:AMOUNT:RANGE[:TOTAL]", s);
        }
        let num = |v: &str| -> Result<usize> {
            v.trim()
                .parse::<usize>()
                .map_err(|e| anyhow!("layer '{}': bad number '{}': {}", s, v, e))
        };
        Ok(Self {
            bf_size: num(fields[0])?,
            bf_amount: num(fields[1])?,
            seed_range: num(fields[2])?,
            bf_total: if fields.len() == 4 { num(fields[3])? } else { 0 },
        })
    }
}

/// Construction-time parameters of the mapper. Nothing here changes after
/// the index is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperConfig {
    pub read_len: usize,
    pub seed_len: usize,
    /// Step between queried read seeds.
    pub query_shift: usize,
    /// Seed hits a filter needs before it becomes a candidate.
    pub hit_threshold: u32,
    /// Largest `|mapped - known|` still counted as a correct mapping.
    pub answer_margin: u64,
    /// More accepted filters than this per layer makes a read a satellite.
    /// Also the occurrence cap when repetitive seeds are filtered.
    pub satellite_threshold: u32,
    pub layers: Vec<LayerSpec>,
    pub layout: Layout,
    pub hash_seed: u64,
    /// Count seeds first and keep the repetitive ones out of the filters.
    pub filter_repeats: bool,
    pub max_ref_len: Option<usize>,
    pub max_reads: Option<usize>,
    pub scoring: ScoringParams,
}

impl MapperConfig {
    /// Three 256-way layers sized for a human genome:
    /// 16 MiB filters over 256^3 bases, 64 KiB over 256^2, 256 B over 256.
    pub fn hg38() -> Self {
        Self::with_layers(vec![
            LayerSpec::new(16 * 1024 * 1024 * 8, 256, 256, 256 * 256 * 256),
            LayerSpec::new(64 * 1024 * 8, 256, 256 * 256, 256 * 256),
            LayerSpec::new(256 * 8, 256, 256 * 256 * 256, 256),
        ])
    }

    pub fn with_layers(layers: Vec<LayerSpec>) -> Self {
        let mut cfg = Self {
            read_len: 100,
            seed_len: 20,
            query_shift: 1,
            hit_threshold: 70,
            answer_margin: 20,
            satellite_threshold: 15,
            layers,
            layout: Layout::default(),
            hash_seed: DEFAULT_HASH_SEED,
            filter_repeats: false,
            max_ref_len: None,
            max_reads: None,
            scoring: ScoringParams::default(),
        };
        cfg.fill_layer_totals();
        cfg
    }

    /// Replaces zero `bf_total`s with the product of `bf_amount`s from the root.
    pub fn fill_layer_totals(&mut self) {
        let mut total = 1usize;
        for spec in &mut self.layers {
            total = total.saturating_mul(spec.bf_amount);
            if spec.bf_total == 0 {
                spec.bf_total = total;
            }
        }
    }

    /// Reference positions the root group can address.
    pub fn capacity(&self) -> usize {
        self.layers.first().map_or(0, LayerSpec::group_span)
    }

    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            bail!("the cascade needs at least one layer");
        }
        if self.seed_len == 0 || self.seed_len > MAX_SEED_LEN {
            bail!("seed length {} must be within 1..={}", self.seed_len, MAX_SEED_LEN);
        }
        if self.read_len < self.seed_len {
            bail!("read length {} is shorter than seed length {}", self.read_len, self.seed_len);
        }
        if self.query_shift == 0 {
            bail!("query shift must be positive");
        }
        if self.hit_threshold == 0 {
            bail!("hit threshold must be positive");
        }
        for (k, spec) in self.layers.iter().enumerate() {
            spec.validate().map_err(|e| anyhow!("layer {}: {}", k, e))?;
        }
        for (k, pair) in self.layers.windows(2).enumerate() {
            let (parent, child) = (&pair[0], &pair[1]);
            if parent.seed_range != child.group_span() {
                bail!(
                    "layer {}: seed_range {} must equal bf_amount * seed_range of layer {} ({})",
                    k,
                    parent.seed_range,
                    k + 1,
                    child.group_span()
                );
            }
            if child.bf_total < parent.bf_total.saturating_mul(child.bf_amount) {
                bail!(
                    "layer {}: bf_total {} cannot hold {} parents x {} siblings",
                    k + 1,
                    child.bf_total,
                    parent.bf_total,
                    child.bf_amount
                );
            }
        }
        Ok(())
    }

    /// One hash factor per layer, drawn from a generator seeded with `hash_seed`.
    pub fn hash_factors(&self) -> Vec<u64> {
        let mut rng = StdRng::seed_from_u64(self.hash_seed);
        self.layers.iter().map(|_| rng.gen::<u64>()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> MapperConfig {
        let mut cfg = MapperConfig::with_layers(vec![
            LayerSpec::new(1024, 4, 0, 256),
            LayerSpec::new(256, 4, 0, 64),
        ]);
        cfg.seed_len = 8;
        cfg.read_len = 32;
        cfg
    }

    #[test]
    fn hg38_preset_is_consistent() {
        let cfg = MapperConfig::hg38();
        cfg.validate().unwrap();
        assert_eq!(cfg.capacity(), 256 * 256 * 256 * 256);
        assert_eq!(cfg.layers[2].memory_words(), 64 * 256 * 256 * 256);
    }

    #[test]
    fn totals_are_derived() {
        let cfg = toy();
        assert_eq!(cfg.layers[0].bf_total, 4);
        assert_eq!(cfg.layers[1].bf_total, 16);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_non_power_of_two_size() {
        let mut cfg = toy();
        cfg.layers[1].bf_size = 300;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_mismatched_ranges() {
        let mut cfg = toy();
        cfg.layers[0].seed_range = 200;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_long_seed() {
        let mut cfg = toy();
        cfg.seed_len = 33;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parse_layer_spec() {
        let s: LayerSpec = "2048:256:256".parse().unwrap();
        assert_eq!(s, LayerSpec::new(2048, 256, 0, 256));
        let s: LayerSpec = "64:4:8:16".parse().unwrap();
        assert_eq!(s.bf_total, 16);
        assert!("64:4".parse::<LayerSpec>().is_err());
        assert!("64:x:4".parse::<LayerSpec>().is_err());
    }

    #[test]
    fn hash_factors_are_reproducible() {
        let cfg = toy();
        assert_eq!(cfg.hash_factors(), cfg.hash_factors());
        let mut other = toy();
        other.hash_seed = 1;
        assert_ne!(cfg.hash_factors(), other.hash_factors());
    }
}
