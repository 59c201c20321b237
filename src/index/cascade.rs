use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{LayerSpec, MapperConfig};
use crate::index::layer::{BitFilterLayer, Layout};

/// Ordered Bloom-filter layers, layer 0 coarsest.
///
/// Sibling `i` of the group under filter `f` in layer `k` is filter
/// `f * bf_amount[k + 1] + i` of layer `k + 1`, and covers
/// `seed_range[k + 1]` positions starting at its parent's base plus
/// `i * seed_range[k + 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cascade {
    layers: Vec<BitFilterLayer>,
}

impl Cascade {
    /// Builds empty layers with hash factors drawn from `config.hash_seed`.
    pub fn new(config: &MapperConfig) -> Result<Self> {
        config.validate()?;
        Self::with_hash_factors(&config.layers, config.layout, &config.hash_factors())
    }

    pub fn with_hash_factors(specs: &[LayerSpec], layout: Layout, factors: &[u64]) -> Result<Self> {
        if specs.is_empty() {
            bail!("the cascade needs at least one layer");
        }
        if specs.len() != factors.len() {
            bail!("{} layers but {} hash factors", specs.len(), factors.len());
        }
        let layers = specs
            .iter()
            .zip(factors)
            .map(|(&spec, &factor)| BitFilterLayer::new(spec, layout, factor))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { layers })
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, k: usize) -> &BitFilterLayer {
        &self.layers[k]
    }

    pub fn layers(&self) -> &[BitFilterLayer] {
        &self.layers
    }

    #[inline]
    pub fn is_leaf(&self, k: usize) -> bool {
        k + 1 == self.layers.len()
    }

    /// Checks a deserialized cascade against the configuration it was saved with.
    pub fn check(&self, config: &MapperConfig) -> Result<()> {
        if self.layers.len() != config.layers.len() {
            bail!("cascade has {} layers but the configuration {}", self.layers.len(), config.layers.len());
        }
        for (k, (layer, spec)) in self.layers.iter().zip(&config.layers).enumerate() {
            if layer.spec() != spec {
                bail!("layer {}: geometry {:?} differs from configured {:?}", k, layer.spec(), spec);
            }
            if layer.layout() != config.layout {
                bail!("layer {}: layout {:?} differs from configured {:?}", k, layer.layout(), config.layout);
            }
            layer.check().map_err(|e| anyhow!("layer {}: {}", k, e))?;
        }
        Ok(())
    }

    /// Reference positions reachable from the root group.
    pub fn capacity(&self) -> usize {
        self.layers[0].spec().group_span()
    }

    pub fn memory_bytes(&self) -> usize {
        self.layers.iter().map(BitFilterLayer::memory_bytes).sum()
    }

    /// Inserts the seed ending at `position` into every layer.
    pub fn insert(&mut self, seed: u64, position: usize) {
        for layer in &mut self.layers {
            layer.insert(seed, position);
        }
    }

    /// Group index in layer `k + 1` below `sibling` of `group` in layer `k`.
    #[inline]
    pub fn child_group(&self, k: usize, group: usize, sibling: usize) -> usize {
        group * self.layers[k].spec().bf_amount + sibling
    }

    /// Dump paths: `<prefix>.layer<k>.<ext>`.
    pub fn dump_path(prefix: &Path, k: usize, ext: &str) -> PathBuf {
        let mut name = prefix.as_os_str().to_owned();
        name.push(format!(".layer{}.{}", k, ext));
        PathBuf::from(name)
    }

    pub fn write_bin(&self, prefix: &Path) -> Result<()> {
        for (k, layer) in self.layers.iter().enumerate() {
            layer.write_bin(&Self::dump_path(prefix, k, "dat"))?;
        }
        Ok(())
    }

    pub fn read_bin(&mut self, prefix: &Path) -> Result<()> {
        for (k, layer) in self.layers.iter_mut().enumerate() {
            layer.read_bin(&Self::dump_path(prefix, k, "dat"))?;
        }
        Ok(())
    }

    pub fn write_hex(&self, prefix: &Path) -> Result<()> {
        for (k, layer) in self.layers.iter().enumerate() {
            layer.write_hex(&Self::dump_path(prefix, k, "hex"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> MapperConfig {
        let mut cfg = MapperConfig::with_layers(vec![
            LayerSpec::new(1024, 4, 0, 256),
            LayerSpec::new(1024, 4, 0, 64),
        ]);
        cfg.seed_len = 8;
        cfg.read_len = 32;
        cfg
    }

    #[test]
    fn insert_reaches_every_layer_at_matching_coordinates() {
        let mut c = Cascade::new(&toy()).unwrap();
        let pos = 2 * 256 + 3 * 64 + 10;
        c.insert(0xBEEF, pos);

        let root: Vec<bool> = c.layer(0).query(0xBEEF, 0, false).collect();
        assert_eq!(root, vec![false, false, true, false]);

        let group = c.child_group(0, 0, 2);
        let offset = c.layer(1).group_offset(group);
        let leaf: Vec<bool> = c.layer(1).query(0xBEEF, offset, false).collect();
        assert_eq!(leaf, vec![false, false, false, true]);
    }

    #[test]
    fn check_against_config() {
        let cfg = toy();
        let c = Cascade::new(&cfg).unwrap();
        c.check(&cfg).unwrap();

        let mut other = cfg.clone();
        other.layers[1].bf_size = 2048;
        assert!(c.check(&other).is_err());

        let mut grouped = cfg.clone();
        grouped.layout = Layout::Grouped;
        assert!(c.check(&grouped).is_err());

        let mut shallow = cfg;
        shallow.layers.pop();
        assert!(c.check(&shallow).is_err());
    }

    #[test]
    fn capacity_is_root_span() {
        let c = Cascade::new(&toy()).unwrap();
        assert_eq!(c.capacity(), 1024);
        assert_eq!(c.depth(), 2);
        assert!(c.is_leaf(1));
        assert!(!c.is_leaf(0));
    }

    #[test]
    fn rejects_factor_count_mismatch() {
        let cfg = toy();
        assert!(Cascade::with_hash_factors(&cfg.layers, Layout::Grouped, &[1]).is_err());
    }

    #[test]
    fn false_positive_rate_is_bounded() {
        let mut c = Cascade::new(&toy()).unwrap();
        // 20 distinct seeds into a single 1024-bit leaf filter
        let spread = |i: u64| i.wrapping_mul(0x9e37_79b9_7f4a_7c15) >> 7;
        for i in 0..20u64 {
            c.insert(spread(i), 5);
        }
        let leaf = c.layer(1);
        let trials = 20_000u64;
        let false_hits = (1000..1000 + trials)
            .filter(|&i| leaf.query(spread(i), 0, false).next().unwrap_or(false))
            .count();
        // single hash: expected rate 1 - (1 - 1/1024)^20, about 2%
        let expected = 1.0 - (1.0 - 1.0 / 1024f64).powi(20);
        let rate = false_hits as f64 / trials as f64;
        assert!(rate <= expected * 3.0, "false positive rate {} vs expected {}", rate, expected);
    }

    #[test]
    fn dump_path_appends_layer_suffix() {
        let p = Cascade::dump_path(Path::new("/tmp/ref"), 2, "dat");
        assert_eq!(p, PathBuf::from("/tmp/ref.layer2.dat"));
    }
}
