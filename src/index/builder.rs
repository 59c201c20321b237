use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

use crate::config::MapperConfig;
use crate::index::cascade::Cascade;
use crate::index::repeat::RepeatCounter;
use crate::index::PROGRESS_INTERVAL;
use crate::util::dna;

/// Provenance of a saved index.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub reference_file: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

/// 构建完成的索引：布隆过滤器级联 + 完整参考序列。
///
/// 构建后只读，可在多个线程间共享。
#[derive(Debug, Serialize, Deserialize)]
pub struct MapperIndex {
    pub config: MapperConfig,
    pub cascade: Cascade,
    /// Reference bases, upper-case ACGT with `N` for anything else.
    pub reference: Vec<u8>,
    pub meta: IndexMeta,
}

impl MapperIndex {
    pub fn build(config: MapperConfig, reference: Vec<u8>) -> Result<Self> {
        IndexBuilder::new(config)?.build(reference)
    }

    /// Reference bases `[start, start + len)`, clipped to the reference end.
    pub fn window(&self, start: usize, len: usize) -> &[u8] {
        let begin = start.min(self.reference.len());
        let end = start.saturating_add(len).min(self.reference.len());
        &self.reference[begin..end]
    }

    pub fn set_meta(&mut self, meta: IndexMeta) {
        self.meta = meta;
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let f = std::fs::File::create(path)?;
        bincode::serialize_into(std::io::BufWriter::new(f), self)?;
        Ok(())
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let f = std::fs::File::open(path)?;
        let idx: Self = bincode::deserialize_from(std::io::BufReader::new(f))?;
        idx.config.validate()?;
        idx.cascade.check(&idx.config)?;
        if idx.reference.len() > idx.cascade.capacity() {
            bail!(
                "snapshot reference has {} bases but the cascade addresses only {}",
                idx.reference.len(),
                idx.cascade.capacity()
            );
        }
        Ok(idx)
    }
}

/// Streams the reference into a fresh cascade.
pub struct IndexBuilder {
    config: MapperConfig,
}

impl IndexBuilder {
    pub fn new(config: MapperConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Inserts every seed of `reference` into every layer at the position of
    /// its last base. With `filter_repeats`, a counting pass runs first and
    /// seeds seen more than `satellite_threshold` times are left out.
    pub fn build(self, mut reference: Vec<u8>) -> Result<MapperIndex> {
        let config = self.config;
        if let Some(max) = config.max_ref_len {
            reference.truncate(max);
        }
        dna::normalize_seq_mut(&mut reference);

        let mut cascade = Cascade::new(&config)?;
        if reference.len() > cascade.capacity() {
            bail!(
                "reference has {} bases but the cascade addresses only {}",
                reference.len(),
                cascade.capacity()
            );
        }
        log::info!(
            "building {}-layer cascade ({} MiB of filters) over {} bases",
            cascade.depth(),
            cascade.memory_bytes() >> 20,
            reference.len()
        );

        let repeats = if config.filter_repeats {
            log::info!("counting seeds to leave repetitive ones out");
            let t = Instant::now();
            let rc = RepeatCounter::count(&reference, config.seed_len);
            log::info!("{} distinct seeds counted in {:.2?}", rc.distinct(), t.elapsed());
            if log::log_enabled!(log::Level::Debug) {
                for (occ, n) in rc.histogram() {
                    log::debug!("{}: {}", occ, n);
                }
            }
            Some(rc)
        } else {
            None
        };

        let t = Instant::now();
        let mut inserted = 0usize;
        let mut skipped = 0usize;
        for (pos, seed) in dna::seeds(&reference, config.seed_len) {
            if (pos + 1) % PROGRESS_INTERVAL == 0 {
                log::info!("processed {} bases", pos + 1);
            }
            if let Some(rc) = &repeats {
                let occ = rc
                    .get(seed)
                    .ok_or_else(|| anyhow!("seed {:#x} at {} missing from the seed counts", seed, pos))?;
                if occ > config.satellite_threshold {
                    skipped += 1;
                    continue;
                }
            }
            cascade.insert(seed, pos);
            inserted += 1;
        }
        log::info!(
            "inserted {} seeds, skipped {} repetitive, in {:.2?}",
            inserted,
            skipped,
            t.elapsed()
        );
        for (k, layer) in cascade.layers().iter().enumerate() {
            log::debug!("layer {} fill ratio {:.4}", k, layer.fill_ratio());
        }

        Ok(MapperIndex { config, cascade, reference, meta: IndexMeta::default() })
    }
}

/// Restores layer memories from `<prefix>.layer<k>.dat` instead of inserting.
pub fn load_from_dumps(config: MapperConfig, reference: &[u8], prefix: &Path) -> Result<MapperIndex> {
    let mut cascade = Cascade::new(&config)?;
    cascade.read_bin(prefix)?;
    let max = config.max_ref_len.unwrap_or(usize::MAX);
    let mut reference = reference[..reference.len().min(max)].to_vec();
    dna::normalize_seq_mut(&mut reference);
    if reference.len() > cascade.capacity() {
        bail!(
            "reference has {} bases but the cascade addresses only {}",
            reference.len(),
            cascade.capacity()
        );
    }
    Ok(MapperIndex { config, cascade, reference, meta: IndexMeta::default() })
}
