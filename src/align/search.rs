use crate::align::bml::BestMatch;
use crate::index::{BitFilterLayer, MapperIndex};
use crate::util::dna;
use crate::util::stats::mean_plus_stdev;

/// Per-sibling seed hit counts of one filter group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitCounts(Vec<u32>);

impl HitCounts {
    /// Queries every seed against the group at `hier_offset`.
    pub fn collect(layer: &BitFilterLayer, seeds: &[u64], hier_offset: usize, or_adjacent: bool) -> Self {
        let mut counts = vec![0u32; layer.spec().bf_amount];
        for &seed in seeds {
            for (c, hit) in counts.iter_mut().zip(layer.query(seed, hier_offset, or_adjacent)) {
                *c += hit as u32;
            }
        }
        Self(counts)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn max(&self) -> u32 {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// Siblings with at least `threshold` hits.
    pub fn at_least(&self, threshold: u32) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c >= threshold)
            .map(|(i, _)| i)
            .collect()
    }
}

impl From<Vec<u32>> for HitCounts {
    fn from(v: Vec<u32>) -> Self {
        Self(v)
    }
}

/// How a layer turns hit counts into an accept threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdPolicy {
    /// `min(mean + stdev, hit_threshold)`; tightens when background noise is high.
    Adaptive,
    /// `hit_threshold`, or the best count when nothing reaches it.
    FallbackToMax,
    Fixed,
}

impl ThresholdPolicy {
    /// Root layers adapt, intermediate layers fall back, the leaf is fixed.
    pub fn for_layer(k: usize, depth: usize) -> Self {
        let leaf = k + 1 == depth;
        match (k, leaf) {
            (0, false) => ThresholdPolicy::Adaptive,
            (_, false) => ThresholdPolicy::FallbackToMax,
            (_, true) => ThresholdPolicy::Fixed,
        }
    }

    /// Never below one: a filter without hits is not a candidate.
    pub fn threshold(self, hits: &HitCounts, hit_threshold: u32) -> u32 {
        let t = match self {
            ThresholdPolicy::Adaptive => mean_plus_stdev(hits.as_slice(), 1).min(hit_threshold),
            ThresholdPolicy::FallbackToMax => {
                let max = hits.max();
                if max < hit_threshold {
                    max
                } else {
                    hit_threshold
                }
            }
            ThresholdPolicy::Fixed => hit_threshold,
        };
        t.max(1)
    }
}

/// Result of searching one read through the cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    /// At least one leaf candidate reached the scorer.
    pub mapped: bool,
    /// The search stopped on a satellite check.
    pub satellite: bool,
}

impl SearchOutcome {
    pub const NOT_MAPPED: Self = Self { mapped: false, satellite: false };
    pub const SATELLITE: Self = Self { mapped: false, satellite: true };

    fn merge(&mut self, other: Self) {
        self.mapped |= other.mapped;
        self.satellite |= other.satellite;
    }
}

/// Coarse-to-fine search of one read. Scores of leaf candidates go to the
/// caller's [`BestMatch`].
pub struct CascadeSearch<'a> {
    index: &'a MapperIndex,
    read: &'a [u8],
    seeds: Vec<u64>,
    /// Siblings accepted so far on each layer, over every branch of this read.
    accepted: Vec<usize>,
    best: &'a mut BestMatch,
}

impl<'a> CascadeSearch<'a> {
    pub fn new(index: &'a MapperIndex, read: &'a [u8], best: &'a mut BestMatch) -> Self {
        let cfg = &index.config;
        let seeds = dna::seeds(read, cfg.seed_len)
            .step_by(cfg.query_shift)
            .map(|(_, s)| s)
            .collect();
        Self { index, read, seeds, accepted: vec![0; index.cascade.depth()], best }
    }

    /// Runs the search from the root group.
    pub fn run(mut self) -> SearchOutcome {
        if self.seeds.is_empty() {
            return SearchOutcome::NOT_MAPPED;
        }
        self.descend(0, 0, 0)
    }

    fn descend(&mut self, k: usize, group: usize, base: usize) -> SearchOutcome {
        let index = self.index;
        let cascade = &index.cascade;
        let cfg = &index.config;
        let layer = cascade.layer(k);
        let leaf = cascade.is_leaf(k);

        let hits = HitCounts::collect(layer, &self.seeds, layer.group_offset(group), leaf);
        log::trace!("layer {} group {}: {:?}", k, group, hits.as_slice());

        let threshold = ThresholdPolicy::for_layer(k, cascade.depth()).threshold(&hits, cfg.hit_threshold);
        let candidates = hits.at_least(threshold);

        if k > 0 {
            self.accepted[k] += candidates.len();
            if self.accepted[k] > cfg.satellite_threshold as usize {
                return SearchOutcome::SATELLITE;
            }
        }

        let range = layer.spec().seed_range;
        let mut out = SearchOutcome::NOT_MAPPED;
        for sibling in candidates {
            let start = base + sibling * range;
            if leaf {
                let window = index.window(start, 2 * range);
                if window.is_empty() {
                    continue;
                }
                self.best.consider(window, self.read, start);
                out.mapped = true;
            } else {
                out.merge(self.descend(k + 1, cascade.child_group(k, group, sibling), start));
                if out.satellite {
                    return out;
                }
            }
        }
        out
    }
}

/// Searches `read` and leaves its best location in `best`, which is reset first.
pub fn search_read(index: &MapperIndex, read: &[u8], best: &mut BestMatch) -> SearchOutcome {
    best.init();
    CascadeSearch::new(index, read, best).run()
}
