/// `floor(mean) + n * floor(stdev)` over `values` (population variance).
///
/// Both terms are truncated separately, so a flat profile never yields a
/// threshold above its own mean.
pub fn mean_plus_stdev(values: &[u32], n: u32) -> u32 {
    if values.is_empty() {
        return 0;
    }
    let len = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / len;
    let var = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / len;
    mean as u32 + n * var.sqrt() as u32
}

/// Histogram of occurrence counts: `(count, how_many_keys_have_it)`, ascending.
pub fn count_histogram<I: IntoIterator<Item = u32>>(counts: I) -> Vec<(u32, usize)> {
    let mut hist = std::collections::BTreeMap::new();
    for c in counts {
        *hist.entry(c).or_insert(0usize) += 1;
    }
    hist.into_iter().collect()
}
