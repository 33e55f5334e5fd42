/// Descriptive statistics of a non-empty sample of byte sizes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeSummary {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub stddev: f64,
    pub min: u64,
    pub max: u64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub total: u64,
}

impl SizeSummary {
    /// Summarize a sample; `None` when it is empty
    pub fn from_sizes(sizes: &[u64]) -> Option<Self> {
        let mut sorted = sizes.to_vec();
        sorted.sort_unstable();

        let (&min, &max) = (sorted.first()?, sorted.last()?);
        let count = sorted.len();
        let total: u64 = sorted.iter().sum();
        let mean = total as f64 / count as f64;
        let variance = sorted
            .iter()
            .map(|&size| {
                let delta = size as f64 - mean;
                delta * delta
            })
            .sum::<f64>()
            / count as f64;

        Some(SizeSummary {
            count,
            mean,
            stddev: variance.sqrt(),
            min,
            max,
            p25: percentile(&sorted, 0.25),
            p50: percentile(&sorted, 0.50),
            p75: percentile(&sorted, 0.75),
            total,
        })
    }
}

/// Percentile of sorted data, interpolating linearly between order statistics
fn percentile(sorted: &[u64], fraction: f64) -> f64 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return 0.0;
    };

    let rank = fraction.clamp(0.0, 1.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let (Some(&low), Some(&high)) = (sorted.get(lower), sorted.get(upper)) else {
        return 0.0;
    };

    low as f64 + (high as f64 - low as f64) * (rank - lower as f64)
}
