//! Per-pixel time-series reducers

use irrigis_core::composite::Statistic;

/// Reduce the observations of one pixel.
///
/// `sorted` must be ascending and free of NaN. An empty series gives NaN.
/// Percentiles interpolate linearly between order statistics and the
/// standard deviation is the population one.
pub fn reduce(sorted: &[f64], statistic: Statistic) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    match statistic {
        Statistic::Min => sorted[0],
        Statistic::Max => sorted[n - 1],
        Statistic::Mean => mean(sorted),
        Statistic::Median => percentile(sorted, 50.0),
        Statistic::Percentile(p) => percentile(sorted, f64::from(p)),
        Statistic::StdDev => {
            let m = mean(sorted);
            let var = sorted.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n as f64;
            var.sqrt()
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
