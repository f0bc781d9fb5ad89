//! Per-class z-score outlier filter

use std::collections::BTreeMap;

use tracing::debug;
use irrigis_core::{Error, Result};

use super::sample::TrainingSample;

/// Drop rows lying `z_limit` or more standard deviations from their class
/// mean in any band.
///
/// Means and (population) standard deviations are computed per class and
/// band. Bands with zero spread within a class never reject a row.
pub fn remove_outliers(sample: &TrainingSample, z_limit: f64) -> Result<TrainingSample> {
    if z_limit.is_nan() || z_limit <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "z_limit",
            value: z_limit.to_string(),
            reason: "must be positive".into(),
        });
    }
    let width = sample.width();
    let features = sample.features();

    // class -> (count, sum, sum of squares) per band
    let mut moments: BTreeMap<u8, (usize, Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for (i, &class) in sample.labels().iter().enumerate() {
        let entry = moments
            .entry(class)
            .or_insert_with(|| (0, vec![0.0; width], vec![0.0; width]));
        entry.0 += 1;
        for (b, &v) in features.row(i).iter().enumerate() {
            entry.1[b] += v;
            entry.2[b] += v * v;
        }
    }
    let stats: BTreeMap<u8, Vec<(f64, f64)>> = moments
        .into_iter()
        .map(|(class, (n, sum, sq))| {
            let n = n as f64;
            let per_band = sum
                .iter()
                .zip(&sq)
                .map(|(s, q)| {
                    let mean = s / n;
                    let var = (q / n - mean * mean).max(0.0);
                    (mean, var.sqrt())
                })
                .collect();
            (class, per_band)
        })
        .collect();

    let keep: Vec<bool> = sample
        .labels()
        .iter()
        .enumerate()
        .map(|(i, class)| {
            let band_stats = &stats[class];
            features
                .row(i)
                .iter()
                .zip(band_stats)
                .all(|(&v, &(mean, std))| std <= 0.0 || ((v - mean) / std).abs() < z_limit)
        })
        .collect();

    let filtered = sample.retain(&keep);
    debug!(
        before = sample.len(),
        after = filtered.len(),
        z_limit,
        "outliers removed"
    );
    Ok(filtered)
}
