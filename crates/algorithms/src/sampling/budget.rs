//! Per-class point budgets

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use irrigis_core::raster::Raster;
use irrigis_core::{Error, Result};

/// How many points each class receives
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuotaParams {
    /// Share of a class's labelled pixels to sample, in (0, 1]
    pub fraction: f64,
    pub min_points: usize,
    pub max_points: usize,
}

impl Default for QuotaParams {
    fn default() -> Self {
        Self {
            fraction: 0.2,
            min_points: 1000,
            max_points: 10000,
        }
    }
}

impl QuotaParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.fraction > 0.0 && self.fraction <= 1.0) {
            return Err(Error::InvalidParameter {
                name: "fraction",
                value: self.fraction.to_string(),
                reason: "must be in (0, 1]".into(),
            });
        }
        if self.min_points > self.max_points {
            return Err(Error::InvalidParameter {
                name: "min_points",
                value: self.min_points.to_string(),
                reason: format!("greater than max_points ({})", self.max_points),
            });
        }
        Ok(())
    }

    /// `clamp(round(count * fraction), min_points, max_points)`
    pub fn quota(&self, count: usize) -> usize {
        let raw = (count as f64 * self.fraction).round() as usize;
        raw.clamp(self.min_points, self.max_points)
    }
}

/// Labelled and eligible pixels per class code
pub fn class_pixel_counts(labels: &Raster<u8>, eligible: &Raster<u8>) -> Result<BTreeMap<u8, usize>> {
    labels.ensure_same_grid(eligible)?;
    let mut counts = BTreeMap::new();
    for (&label, &ok) in labels.data().iter().zip(eligible.data().iter()) {
        if label != 0 && ok != 0 {
            *counts.entry(label).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

/// Number of points to draw per class.
///
/// Quotas are derived per run and never persisted. A quota may exceed the
/// pixels available for its class, in which case every pixel is taken.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassPointBudget {
    quotas: BTreeMap<u8, usize>,
}

impl ClassPointBudget {
    pub fn from_counts(counts: &BTreeMap<u8, usize>, params: &QuotaParams) -> Result<Self> {
        params.validate()?;
        let quotas = counts
            .iter()
            .filter(|&(_, &count)| count > 0)
            .map(|(&class, &count)| (class, params.quota(count)))
            .collect();
        Ok(Self { quotas })
    }

    pub fn quota(&self, class: u8) -> usize {
        self.quotas.get(&class).copied().unwrap_or(0)
    }

    pub fn classes(&self) -> impl Iterator<Item = u8> + '_ {
        self.quotas.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, usize)> + '_ {
        self.quotas.iter().map(|(&c, &q)| (c, q))
    }

    pub fn total(&self) -> usize {
        self.quotas.values().sum()
    }

    pub fn len(&self) -> usize {
        self.quotas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_is_clamped() {
        let p = QuotaParams::default();
        assert_eq!(p.quota(100), 1000);
        assert_eq!(p.quota(1_000_000), 10000);
        assert_eq!(p.quota(20_000), 4000);
        // 0.2 * 12_345 = 2469
        assert_eq!(p.quota(12_345), 2469);
    }

    #[test]
    fn test_quota_rounds_to_nearest() {
        let p = QuotaParams {
            fraction: 0.2,
            min_points: 0,
            max_points: 100,
        };
        assert_eq!(p.quota(13), 3);
        assert_eq!(p.quota(12), 2);
        assert_eq!(p.quota(0), 0);
    }

    #[test]
    fn test_max_points_caps_large_class() {
        let params = QuotaParams {
            fraction: 0.2,
            min_points: 1000,
            max_points: 6000,
        };
        let counts = BTreeMap::from([(5u8, 40_000usize)]);
        let budget = ClassPointBudget::from_counts(&counts, &params).unwrap();
        assert_eq!(budget.quota(5), 6000);
        assert_eq!(budget.quota(3), 0);
    }

    #[test]
    fn test_quota_bounds_hold_for_any_count() {
        let p = QuotaParams::default();
        for count in (0..200_000).step_by(997) {
            let q = p.quota(count);
            assert!((p.min_points..=p.max_points).contains(&q));
        }
    }

    #[test]
    fn test_invalid_params() {
        let inverted = QuotaParams {
            min_points: 10,
            max_points: 5,
            ..QuotaParams::default()
        };
        assert!(matches!(inverted.validate(), Err(Error::InvalidParameter { .. })));
        for fraction in [0.0, -0.1, 1.5, f64::NAN] {
            let p = QuotaParams {
                fraction,
                ..QuotaParams::default()
            };
            assert!(p.validate().is_err());
        }
    }

    #[test]
    fn test_class_pixel_counts() {
        let labels = Raster::from_vec(vec![0u8, 1, 1, 5, 5, 5], 2, 3).unwrap();
        let eligible = Raster::from_vec(vec![1u8, 1, 0, 1, 1, 1], 2, 3).unwrap();
        let counts = class_pixel_counts(&labels, &eligible).unwrap();
        assert_eq!(counts, BTreeMap::from([(1, 1), (5, 3)]));
    }
}
