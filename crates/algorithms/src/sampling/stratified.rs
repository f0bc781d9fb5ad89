//! Seeded stratified sampling

use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use irrigis_core::composite::FeatureComposite;
use irrigis_core::{Error, Result};
use irrigis_parallel::TiledProcessor;

use super::budget::ClassPointBudget;
use super::outliers::remove_outliers;
use super::sample::TrainingSample;
use crate::labels::TrainingAreas;

/// Parameters of the sampler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingParams {
    pub seed: u64,
    /// Tile edge in pixels; changes execution granularity only
    pub tile_size: usize,
    pub remove_outliers: bool,
    /// Rows with any |z| at or above this are dropped
    pub z_limit: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            seed: 0,
            tile_size: 256,
            remove_outliers: false,
            z_limit: 3.0,
        }
    }
}

/// A sampling candidate, ordered by key then pixel index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    key: u64,
    index: usize,
}

/// splitmix64 finalizer over the seed and pixel index
#[inline]
fn pixel_key(seed: u64, index: usize) -> u64 {
    let mut z = seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Keep the `quota` smallest candidates
fn keep_smallest(candidates: &mut Vec<Candidate>, quota: usize) {
    if candidates.len() > quota {
        candidates.sort_unstable();
        candidates.truncate(quota);
    }
}

/// Draw up to `quota` points per class without replacement.
///
/// Candidates are labelled, eligible pixels with a complete feature vector.
/// Every pixel gets a pseudo-random key derived only from the seed and its
/// index; each class keeps its smallest keys. Tiles pick local candidates
/// that are merged afterwards, so the result does not depend on the tile
/// size.
pub fn stratified_sample(
    composite: &FeatureComposite,
    areas: &TrainingAreas,
    budget: &ClassPointBudget,
    params: &SamplingParams,
) -> Result<TrainingSample> {
    let labels = areas.labels();
    composite.template().ensure_same_grid(labels)?;
    if budget.is_empty() {
        return Err(Error::Algorithm("no labelled pixels to sample".into()));
    }

    let (rows, cols) = composite.shape();
    let eligible = areas.eligible().data();
    let label_data = labels.data();

    let per_tile: Vec<BTreeMap<u8, Vec<Candidate>>> =
        TiledProcessor::new(params.tile_size).map(rows, cols, |tile| {
            let mut local: BTreeMap<u8, Vec<Candidate>> = BTreeMap::new();
            let mut values = Vec::with_capacity(composite.band_count());
            for (r, c) in tile.cells() {
                let class = label_data[(r, c)];
                if class == 0 || eligible[(r, c)] == 0 || budget.quota(class) == 0 {
                    continue;
                }
                if !composite.pixel_into(r, c, &mut values) {
                    continue;
                }
                let index = r * cols + c;
                local.entry(class).or_default().push(Candidate {
                    key: pixel_key(params.seed, index),
                    index,
                });
            }
            for (class, candidates) in local.iter_mut() {
                keep_smallest(candidates, budget.quota(*class));
            }
            local
        });

    let mut merged: BTreeMap<u8, Vec<Candidate>> = BTreeMap::new();
    for tile in per_tile {
        for (class, candidates) in tile {
            merged.entry(class).or_default().extend(candidates);
        }
    }

    let mut picked: Vec<(u8, usize)> = Vec::with_capacity(budget.total());
    for (class, mut candidates) in merged {
        let quota = budget.quota(class);
        keep_smallest(&mut candidates, quota);
        debug!(class, quota, drawn = candidates.len(), "class sampled");
        candidates.sort_unstable_by_key(|c| c.index);
        picked.extend(candidates.into_iter().map(|c| (class, c.index)));
    }

    let width = composite.band_count();
    let mut features = Array2::<f64>::zeros((picked.len(), width));
    let mut values = Vec::with_capacity(width);
    let mut out_labels = Vec::with_capacity(picked.len());
    let mut positions = Vec::with_capacity(picked.len());
    for (i, &(class, index)) in picked.iter().enumerate() {
        let (r, c) = (index / cols, index % cols);
        composite.pixel_into(r, c, &mut values);
        for (dst, v) in features.row_mut(i).iter_mut().zip(&values) {
            *dst = *v;
        }
        out_labels.push(class);
        positions.push((r, c));
    }

    let sample = TrainingSample::new(composite.schema().clone(), features, out_labels, positions)?;
    if params.remove_outliers {
        remove_outliers(&sample, params.z_limit)
    } else {
        Ok(sample)
    }
}
