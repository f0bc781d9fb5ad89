//! Training sample table

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1, Axis};
use irrigis_core::composite::BandSchema;
use irrigis_core::{Error, Result};

/// Feature vectors of sampled pixels with their class labels.
///
/// One row per point; columns follow `schema`. Labels are never 0.
#[derive(Debug, Clone)]
pub struct TrainingSample {
    schema: BandSchema,
    features: Array2<f64>,
    labels: Vec<u8>,
    positions: Vec<(usize, usize)>,
}

impl TrainingSample {
    pub fn new(
        schema: BandSchema,
        features: Array2<f64>,
        labels: Vec<u8>,
        positions: Vec<(usize, usize)>,
    ) -> Result<Self> {
        let (n, width) = features.dim();
        if width != schema.len() {
            return Err(Error::SchemaMismatch {
                expected: schema.to_string(),
                actual: format!("{} feature columns", width),
            });
        }
        if labels.len() != n || positions.len() != n {
            return Err(Error::InvalidParameter {
                name: "sample",
                value: format!("{} rows, {} labels, {} positions", n, labels.len(), positions.len()),
                reason: "row counts differ".into(),
            });
        }
        if labels.iter().any(|&l| l == 0) {
            return Err(Error::InvalidParameter {
                name: "labels",
                value: "0".into(),
                reason: "training labels must be non-zero".into(),
            });
        }
        Ok(Self {
            schema,
            features,
            labels,
            positions,
        })
    }

    pub fn schema(&self) -> &BandSchema {
        &self.schema
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Pixel `(row, col)` of each point
    pub fn positions(&self) -> &[(usize, usize)] {
        &self.positions
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.features.row(i)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn width(&self) -> usize {
        self.features.ncols()
    }

    pub fn class_counts(&self) -> BTreeMap<u8, usize> {
        let mut counts = BTreeMap::new();
        for &l in &self.labels {
            *counts.entry(l).or_insert(0) += 1;
        }
        counts
    }

    /// Sorted distinct class codes
    pub fn classes(&self) -> Vec<u8> {
        self.class_counts().into_keys().collect()
    }

    /// Keep the rows where `keep` is true
    pub fn retain(&self, keep: &[bool]) -> Self {
        let idx: Vec<usize> = (0..self.len()).filter(|&i| keep[i]).collect();
        Self {
            schema: self.schema.clone(),
            features: self.features.select(Axis(0), &idx),
            labels: idx.iter().map(|&i| self.labels[i]).collect(),
            positions: idx.iter().map(|&i| self.positions[i]).collect(),
        }
    }
}
