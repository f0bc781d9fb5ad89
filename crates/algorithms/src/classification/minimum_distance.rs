//! Minimum distance to class centroids

use ndarray::{Array1, Array2};
use irrigis_core::composite::BandSchema;
use irrigis_core::Result;

use super::linalg::{invert, mean_of, quad_form, scatter};
use super::model::{Classifier, DistanceMetric, DistanceOutput};
use crate::sampling::TrainingSample;

/// Assigns the class whose centroid is nearest, either in plain Euclidean
/// distance or in Mahalanobis distance under the class covariance.
#[derive(Debug, Clone)]
pub struct MinimumDistance {
    schema: BandSchema,
    classes: Vec<u8>,
    centroids: Vec<Array1<f64>>,
    /// Inverse class covariances, Mahalanobis only
    inverse_covariances: Vec<Array2<f64>>,
    metric: DistanceMetric,
    output: DistanceOutput,
}

impl MinimumDistance {
    pub fn fit(sample: &TrainingSample, metric: DistanceMetric, output: DistanceOutput) -> Result<Self> {
        let classes = sample.classes();
        let x = sample.features();
        let mut centroids = Vec::with_capacity(classes.len());
        let mut inverse_covariances = Vec::new();
        for &class in &classes {
            let rows: Vec<usize> = (0..sample.len())
                .filter(|&i| sample.labels()[i] == class)
                .collect();
            let mean = mean_of(x, &rows);
            if metric == DistanceMetric::Mahalanobis {
                let dof = rows.len().saturating_sub(1).max(1) as f64;
                let cov = scatter(x, &rows, &mean) / dof;
                inverse_covariances.push(invert(&cov)?);
            }
            centroids.push(mean);
        }
        Ok(Self {
            schema: sample.schema().clone(),
            classes,
            centroids,
            inverse_covariances,
            metric,
            output,
        })
    }

    /// Index and distance of the nearest centroid
    fn nearest(&self, features: &[f64]) -> (usize, f64) {
        let v = Array1::from(features.to_vec());
        let mut best = (0, f64::INFINITY);
        for (k, centroid) in self.centroids.iter().enumerate() {
            let d = &v - centroid;
            let dist = match self.metric {
                DistanceMetric::Euclidean => d.dot(&d),
                DistanceMetric::Mahalanobis => quad_form(&self.inverse_covariances[k], d.view()),
            }
            .max(0.0)
            .sqrt();
            if dist < best.1 {
                best = (k, dist);
            }
        }
        best
    }
}

impl Classifier for MinimumDistance {
    fn name(&self) -> &'static str {
        "MinimumDistance"
    }

    fn schema(&self) -> &BandSchema {
        &self.schema
    }

    fn classes(&self) -> &[u8] {
        &self.classes
    }

    fn predict(&self, features: &[f64]) -> u8 {
        self.classes[self.nearest(features).0]
    }

    fn has_score(&self) -> bool {
        self.output == DistanceOutput::Continuous
    }

    /// Distance to the nearest centroid
    fn score(&self, features: &[f64]) -> Option<f64> {
        self.has_score().then(|| self.nearest(features).1)
    }
}
