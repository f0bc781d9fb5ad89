//! Two-class Fisher linear discriminant

use ndarray::Array1;
use irrigis_core::composite::BandSchema;
use irrigis_core::{Error, Result};

use super::linalg::{invert, mean_of, scatter};
use super::model::Classifier;
use crate::sampling::TrainingSample;

/// Projects pixels on the Fisher direction separating one target class
/// from all others and thresholds the projection.
///
/// Pixels projecting above the threshold get the target class, the others
/// the most frequent non-target class of the training sample.
#[derive(Debug, Clone)]
pub struct Lda {
    schema: BandSchema,
    classes: Vec<u8>,
    target: u8,
    other: u8,
    weights: Array1<f64>,
    threshold: f64,
}

impl Lda {
    pub fn fit(sample: &TrainingSample, target_class: u8, threshold: Option<f64>) -> Result<Self> {
        let (target_rows, other_rows): (Vec<usize>, Vec<usize>) =
            (0..sample.len()).partition(|&i| sample.labels()[i] == target_class);
        if target_rows.len() < 2 || other_rows.len() < 2 {
            return Err(Error::Algorithm(format!(
                "LDA needs at least two samples of class {} and of the other classes",
                target_class
            )));
        }

        let x = sample.features();
        let mean_t = mean_of(x, &target_rows);
        let mean_o = mean_of(x, &other_rows);
        let within = (scatter(x, &target_rows, &mean_t) + scatter(x, &other_rows, &mean_o))
            / (sample.len() - 2) as f64;
        let weights = invert(&within)?.dot(&(&mean_t - &mean_o));
        let threshold = threshold.unwrap_or_else(|| (weights.dot(&mean_t) + weights.dot(&mean_o)) / 2.0);

        let counts = sample.class_counts();
        let other = counts
            .iter()
            .filter(|&(&c, _)| c != target_class)
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&c, _)| c)
            .unwrap_or(0);

        let mut classes = vec![target_class, other];
        classes.sort_unstable();
        Ok(Self {
            schema: sample.schema().clone(),
            classes,
            target: target_class,
            other,
            weights,
            threshold,
        })
    }

    fn projection(&self, features: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(features)
            .map(|(w, v)| w * v)
            .sum::<f64>()
            - self.threshold
    }
}

impl Classifier for Lda {
    fn name(&self) -> &'static str {
        "LDA"
    }

    fn schema(&self) -> &BandSchema {
        &self.schema
    }

    fn classes(&self) -> &[u8] {
        &self.classes
    }

    fn predict(&self, features: &[f64]) -> u8 {
        if self.projection(features) > 0.0 {
            self.target
        } else {
            self.other
        }
    }

    fn has_score(&self) -> bool {
        true
    }

    /// Signed distance of the projection to the threshold
    fn score(&self, features: &[f64]) -> Option<f64> {
        Some(self.projection(features))
    }
}
