//! Gaussian naive Bayes

use ndarray::Array2;
use irrigis_core::composite::BandSchema;
use irrigis_core::Result;

use super::linalg::mean_of;
use super::model::Classifier;
use crate::sampling::TrainingSample;

/// Variance floor, relative to the largest band variance
const VAR_SMOOTHING: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct NaiveBayes {
    schema: BandSchema,
    classes: Vec<u8>,
    log_priors: Vec<f64>,
    /// classes x bands
    means: Array2<f64>,
    variances: Array2<f64>,
}

impl NaiveBayes {
    pub fn fit(sample: &TrainingSample) -> Result<Self> {
        let classes = sample.classes();
        let x = sample.features();
        let p = sample.width();
        let n = sample.len() as f64;

        let mut means = Array2::<f64>::zeros((classes.len(), p));
        let mut variances = Array2::<f64>::zeros((classes.len(), p));
        let mut log_priors = Vec::with_capacity(classes.len());
        for (k, &class) in classes.iter().enumerate() {
            let rows: Vec<usize> = (0..sample.len())
                .filter(|&i| sample.labels()[i] == class)
                .collect();
            let mean = mean_of(x, &rows);
            for &r in &rows {
                for b in 0..p {
                    let d = x[(r, b)] - mean[b];
                    variances[(k, b)] += d * d;
                }
            }
            for b in 0..p {
                variances[(k, b)] /= rows.len() as f64;
            }
            means.row_mut(k).assign(&mean);
            log_priors.push((rows.len() as f64 / n).ln());
        }

        let floor = variances.iter().cloned().fold(0.0, f64::max).max(1.0) * VAR_SMOOTHING;
        variances.mapv_inplace(|v| v + floor);

        Ok(Self {
            schema: sample.schema().clone(),
            classes,
            log_priors,
            means,
            variances,
        })
    }

    fn log_likelihoods(&self, features: &[f64]) -> Vec<f64> {
        (0..self.classes.len())
            .map(|k| {
                let mut ll = self.log_priors[k];
                for (b, &v) in features.iter().enumerate() {
                    let var = self.variances[(k, b)];
                    let d = v - self.means[(k, b)];
                    ll -= 0.5 * ((2.0 * std::f64::consts::PI * var).ln() + d * d / var);
                }
                ll
            })
            .collect()
    }

    fn best(ll: &[f64]) -> usize {
        let mut best = 0;
        for (k, &v) in ll.iter().enumerate() {
            if v > ll[best] {
                best = k;
            }
        }
        best
    }
}

impl Classifier for NaiveBayes {
    fn name(&self) -> &'static str {
        "NaiveBayes"
    }

    fn schema(&self) -> &BandSchema {
        &self.schema
    }

    fn classes(&self) -> &[u8] {
        &self.classes
    }

    fn predict(&self, features: &[f64]) -> u8 {
        self.classes[Self::best(&self.log_likelihoods(features))]
    }

    fn has_score(&self) -> bool {
        true
    }

    /// Posterior probability of the predicted class
    fn score(&self, features: &[f64]) -> Option<f64> {
        let ll = self.log_likelihoods(features);
        let top = ll[Self::best(&ll)];
        let total: f64 = ll.iter().map(|v| (v - top).exp()).sum();
        Some(1.0 / total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::test_support::two_blobs;

    #[test]
    fn test_naive_bayes() {
        let nb = NaiveBayes::fit(&two_blobs(30)).unwrap();
        assert_eq!(nb.predict(&[0.5, 0.5]), 3);
        assert_eq!(nb.predict(&[5.5, 5.5]), 5);
        let p = nb.score(&[5.5, 5.5]).unwrap();
        assert!(p > 0.99 && p <= 1.0);
    }
}
