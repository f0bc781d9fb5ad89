//! Classifier trait, specifications and training entry point

use serde::{Deserialize, Serialize};
use irrigis_core::composite::BandSchema;
use irrigis_core::{Error, Result};

use super::lda::Lda;
use super::minimum_distance::MinimumDistance;
use super::naive_bayes::NaiveBayes;
use super::random_forest::RandomForest;
use crate::sampling::TrainingSample;

/// A trained per-pixel classifier.
///
/// Feature vectors passed to `predict` follow [`Classifier::schema`].
pub trait Classifier: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Bands the model was trained on, in column order
    fn schema(&self) -> &BandSchema;

    /// Class codes the model can output, sorted
    fn classes(&self) -> &[u8];

    fn predict(&self, features: &[f64]) -> u8;

    /// Whether [`Classifier::score`] returns values
    fn has_score(&self) -> bool {
        false
    }

    /// Continuous output attached to a prediction (vote share, posterior,
    /// distance or projection depending on the model)
    fn score(&self, _features: &[f64]) -> Option<f64> {
        None
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestParams {
    pub trees: usize,
    /// Features tried per split; `sqrt(bands)` when absent
    pub variables_per_split: Option<usize>,
    /// Share of the sample drawn (with replacement) for each tree
    pub bag_fraction: f64,
    pub min_leaf_population: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            trees: 500,
            variables_per_split: None,
            bag_fraction: 0.5,
            min_leaf_population: 10,
            max_depth: None,
            seed: 0,
        }
    }
}

impl RandomForestParams {
    /// Features per split for `bands` input bands
    pub fn resolved_variables_per_split(&self, bands: usize) -> usize {
        self.variables_per_split
            .unwrap_or_else(|| (bands as f64).sqrt().floor() as usize)
            .clamp(1, bands.max(1))
    }
}

/// Distance used by the minimum-distance classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Euclidean,
    #[default]
    Mahalanobis,
}

/// Output mode of the minimum-distance classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceOutput {
    /// Nearest class only
    Classification,
    /// Nearest class plus the distance to it
    #[default]
    Continuous,
}

/// Which classifier to train and with what settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    RandomForest(RandomForestParams),
    DecisionTree {
        #[serde(default)]
        max_depth: Option<usize>,
        #[serde(default = "one")]
        min_leaf_population: usize,
    },
    NaiveBayes,
    MinimumDistance {
        #[serde(default)]
        metric: DistanceMetric,
        #[serde(default)]
        output: DistanceOutput,
    },
    Lda {
        target_class: u8,
        /// Projection threshold; midpoint of the projected class means when absent
        #[serde(default)]
        threshold: Option<f64>,
    },
}

fn one() -> usize {
    1
}

impl Default for ClassifierSpec {
    fn default() -> Self {
        ClassifierSpec::RandomForest(RandomForestParams::default())
    }
}

impl ClassifierSpec {
    /// Model family name used in product paths
    pub fn model_name(&self) -> &'static str {
        match self {
            ClassifierSpec::RandomForest(_) => "random_forest",
            ClassifierSpec::DecisionTree { .. } => "decision_tree",
            ClassifierSpec::NaiveBayes => "naive_bayes",
            ClassifierSpec::MinimumDistance { .. } => "minimum_distance",
            ClassifierSpec::Lda { .. } => "lda",
        }
    }

    /// Compact hyperparameter tag, e.g. `500tr_3vps_50bf` for a forest
    pub fn hyper_tag(&self, bands: usize) -> String {
        match self {
            ClassifierSpec::RandomForest(p) => format!(
                "{}tr_{}vps_{}bf",
                p.trees,
                p.resolved_variables_per_split(bands),
                (p.bag_fraction * 100.0).round() as u32
            ),
            ClassifierSpec::DecisionTree {
                max_depth,
                min_leaf_population,
            } => match max_depth {
                Some(d) => format!("{}md_{}ml", d, min_leaf_population),
                None => format!("{}ml", min_leaf_population),
            },
            ClassifierSpec::NaiveBayes => "default".to_string(),
            ClassifierSpec::MinimumDistance { metric, .. } => match metric {
                DistanceMetric::Euclidean => "euclidean".to_string(),
                DistanceMetric::Mahalanobis => "mahalanobis".to_string(),
            },
            ClassifierSpec::Lda { target_class, .. } => format!("cl{}", target_class),
        }
    }
}

/// Fit the classifier described by `spec` on a training sample
pub fn train(spec: &ClassifierSpec, sample: &TrainingSample) -> Result<Box<dyn Classifier>> {
    if sample.is_empty() {
        return Err(Error::Algorithm("cannot train on an empty sample".into()));
    }
    let model: Box<dyn Classifier> = match spec {
        ClassifierSpec::RandomForest(params) => Box::new(RandomForest::fit(sample, params)?),
        ClassifierSpec::DecisionTree {
            max_depth,
            min_leaf_population,
        } => {
            let params = RandomForestParams {
                trees: 1,
                variables_per_split: Some(sample.width()),
                bag_fraction: 1.0,
                min_leaf_population: *min_leaf_population,
                max_depth: *max_depth,
                seed: 0,
            };
            Box::new(RandomForest::single_tree(sample, &params)?)
        }
        ClassifierSpec::NaiveBayes => Box::new(NaiveBayes::fit(sample)?),
        ClassifierSpec::MinimumDistance { metric, output } => {
            Box::new(MinimumDistance::fit(sample, *metric, *output)?)
        }
        ClassifierSpec::Lda {
            target_class,
            threshold,
        } => Box::new(Lda::fit(sample, *target_class, *threshold)?),
    };
    Ok(model)
}
