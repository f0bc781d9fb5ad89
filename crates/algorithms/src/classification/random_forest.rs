//! Random forest

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use irrigis_core::composite::BandSchema;
use irrigis_core::{Error, Result};

use super::model::{Classifier, RandomForestParams};
use super::tree::{argmax, DecisionTree, TreeParams};
use crate::sampling::TrainingSample;

/// Bagged ensemble of CART trees voting by majority.
#[derive(Debug, Clone)]
pub struct RandomForest {
    schema: BandSchema,
    classes: Vec<u8>,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Grow `params.trees` trees in parallel.
    ///
    /// Tree `i` draws its bag and split features from a generator seeded
    /// with `seed + i`, so a forest is reproducible whatever the thread count.
    pub fn fit(sample: &TrainingSample, params: &RandomForestParams) -> Result<Self> {
        if params.trees == 0 {
            return Err(Error::InvalidParameter {
                name: "trees",
                value: "0".into(),
                reason: "a forest needs at least one tree".into(),
            });
        }
        if !(params.bag_fraction > 0.0 && params.bag_fraction <= 1.0) {
            return Err(Error::InvalidParameter {
                name: "bag_fraction",
                value: params.bag_fraction.to_string(),
                reason: "must be in (0, 1]".into(),
            });
        }

        let classes = sample.classes();
        let y: Vec<usize> = sample
            .labels()
            .iter()
            .map(|l| classes.binary_search(l).unwrap_or(0))
            .collect();
        let x = sample.features();
        let n = sample.len();
        let bag = ((n as f64 * params.bag_fraction).round() as usize).max(1);
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_leaf_population: params.min_leaf_population,
            features_per_split: Some(params.resolved_variables_per_split(sample.width())),
        };

        let trees: Vec<DecisionTree> = (0..params.trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let mut rows: Vec<usize> = (0..bag).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(x, &y, classes.len(), &mut rows, tree_params, &mut rng)
            })
            .collect();

        debug!(
            trees = trees.len(),
            samples = n,
            bag,
            classes = classes.len(),
            "random forest trained"
        );
        Ok(Self {
            schema: sample.schema().clone(),
            classes,
            trees,
        })
    }

    /// One unbagged tree over every row
    pub(crate) fn single_tree(sample: &TrainingSample, params: &RandomForestParams) -> Result<Self> {
        let classes = sample.classes();
        let y: Vec<usize> = sample
            .labels()
            .iter()
            .map(|l| classes.binary_search(l).unwrap_or(0))
            .collect();
        let mut rows: Vec<usize> = (0..sample.len()).collect();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let tree = DecisionTree::fit(
            sample.features(),
            &y,
            classes.len(),
            &mut rows,
            TreeParams {
                max_depth: params.max_depth,
                min_leaf_population: params.min_leaf_population,
                features_per_split: None,
            },
            &mut rng,
        );
        Ok(Self {
            schema: sample.schema().clone(),
            classes,
            trees: vec![tree],
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn votes(&self, features: &[f64]) -> Vec<usize> {
        let mut votes = vec![0usize; self.classes.len()];
        for tree in &self.trees {
            votes[tree.predict(features)] += 1;
        }
        votes
    }

    /// Share of trees voting for each class
    pub fn class_probabilities(&self, features: &[f64]) -> BTreeMap<u8, f64> {
        let total = self.trees.len() as f64;
        self.classes
            .iter()
            .zip(self.votes(features))
            .map(|(&class, v)| (class, v as f64 / total))
            .collect()
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &'static str {
        if self.trees.len() == 1 {
            "DecisionTree"
        } else {
            "RandomForest"
        }
    }

    fn schema(&self) -> &BandSchema {
        &self.schema
    }

    fn classes(&self) -> &[u8] {
        &self.classes
    }

    fn predict(&self, features: &[f64]) -> u8 {
        self.classes[argmax(&self.votes(features))]
    }

    fn has_score(&self) -> bool {
        true
    }

    /// Vote share of the winning class
    fn score(&self, features: &[f64]) -> Option<f64> {
        let votes = self.votes(features);
        Some(votes[argmax(&votes)] as f64 / self.trees.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::test_support::two_blobs;
    use approx::assert_relative_eq;

    #[test]
    fn test_forest_separates_blobs() {
        let sample = two_blobs(60);
        let params = RandomForestParams {
            trees: 25,
            min_leaf_population: 2,
            ..RandomForestParams::default()
        };
        let rf = RandomForest::fit(&sample, &params).unwrap();
        assert_eq!(rf.tree_count(), 25);
        assert_eq!(rf.classes(), &[3, 5]);
        assert_eq!(rf.predict(&[0.1, 0.2]), 3);
        assert_eq!(rf.predict(&[4.9, 5.1]), 5);

        let probs = rf.class_probabilities(&[4.9, 5.1]);
        assert_relative_eq!(probs.values().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(probs[&5] > 0.5);
    }

    #[test]
    fn test_forest_is_reproducible() {
        let sample = two_blobs(40);
        let params = RandomForestParams {
            trees: 10,
            min_leaf_population: 1,
            seed: 7,
            ..RandomForestParams::default()
        };
        let a = RandomForest::fit(&sample, &params).unwrap();
        let b = RandomForest::fit(&sample, &params).unwrap();
        for probe in [[2.4, 2.6], [2.6, 2.4], [1.0, 4.0]] {
            assert_eq!(a.class_probabilities(&probe), b.class_probabilities(&probe));
        }
    }

    #[test]
    fn test_invalid_params() {
        let sample = two_blobs(10);
        let zero = RandomForestParams {
            trees: 0,
            ..RandomForestParams::default()
        };
        assert!(RandomForest::fit(&sample, &zero).is_err());
        let bag = RandomForestParams {
            bag_fraction: 1.5,
            ..RandomForestParams::default()
        };
        assert!(RandomForest::fit(&sample, &bag).is_err());
    }
}
