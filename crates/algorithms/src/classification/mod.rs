//! Supervised per-pixel classification
//!
//! - **Random forest** and single CART trees (Gini impurity)
//! - **Naive Bayes** with Gaussian class likelihoods
//! - **Minimum distance** to class centroids (Euclidean or Mahalanobis)
//! - **LDA**: two-class Fisher discriminant with a threshold
//!
//! Models are trained from a [`TrainingSample`](crate::sampling::TrainingSample)
//! and remember the band schema they were fitted on; inference refuses a
//! composite with a different schema.

mod lda;
mod linalg;
mod minimum_distance;
mod model;
mod naive_bayes;
mod predict;
mod random_forest;
mod tree;

pub use lda::Lda;
pub use minimum_distance::MinimumDistance;
pub use model::{
    train, Classifier, ClassifierSpec, DistanceMetric, DistanceOutput, RandomForestParams,
};
pub use naive_bayes::NaiveBayes;
pub use predict::{predict_raster, ClassifiedRaster, DisturbanceLayer, DISTURBED_CLASS};
pub use random_forest::RandomForest;

#[cfg(test)]
pub(crate) mod test_support {
    use irrigis_core::composite::{
        AggregationMode, BandKey, BandSchema, CompositeMetadata, FeatureComposite,
    };
    use irrigis_core::raster::Raster;
    use irrigis_core::sensor::Sensor;
    use irrigis_core::temporal::DateRange;
    use ndarray::Array2;

    use crate::sampling::TrainingSample;

    /// `n` points of class 3 in the unit square and `n` of class 5 around (5, 5)
    pub fn two_blobs(n: usize) -> TrainingSample {
        let mut values = Vec::with_capacity(4 * n);
        let mut labels = Vec::with_capacity(2 * n);
        for (class, offset) in [(3u8, 0.0), (5u8, 5.0)] {
            for i in 0..n {
                values.push(offset + (i % 7) as f64 / 7.0);
                values.push(offset + (i % 5) as f64 / 5.0);
                labels.push(class);
            }
        }
        let features = Array2::from_shape_vec((2 * n, 2), values).unwrap();
        let positions = (0..2 * n).map(|i| (i, 0)).collect();
        let schema = BandSchema::parse(&["NDVI_mean", "NDWI_mean"]).unwrap();
        TrainingSample::new(schema, features, labels, positions).unwrap()
    }

    /// 2 x 2 composite: (0, 0) near class 3, (1, 1) near class 5, (1, 0) missing
    pub fn blob_composite(year: i32) -> FeatureComposite {
        let ndvi = Raster::from_vec(vec![0.4, 0.5, f64::NAN, 5.4], 2, 2).unwrap();
        let ndwi = Raster::from_vec(vec![0.4, 0.5, 0.5, 5.4], 2, 2).unwrap();
        let metadata = CompositeMetadata {
            sensor: Sensor::Landsat,
            resolution_m: 30.0,
            date_range: DateRange::year(year).unwrap(),
            season: None,
            aggregation: AggregationMode::WholePeriod,
            region: "test".into(),
            scene_count: 1,
        };
        FeatureComposite::from_bands(
            metadata,
            vec![
                ("NDVI_mean".parse::<BandKey>().unwrap(), ndvi),
                ("NDWI_mean".parse::<BandKey>().unwrap(), ndwi),
            ],
        )
        .unwrap()
    }
}
