//! Feature composites and their typed band schema

mod band;
mod schema;
mod stack;

pub use band::{BandKey, Period, Reflectance, Source, SpectralIndex, StaticCovariate, Statistic};
pub use schema::BandSchema;
pub use stack::{AggregationMode, CompositeMetadata, FeatureComposite};
