//! Class-balanced sampling of training pixels
//!
//! - **budget**: per-class point quotas from labelled pixel counts
//! - **stratified**: seeded, tile-invariant sampling without replacement
//! - **outliers**: optional per-class z-score filter

mod budget;
mod outliers;
mod sample;
mod stratified;

pub use budget::{class_pixel_counts, ClassPointBudget, QuotaParams};
pub use outliers::remove_outliers;
pub use sample::TrainingSample;
pub use stratified::{stratified_sample, SamplingParams};
