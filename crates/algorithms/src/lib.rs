//! # irrigis Algorithms
//!
//! Raster algorithms for mapping irrigated land from seasonal satellite
//! composites.
//!
//! ## Algorithm Categories
//!
//! - **terrain**: Slope and topographic wetness index
//! - **hydrology**: D8 flow direction and flow accumulation
//! - **imagery**: Spectral indices, QA cloud masks, footprint erosion
//! - **compositing**: Per-pixel temporal statistics into a feature composite
//! - **labels**: Rule-based training-area synthesis
//! - **morphology**: Connected components, patch filter, hole filling
//! - **sampling**: Class quotas, stratified sampling, outlier removal
//! - **classification**: Random forest, CART, naive Bayes, minimum distance, LDA
//! - **postprocess**: Ternary irrigated map, speckle and hole clean-up
//! - **fusion**: Summer/winter fusion into annual classes
//! - **validation**: Irrigated area and reference polygon agreement

pub mod classification;
pub mod compositing;
pub mod fusion;
pub mod hydrology;
pub mod imagery;
pub mod labels;
pub mod morphology;
pub mod postprocess;
pub mod sampling;
pub mod terrain;
pub mod validation;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{
        predict_raster, train, Classifier, ClassifierSpec, ClassifiedRaster, DisturbanceLayer,
        RandomForestParams,
    };
    pub use crate::compositing::{build_composite, CompositeRequest, Scene, TerrainInputs};
    pub use crate::fusion::{fuse, AnnualClass, SeasonalFusionRaster};
    pub use crate::hydrology::{flow_accumulation, flow_direction};
    pub use crate::labels::{synthesize, ExclusionMasks, RuleSet, SynthesisParams, TrainingAreas};
    pub use crate::morphology::{fill_holes, remove_small_patches};
    pub use crate::postprocess::{postprocess, IrrigatedAreaRaster, PostProcessParams};
    pub use crate::sampling::{
        remove_outliers, stratified_sample, ClassPointBudget, QuotaParams, SamplingParams,
        TrainingSample,
    };
    pub use crate::terrain::{slope, twi, SlopeParams, TwiParams};
    pub use crate::validation::{validate, validate_seasons, ValidationParams, ValidationScore};
    pub use irrigis_core::prelude::*;
}
