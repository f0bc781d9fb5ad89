//! Rule-based training label synthesis
//!
//! Threshold rules over composite bands mark pixels that are confidently
//! one land-cover class. The resulting patches, after removing the small
//! ones, become the training areas of the classifier.

mod presets;
mod rule;
mod synthesize;

pub use rule::{Comparison, Condition, Rule, RuleSet, TrainingClass};
pub use synthesize::{synthesize, ExclusionMasks, SynthesisParams, TrainingAreas, URBAN_FABRIC};
