//! Multi-temporal feature composites
//!
//! Scenes are cloud masked, edge eroded and converted to spectral indices,
//! then each pixel's time series is reduced to per-period statistics. Slope
//! and the topographic wetness index are appended as static bands.

mod builder;
mod reducer;
mod scene;

pub use builder::{build_composite, CompositeRequest, TerrainInputs};
pub use reducer::reduce;
pub use scene::Scene;
