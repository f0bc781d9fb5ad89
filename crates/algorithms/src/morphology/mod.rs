//! Connected-component morphology on categorical rasters
//!
//! - **Component size**: pixels in the same-valued component of each cell
//! - **Patch removal**: resets components smaller than a minimum size
//! - **Hole fill**: fills small background pockets from the surrounding codes

mod connected;
mod hole_fill;

pub use connected::{component_sizes, remove_small_patches, PatchFilter, PatchFilterParams};
pub use hole_fill::{fill_holes, HoleFill, HoleFillParams};
