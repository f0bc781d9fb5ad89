//! Scene-level imagery processing
//!
//! - Spectral indices computed per observation
//! - Quality-band cloud masks and scene-edge erosion

mod indices;
mod quality;

pub use indices::{index_value, spectral_index, IndexParams};
pub use quality::{buffer_pixels, erode_footprint, is_clear, qa_clear_mask};
