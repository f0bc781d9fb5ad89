//! # irrigis parallel
//!
//! Tiled execution for reductions over large rasters.
//!
//! Region-wide reductions (area sums, stratified sampling) are split into
//! tiles that are processed in parallel with Rayon and merged in tile
//! order. The tile size bounds peak memory; it never changes results.

pub mod tiled;

pub use tiled::{Tile, TileIterator, TiledProcessor};
