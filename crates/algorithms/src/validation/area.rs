//! Irrigated surface in hectares

use irrigis_core::raster::Raster;
use irrigis_core::{Region, Result};
use irrigis_parallel::TiledProcessor;

/// Tile side at `tile_scale` 1
const BASE_TILE_SIZE: usize = 512;

const M2_PER_HA: f64 = 10_000.0;

/// Area in hectares of the non-zero cells of `mask` inside `region`.
///
/// Cells are counted per tile as integers and the per-row totals are
/// converted to area in row order, so `tile_scale` only changes the work
/// split and never the result. Geographic grids use the latitude of each
/// row to convert degrees to metres.
pub fn irrigated_area_ha(mask: &Raster<u8>, region: &Region, tile_scale: usize) -> Result<f64> {
    region.ensure_grid(mask)?;
    let (rows, cols) = mask.shape();
    let data = mask.data();

    let partials = TiledProcessor::with_scale(BASE_TILE_SIZE, tile_scale).map(rows, cols, |tile| {
        let mut counts = vec![0u64; tile.rows];
        for (row, col) in tile.cells() {
            if data[(row, col)] != 0 && region.contains(row, col) {
                counts[row - tile.row_offset] += 1;
            }
        }
        (tile.row_offset, counts)
    });

    let mut row_counts = vec![0u64; rows];
    for (row_offset, counts) in partials {
        for (i, count) in counts.into_iter().enumerate() {
            row_counts[row_offset + i] += count;
        }
    }

    let transform = mask.transform();
    let geographic = mask.is_geographic();
    let area_m2: f64 = row_counts
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count > 0)
        .map(|(row, &count)| count as f64 * transform.pixel_area_m2(row, geographic))
        .sum();

    Ok(area_m2 / M2_PER_HA)
}
