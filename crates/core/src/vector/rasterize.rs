//! Burning polygons into grid cells

use crate::raster::GeoTransform;
use geo::{BoundingRect, Contains};
use geo_types::{Point, Polygon};

/// Cells of a `rows` x `cols` grid whose center lies inside `polygon`.
///
/// Cells are returned in row-major order. Polygons outside the grid yield
/// an empty list.
pub fn polygon_cells(
    polygon: &Polygon<f64>,
    transform: &GeoTransform,
    rows: usize,
    cols: usize,
) -> Vec<(usize, usize)> {
    let Some(rect) = polygon.bounding_rect() else {
        return Vec::new();
    };

    let (c0, r0) = transform.geo_to_pixel(rect.min().x, rect.max().y);
    let (c1, r1) = transform.geo_to_pixel(rect.max().x, rect.min().y);
    if !(c0.is_finite() && c1.is_finite() && r0.is_finite() && r1.is_finite()) {
        return Vec::new();
    }

    let clamp = |v: f64, hi: usize| -> usize { v.floor().max(0.0).min(hi as f64) as usize };
    let row_lo = clamp(r0.min(r1), rows);
    let row_hi = clamp(r0.max(r1).ceil(), rows);
    let col_lo = clamp(c0.min(c1), cols);
    let col_hi = clamp(c0.max(c1).ceil(), cols);

    let mut cells = Vec::new();
    for row in row_lo..row_hi {
        for col in col_lo..col_hi {
            let (x, y) = transform.pixel_to_geo(col, row);
            if polygon.contains(&Point::new(x, y)) {
                cells.push((row, col));
            }
        }
    }
    cells
}
