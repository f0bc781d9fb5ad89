//! Area of interest

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use crate::vector::polygon_cells;
use geo_types::MultiPolygon;

/// A named study area rasterized on the working grid.
///
/// Every product of a run (composite, labels, class maps) is defined on the
/// grid of its region and is zero outside the region mask.
#[derive(Debug, Clone)]
pub struct Region {
    name: String,
    mask: Raster<u8>,
}

impl Region {
    /// Region from an existing mask, non-zero cells are inside
    pub fn from_mask(name: impl Into<String>, mask: Raster<u8>) -> Self {
        let mask = mask.map(|v| u8::from(v != 0));
        Self {
            name: name.into(),
            mask,
        }
    }

    /// Region covering the whole grid of `template`
    pub fn covering<T: RasterElement>(name: impl Into<String>, template: &Raster<T>) -> Self {
        let (rows, cols) = template.shape();
        Self {
            name: name.into(),
            mask: template.with_same_meta::<u8>(rows, cols).map(|_| 1),
        }
    }

    /// Rasterize an outline onto a `rows` x `cols` grid
    pub fn from_outline(
        name: impl Into<String>,
        outline: &MultiPolygon<f64>,
        transform: GeoTransform,
        crs: Option<CRS>,
        rows: usize,
        cols: usize,
    ) -> Result<Self> {
        let mut mask: Raster<u8> = Raster::new(rows, cols);
        mask.set_transform(transform);
        mask.set_crs(crs);
        for polygon in &outline.0 {
            for (row, col) in polygon_cells(polygon, &transform, rows, cols) {
                mask.set(row, col, 1)?;
            }
        }
        let name = name.into();
        if mask.count_where(|v| v == 1) == 0 {
            return Err(Error::InvalidParameter {
                name: "region",
                value: name,
                reason: "outline does not cover any cell of the grid".into(),
            });
        }
        Ok(Self { name, mask })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mask raster, 1 inside
    pub fn mask(&self) -> &Raster<u8> {
        &self.mask
    }

    pub fn shape(&self) -> (usize, usize) {
        self.mask.shape()
    }

    #[inline]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.mask.data().get((row, col)).map_or(false, |&v| v != 0)
    }

    /// Number of cells inside the region
    pub fn cell_count(&self) -> usize {
        self.mask.count_where(|v| v != 0)
    }

    /// Check that `raster` lies on the region grid
    pub fn ensure_grid<T: RasterElement>(&self, raster: &Raster<T>) -> Result<()> {
        self.mask.ensure_same_grid(raster)
    }
}
