//! Slope calculation from DEMs
//!
//! Rate of change of elevation using the Horn (1981) method over a 3x3
//! neighborhood. Border cells reuse the nearest interior elevations so the
//! output covers the whole grid.

use ndarray::Array2;
use rayon::prelude::*;
use irrigis_core::raster::Raster;
use irrigis_core::{Algorithm, Error, Result};

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    #[default]
    Degrees,
    Percent,
    Radians,
}

/// Parameters for slope calculation
#[derive(Debug, Clone)]
pub struct SlopeParams {
    pub units: SlopeUnits,
    /// Vertical exaggeration applied to horizontal distances (1.0 for
    /// metric DEMs on a metric grid)
    pub z_factor: f64,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self {
            units: SlopeUnits::Degrees,
            z_factor: 1.0,
        }
    }
}

/// Slope algorithm
#[derive(Debug, Clone, Default)]
pub struct Slope;

impl Algorithm for Slope {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = SlopeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Slope"
    }

    fn description(&self) -> &'static str {
        "Terrain slope from an elevation model using Horn's method"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        slope(&input, params)
    }
}

/// Calculate slope from a DEM
///
/// ```text
/// a b c
/// d e f
/// g h i
/// ```
///
/// dz/dx = ((c + 2f + i) - (a + 2d + g)) / (8 * cellsize)
/// dz/dy = ((g + 2h + i) - (a + 2b + c)) / (8 * cellsize)
/// slope = atan(sqrt(dz/dx² + dz/dy²))
///
/// Cells that are NaN, or have a NaN neighbor, are NaN in the output.
pub fn slope(dem: &Raster<f64>, params: SlopeParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    let eight_cell_size = 8.0 * dem.cell_size() * params.z_factor;
    let data = dem.data();

    let at = |r: isize, c: isize| -> f64 {
        let r = r.clamp(0, rows as isize - 1) as usize;
        let c = c.clamp(0, cols as isize - 1) as usize;
        data[(r, c)]
    };

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let r = row as isize;

            for col in 0..cols {
                let e = data[(row, col)];
                if dem.is_nodata(e) {
                    continue;
                }
                let c = col as isize;

                let a = at(r - 1, c - 1);
                let b = at(r - 1, c);
                let cc = at(r - 1, c + 1);
                let d = at(r, c - 1);
                let f = at(r, c + 1);
                let g = at(r + 1, c - 1);
                let h = at(r + 1, c);
                let i = at(r + 1, c + 1);

                if [a, b, cc, d, f, g, h, i].iter().any(|v| v.is_nan()) {
                    continue;
                }

                let dz_dx = ((cc + 2.0 * f + i) - (a + 2.0 * d + g)) / eight_cell_size;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + cc)) / eight_cell_size;
                let slope_rad = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan();

                row_data[col] = match params.units {
                    SlopeUnits::Degrees => slope_rad.to_degrees(),
                    SlopeUnits::Percent => slope_rad.tan() * 100.0,
                    SlopeUnits::Radians => slope_rad,
                };
            }

            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
