//! Topographic Wetness Index (TWI)
//!
//! TWI = ln( (A + 1)^(0.016 · res^0.46) / tan(β + ε) )
//!
//! where A is the flow accumulation in cells, res the cell size in metres
//! and β the slope in radians. ε keeps the index finite on flat ground.

use ndarray::Array2;
use rayon::prelude::*;
use irrigis_core::raster::Raster;
use irrigis_core::{Error, Result};

/// Parameters for the wetness index
#[derive(Debug, Clone)]
pub struct TwiParams {
    /// Added to the slope (radians) before taking the tangent
    pub slope_epsilon: f64,
    /// Cell size in metres used in the accumulation exponent; defaults to
    /// the grid cell size when `None`
    pub resolution_m: Option<f64>,
}

impl Default for TwiParams {
    fn default() -> Self {
        Self {
            slope_epsilon: 0.001,
            resolution_m: None,
        }
    }
}

/// Compute the topographic wetness index
///
/// # Arguments
/// * `flow_acc` - Flow accumulation raster (cell counts)
/// * `slope_deg` - Slope in degrees on the same grid
pub fn twi(flow_acc: &Raster<f64>, slope_deg: &Raster<f64>, params: &TwiParams) -> Result<Raster<f64>> {
    flow_acc.ensure_same_grid(slope_deg)?;
    if params.slope_epsilon <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "slope_epsilon",
            value: params.slope_epsilon.to_string(),
            reason: "must be positive".into(),
        });
    }

    let (rows, cols) = flow_acc.shape();
    let resolution = params.resolution_m.unwrap_or_else(|| flow_acc.cell_size());
    let exponent = 0.016 * resolution.powf(0.46);
    let acc = flow_acc.data();
    let slp = slope_deg.data();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let a = acc[(row, col)];
                let s = slp[(row, col)];
                if a.is_nan() || s.is_nan() || a < 0.0 {
                    continue;
                }
                let beta = s.to_radians() + params.slope_epsilon;
                row_data[col] = ((a + 1.0).powf(exponent) / beta.tan()).ln();
            }
            row_data
        })
        .collect();

    let mut output = flow_acc.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
