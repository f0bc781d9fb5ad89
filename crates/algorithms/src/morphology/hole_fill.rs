//! Small hole filling for irrigated-area maps

use ndarray::Array2;
use rayon::prelude::*;
use irrigis_core::raster::{offset_within, Connectivity, Neighborhood, Raster};
use irrigis_core::{Algorithm, Error, Result};

use super::connected::component_sizes;

/// Parameters for hole filling
#[derive(Debug, Clone, Copy)]
pub struct HoleFillParams {
    /// Background components up to this many cells are holes
    pub max_hole_size: usize,
    /// Radius of the square window averaged to pick the fill code
    pub fill_radius: usize,
}

impl Default for HoleFillParams {
    fn default() -> Self {
        Self {
            max_hole_size: 5,
            fill_radius: 2,
        }
    }
}

/// Hole filling algorithm
#[derive(Debug, Clone, Default)]
pub struct HoleFill;

impl Algorithm for HoleFill {
    type Input = Raster<u8>;
    type Output = Raster<u8>;
    type Params = HoleFillParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "HoleFill"
    }

    fn description(&self) -> &'static str {
        "Fill small background pockets of a tree/crop map from neighbouring codes"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        fill_holes(&input, &params)
    }
}

/// Fill small background holes of a ternary map (0 other, 1 tree, 2 crop).
///
/// A 0 cell is a hole when its 8-connected background component has at
/// most `max_hole_size` cells. It takes the mean of the non-zero codes in
/// the square window: mean >= 1.5 gives 2, any other positive mean gives 1.
/// Holes with no coded neighbour stay 0.
pub fn fill_holes(raster: &Raster<u8>, params: &HoleFillParams) -> Result<Raster<u8>> {
    let (rows, cols) = raster.shape();
    let background = raster.map(|v| u8::from(v == 0));
    let sizes = component_sizes(&background, Connectivity::Eight, params.max_hole_size + 1);
    let window = Neighborhood::Square(params.fill_radius).offsets();
    let data = raster.data();

    let output: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data: Vec<u8> = data.row(row).to_vec();
            for (col, out) in row_data.iter_mut().enumerate() {
                if *out != 0 || sizes[(row, col)] > params.max_hole_size {
                    continue;
                }
                let mut sum = 0u32;
                let mut count = 0u32;
                for &(dr, dc) in &window {
                    if let Some(cell) = offset_within(row, col, dr, dc, rows, cols) {
                        let v = data[cell];
                        if v != 0 {
                            sum += u32::from(v);
                            count += 1;
                        }
                    }
                }
                if count == 0 {
                    continue;
                }
                let mean = f64::from(sum) / f64::from(count);
                *out = if mean >= 1.5 { 2 } else { 1 };
            }
            row_data
        })
        .collect();

    let array = Array2::from_shape_vec((rows, cols), output)
        .map_err(|e| Error::Other(e.to_string()))?;
    raster.with_data(array)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_hole_in_crop_is_filled() {
        let mut r = Raster::filled(7, 7, 2u8);
        r.set(3, 3, 0).unwrap();
        let out = fill_holes(&r, &HoleFillParams::default()).unwrap();
        assert_eq!(out.get(3, 3).unwrap(), 2);
    }

    #[test]
    fn test_mixed_neighbourhood_rounds_to_tree() {
        // left half trees, right half crops, hole in the middle column
        let mut r: Raster<u8> = Raster::new(5, 5);
        for row in 0..5 {
            for col in 0..5 {
                r.set(row, col, if col < 3 { 1 } else { 2 }).unwrap();
            }
        }
        r.set(2, 2, 0).unwrap();
        // window mean: 14 tree cells and 10 crop cells -> 1.42
        let out = fill_holes(&r, &HoleFillParams::default()).unwrap();
        assert_eq!(out.get(2, 2).unwrap(), 1);
    }

    #[test]
    fn test_large_background_untouched() {
        let mut r: Raster<u8> = Raster::new(6, 6);
        for row in 0..6 {
            r.set(row, 0, 2).unwrap();
        }
        let out = fill_holes(&r, &HoleFillParams::default()).unwrap();
        assert_eq!(out.data(), r.data());
    }

    #[test]
    fn test_hole_without_coded_neighbour_stays() {
        let mut r: Raster<u8> = Raster::filled(3, 3, 0);
        r.set(0, 0, 0).unwrap();
        let out = HoleFill
            .execute(
                r,
                HoleFillParams {
                    max_hole_size: 9,
                    fill_radius: 1,
                },
            )
            .unwrap();
        assert_eq!(out.count_where(|v| v == 0), 9);
    }
}
