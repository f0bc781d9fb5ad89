//! Spectral indices
//!
//! Indices are evaluated per pixel on the six reflectance roles of a scene
//! (see [`Reflectance`]). Reflectances are stored as scaled integers
//! (10000 = 100 %); ratio indices are scale free while EVI and SAVI need
//! unit reflectance and apply [`IndexParams::reflectance_scale`] first.

use ndarray::Array2;
use rayon::prelude::*;
use irrigis_core::composite::{Reflectance, SpectralIndex};
use irrigis_core::raster::Raster;
use irrigis_core::{Error, Result};

/// Parameters for index evaluation
#[derive(Debug, Clone, Copy)]
pub struct IndexParams {
    /// Factor converting stored reflectance to unit reflectance
    pub reflectance_scale: f64,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            reflectance_scale: 1e-4,
        }
    }
}

#[inline]
fn nd(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum.abs() < 1e-10 {
        f64::NAN
    } else {
        (a - b) / sum
    }
}

#[inline]
fn ratio(a: f64, b: f64) -> f64 {
    if b.abs() < 1e-10 {
        f64::NAN
    } else {
        a / b
    }
}

/// Index value for one pixel.
///
/// `px` holds the reflectances indexed by [`Reflectance::index`]. Returns
/// NaN when an input is missing or a denominator vanishes.
pub fn index_value(index: SpectralIndex, px: &[f64; 6], params: &IndexParams) -> f64 {
    let b = px[Reflectance::Blue.index()];
    let g = px[Reflectance::Green.index()];
    let r = px[Reflectance::Red.index()];
    let nir = px[Reflectance::Nir.index()];
    let swir = px[Reflectance::Swir1.index()];

    match index {
        SpectralIndex::Ndvi => nd(nir, r),
        SpectralIndex::Ndwi => nd(nir, swir),
        SpectralIndex::Ndwbi => nd(g, swir),
        SpectralIndex::Ndbi => nd(swir, nir),
        SpectralIndex::Gcvi => ratio(nir, g) - 1.0,
        SpectralIndex::Gi => ratio(nir, g),
        SpectralIndex::Wgi => nd(nir, swir) * (ratio(nir, g) - 1.0),
        SpectralIndex::Evi => {
            let s = params.reflectance_scale;
            let (b, r, nir) = (b * s, r * s, nir * s);
            2.5 * ratio(nir - r, nir + 6.0 * r - 7.5 * b + 1.0)
        }
        SpectralIndex::Savi => {
            let s = params.reflectance_scale;
            let (r, nir) = (r * s, nir * s);
            1.5 * ratio(nir - r, nir + r + 0.5)
        }
    }
}

/// Index raster from the six reflectance rasters of a scene.
///
/// Every band must share the grid of the first.
pub fn spectral_index(
    index: SpectralIndex,
    bands: &[Raster<f64>; 6],
    params: &IndexParams,
) -> Result<Raster<f64>> {
    let template = &bands[0];
    for band in &bands[1..] {
        template.ensure_same_grid(band)?;
    }
    let (rows, cols) = template.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut px = [0.0; 6];
            (0..cols)
                .map(|col| {
                    for (slot, band) in px.iter_mut().zip(bands.iter()) {
                        *slot = band.data()[(row, col)];
                    }
                    index_value(index, &px, params)
                })
                .collect::<Vec<f64>>()
        })
        .collect();

    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // B, G, R, NIR, SWIR, SWIR2
    const VEG: [f64; 6] = [400.0, 800.0, 600.0, 3000.0, 1800.0, 1000.0];

    #[test]
    fn test_normalized_differences() {
        let p = IndexParams::default();
        assert_relative_eq!(index_value(SpectralIndex::Ndvi, &VEG, &p), 2400.0 / 3600.0);
        assert_relative_eq!(index_value(SpectralIndex::Ndwi, &VEG, &p), 1200.0 / 4800.0);
        assert_relative_eq!(index_value(SpectralIndex::Ndwbi, &VEG, &p), -1000.0 / 2600.0);
        assert_relative_eq!(index_value(SpectralIndex::Ndbi, &VEG, &p), -1200.0 / 4800.0);
    }

    #[test]
    fn test_green_indices_and_wgi() {
        let p = IndexParams::default();
        let gcvi = index_value(SpectralIndex::Gcvi, &VEG, &p);
        assert_relative_eq!(gcvi, 2.75);
        assert_relative_eq!(index_value(SpectralIndex::Gi, &VEG, &p), 3.75);
        assert_relative_eq!(index_value(SpectralIndex::Wgi, &VEG, &p), 0.25 * 2.75);
    }

    #[test]
    fn test_evi_savi_use_unit_reflectance() {
        let p = IndexParams::default();
        let evi = index_value(SpectralIndex::Evi, &VEG, &p);
        assert_relative_eq!(evi, 2.5 * 0.24 / (0.30 + 0.36 - 0.30 + 1.0), epsilon = 1e-12);
        let savi = index_value(SpectralIndex::Savi, &VEG, &p);
        assert_relative_eq!(savi, 1.5 * 0.24 / (0.36 + 0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_inputs_are_nan() {
        let p = IndexParams::default();
        let zeros = [0.0; 6];
        assert!(index_value(SpectralIndex::Ndvi, &zeros, &p).is_nan());
        assert!(index_value(SpectralIndex::Gcvi, &zeros, &p).is_nan());
        let mut gap = VEG;
        gap[Reflectance::Nir.index()] = f64::NAN;
        assert!(index_value(SpectralIndex::Ndvi, &gap, &p).is_nan());
    }

    #[test]
    fn test_spectral_index_raster() {
        let bands: [Raster<f64>; 6] = VEG.map(|v| Raster::filled(4, 3, v));
        let ndvi = spectral_index(SpectralIndex::Ndvi, &bands, &IndexParams::default()).unwrap();
        assert_eq!(ndvi.shape(), (4, 3));
        assert_relative_eq!(ndvi.get(3, 2).unwrap(), 2400.0 / 3600.0);
    }
}
