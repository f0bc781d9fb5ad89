//! Quality-band cloud masks and scene footprint erosion

use ndarray::Array2;
use irrigis_core::raster::Raster;
use irrigis_core::sensor::QaScheme;
use irrigis_core::{Error, Result};

const fn bit(word: u16, n: u32) -> bool {
    word & (1 << n) != 0
}

/// Whether a quality word marks a usable (cloud-free) observation.
///
/// - Landsat 4-7: cloudy when (bit 5 and bit 7) or bit 3; the fill value
///   96 is rejected as well
/// - Landsat 8-9: usable only when bits 3 and 5 are clear
/// - Sentinel-2 QA60: cloudy when bit 10 (opaque) or bit 11 (cirrus) is set
pub fn is_clear(scheme: QaScheme, qa: u16) -> bool {
    match scheme {
        QaScheme::LandsatTm => {
            let cloud = (bit(qa, 5) && bit(qa, 7)) || bit(qa, 3);
            !cloud && qa != 96
        }
        QaScheme::LandsatOli => !bit(qa, 3) && !bit(qa, 5),
        QaScheme::SentinelQa60 => !bit(qa, 10) && !bit(qa, 11),
    }
}

/// Per-pixel clear mask (1 clear, 0 masked) of a quality raster
pub fn qa_clear_mask(qa: &Raster<u16>, scheme: QaScheme) -> Raster<u8> {
    qa.map(|v| u8::from(is_clear(scheme, v)))
}

/// Shrink a valid-data footprint by `radius` pixels.
///
/// A pixel stays valid only if every pixel of the `(2r + 1)` square window
/// around it that lies on the grid is valid. Cells beyond the grid do not
/// count as outside the footprint, so a scene covering the whole grid keeps
/// its border.
pub fn erode_footprint(valid: &Raster<u8>, radius: usize) -> Result<Raster<u8>> {
    if radius == 0 {
        return Ok(valid.clone());
    }
    let (rows, cols) = valid.shape();

    // Summed-area table of invalid cells, (rows + 1) x (cols + 1)
    let mut sat = Array2::<u32>::zeros((rows + 1, cols + 1));
    for r in 0..rows {
        let mut run = 0u32;
        for c in 0..cols {
            run += u32::from(valid.data()[(r, c)] == 0);
            sat[(r + 1, c + 1)] = sat[(r, c + 1)] + run;
        }
    }

    let mut out = Array2::<u8>::zeros((rows, cols));
    for r in 0..rows {
        let r0 = r.saturating_sub(radius);
        let r1 = (r + radius + 1).min(rows);
        for c in 0..cols {
            if valid.data()[(r, c)] == 0 {
                continue;
            }
            let c0 = c.saturating_sub(radius);
            let c1 = (c + radius + 1).min(cols);
            let invalid = sat[(r1, c1)] + sat[(r0, c0)] - sat[(r0, c1)] - sat[(r1, c0)];
            out[(r, c)] = u8::from(invalid == 0);
        }
    }

    valid.with_data(out)
}

/// Edge buffer in metres converted to whole pixels of `resolution_m`
pub fn buffer_pixels(buffer_m: f64, resolution_m: f64) -> Result<usize> {
    if buffer_m.is_nan() || buffer_m < 0.0 || resolution_m.is_nan() || resolution_m <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "edge_buffer_m",
            value: format!("{} at {} m", buffer_m, resolution_m),
            reason: "buffer must be >= 0 and resolution > 0".into(),
        });
    }
    Ok((buffer_m / resolution_m).round() as usize)
}
