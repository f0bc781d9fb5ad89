//! Whole-raster inference with the forest-loss override

use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use irrigis_core::composite::FeatureComposite;
use irrigis_core::raster::Raster;
use irrigis_core::{Error, Result};

use super::model::Classifier;

/// Class assigned to pixels overridden by the disturbance layer
pub const DISTURBED_CLASS: u8 = 10;

/// Year of forest loss per pixel (Hansen Global Forest Change encoding).
///
/// `loss_year` holds the loss year as an offset from `base_year`, 0 for
/// no loss. Years after `last_year` are not covered.
#[derive(Debug, Clone)]
pub struct DisturbanceLayer {
    pub loss_year: Raster<u8>,
    pub base_year: i32,
    pub last_year: i32,
}

impl DisturbanceLayer {
    pub fn new(loss_year: Raster<u8>, last_year: i32) -> Self {
        Self {
            loss_year,
            base_year: 2000,
            last_year,
        }
    }

    /// Encoded value marking loss in `year`, `None` outside coverage
    pub fn code_for(&self, year: i32) -> Option<u8> {
        if year <= self.base_year || year > self.last_year {
            return None;
        }
        u8::try_from(year - self.base_year).ok()
    }
}

/// Output of raster inference
#[derive(Debug, Clone)]
pub struct ClassifiedRaster {
    /// Predicted class codes, 0 where not classified
    pub classes: Raster<u8>,
    /// Classifier score where the model provides one, NaN elsewhere
    pub scores: Option<Raster<f64>>,
    /// 1 where the disturbance override replaced the prediction
    pub overridden: Option<Raster<u8>>,
}

/// Classify every eligible pixel of a composite.
///
/// The composite's band schema must equal the one the classifier was
/// trained on. Ineligible pixels and pixels with a missing band get 0.
/// When a disturbance layer covers the composite year, pixels that lost
/// forest in that year get [`DISTURBED_CLASS`].
pub fn predict_raster(
    classifier: &dyn Classifier,
    composite: &FeatureComposite,
    eligible: &Raster<u8>,
    disturbance: Option<&DisturbanceLayer>,
) -> Result<ClassifiedRaster> {
    classifier.schema().ensure_matches(composite.schema())?;
    let template = composite.template();
    template.ensure_same_grid(eligible)?;

    let year = composite.metadata().date_range.start_year();
    let loss_code = match disturbance {
        Some(layer) => {
            template.ensure_same_grid(&layer.loss_year)?;
            let code = layer.code_for(year);
            if code.is_none() {
                debug!(year, last_year = layer.last_year, "disturbance layer does not cover year, skipped");
            }
            code.map(|c| (layer, c))
        }
        None => None,
    };

    let (rows, cols) = composite.shape();
    let with_score = classifier.has_score();
    let eligible_data = eligible.data();

    let pixels: Vec<(u8, f64, u8)> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut values = Vec::with_capacity(composite.band_count());
            let mut row_data = vec![(0u8, f64::NAN, 0u8); cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                if eligible_data[(row, col)] == 0 || !composite.pixel_into(row, col, &mut values) {
                    continue;
                }
                if let Some((layer, code)) = loss_code {
                    if layer.loss_year.data()[(row, col)] == code {
                        *out = (DISTURBED_CLASS, f64::NAN, 1);
                        continue;
                    }
                }
                let class = classifier.predict(&values);
                let score = if with_score {
                    classifier.score(&values).unwrap_or(f64::NAN)
                } else {
                    f64::NAN
                };
                *out = (class, score, 0);
            }
            row_data
        })
        .collect();

    let mut classes = Vec::with_capacity(pixels.len());
    let mut scores = Vec::with_capacity(pixels.len());
    let mut overridden = Vec::with_capacity(pixels.len());
    for (c, s, o) in pixels {
        classes.push(c);
        scores.push(s);
        overridden.push(o);
    }
    let shape = (rows, cols);
    let to_array = |v| Array2::from_shape_vec(shape, v).map_err(|e| Error::Other(e.to_string()));

    let classes = template.with_data(to_array(classes)?)?;
    let scores = if with_score {
        let mut s = template.with_data(Array2::from_shape_vec(shape, scores).map_err(|e| Error::Other(e.to_string()))?)?;
        s.set_nodata(Some(f64::NAN));
        Some(s)
    } else {
        None
    };
    let overridden = match loss_code {
        Some(_) => Some(template.with_data(to_array(overridden)?)?),
        None => None,
    };

    Ok(ClassifiedRaster {
        classes,
        scores,
        overridden,
    })
}
