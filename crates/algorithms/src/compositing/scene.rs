//! One optical acquisition on the working grid

use chrono::{Datelike, NaiveDate};
use irrigis_core::composite::Reflectance;
use irrigis_core::raster::Raster;
use irrigis_core::sensor::Platform;
use irrigis_core::Result;

/// Surface reflectance of one acquisition, resampled to the region grid.
///
/// Reflectance rasters are ordered by [`Reflectance::index`]; missing
/// values are NaN. The optional quality band is decoded according to the
/// platform's [`QaScheme`](irrigis_core::sensor::QaScheme).
#[derive(Debug, Clone)]
pub struct Scene {
    pub platform: Platform,
    pub date: NaiveDate,
    pub reflectance: [Raster<f64>; 6],
    pub qa: Option<Raster<u16>>,
}

impl Scene {
    /// Scene without a quality band; all bands must share one grid
    pub fn new(platform: Platform, date: NaiveDate, reflectance: [Raster<f64>; 6]) -> Result<Self> {
        for band in &reflectance[1..] {
            reflectance[0].ensure_same_grid(band)?;
        }
        Ok(Self {
            platform,
            date,
            reflectance,
            qa: None,
        })
    }

    /// Attach a quality band
    pub fn with_qa(mut self, qa: Raster<u16>) -> Result<Self> {
        self.reflectance[0].ensure_same_grid(&qa)?;
        self.qa = Some(qa);
        Ok(self)
    }

    pub fn band(&self, role: Reflectance) -> &Raster<f64> {
        &self.reflectance[role.index()]
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.reflectance[0].shape()
    }
}
