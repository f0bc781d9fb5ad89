//! Multi-band feature composite

use super::band::BandKey;
use super::schema::BandSchema;
use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use crate::sensor::Sensor;
use crate::temporal::{DateRange, Season};
use serde::{Deserialize, Serialize};

/// How the scene time series is split before reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// One band per statistic over the whole window
    #[default]
    WholePeriod,
    /// One band per statistic and calendar month
    Monthly,
    /// One band per statistic and season
    Seasonal,
}

impl AggregationMode {
    /// Name used in product paths
    pub fn method_name(&self) -> &'static str {
        match self {
            AggregationMode::WholePeriod => "all_scenes_reduced",
            AggregationMode::Monthly => "monthly_composites_reduced",
            AggregationMode::Seasonal => "seasonal_composites_reduced",
        }
    }
}

/// Provenance of a composite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeMetadata {
    pub sensor: Sensor,
    pub resolution_m: f64,
    pub date_range: DateRange,
    pub season: Option<Season>,
    pub aggregation: AggregationMode,
    pub region: String,
    /// Number of scenes that contributed
    pub scene_count: usize,
}

/// Per-pixel statistics of a time series, one `Raster<f64>` per band.
///
/// All bands share one grid. Missing observations are NaN.
#[derive(Debug, Clone)]
pub struct FeatureComposite {
    schema: BandSchema,
    bands: Vec<Raster<f64>>,
    metadata: CompositeMetadata,
}

impl FeatureComposite {
    /// Assemble a composite, checking that every band is on the grid of the first
    pub fn from_bands(
        metadata: CompositeMetadata,
        bands: impl IntoIterator<Item = (BandKey, Raster<f64>)>,
    ) -> Result<Self> {
        let mut schema = BandSchema::default();
        let mut rasters: Vec<Raster<f64>> = Vec::new();
        for (key, raster) in bands {
            if let Some(first) = rasters.first() {
                first.ensure_same_grid(&raster)?;
            }
            schema.push(key)?;
            rasters.push(raster);
        }
        if rasters.is_empty() {
            return Err(Error::InvalidParameter {
                name: "bands",
                value: "[]".into(),
                reason: "a composite needs at least one band".into(),
            });
        }
        Ok(Self {
            schema,
            bands: rasters,
            metadata,
        })
    }

    pub fn schema(&self) -> &BandSchema {
        &self.schema
    }

    pub fn metadata(&self) -> &CompositeMetadata {
        &self.metadata
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.bands[0].shape()
    }

    pub fn transform(&self) -> &GeoTransform {
        self.bands[0].transform()
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.bands[0].crs()
    }

    /// Any band, used as the grid template for derived rasters
    pub fn template(&self) -> &Raster<f64> {
        &self.bands[0]
    }

    pub fn band(&self, key: &BandKey) -> Result<&Raster<f64>> {
        self.schema
            .position(key)
            .map(|i| &self.bands[i])
            .ok_or_else(|| Error::MissingBand(key.to_string()))
    }

    pub fn band_at(&self, index: usize) -> &Raster<f64> {
        &self.bands[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BandKey, &Raster<f64>)> {
        self.schema.keys().iter().zip(self.bands.iter())
    }

    /// Write the values of every band at a pixel into `out`.
    ///
    /// Returns `false` when a value is missing (NaN), in which case `out`
    /// content is unspecified.
    pub fn pixel_into(&self, row: usize, col: usize, out: &mut Vec<f64>) -> bool {
        out.clear();
        for band in &self.bands {
            let v = band.data()[(row, col)];
            if !v.is_finite() {
                return false;
            }
            out.push(v);
        }
        true
    }

    /// New composite restricted to `schema`, in its order
    pub fn select(&self, schema: &BandSchema) -> Result<FeatureComposite> {
        if schema.is_empty() {
            return Err(Error::InvalidParameter {
                name: "bands",
                value: "[]".into(),
                reason: "cannot select an empty band set".into(),
            });
        }
        let indices = self.schema.indices_of(schema.keys())?;
        Ok(FeatureComposite {
            schema: schema.clone(),
            bands: indices.iter().map(|&i| self.bands[i].clone()).collect(),
            metadata: self.metadata.clone(),
        })
    }
}
