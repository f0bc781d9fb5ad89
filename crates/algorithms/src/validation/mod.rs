//! Accuracy assessment of irrigated-area maps
//!
//! A predicted mask is scored by its total irrigated surface and by how
//! much of each reference polygon it covers.

mod area;
mod polygons;

pub use area::irrigated_area_ha;
pub use polygons::{polygon_scores, sample_reference_polygons, PolygonScore, ReferenceSampling};

use geo_types::Polygon;
use serde::{Deserialize, Serialize};
use tracing::debug;

use irrigis_core::raster::Raster;
use irrigis_core::{Region, Result};

use crate::postprocess::IrrigatedAreaRaster;

/// Parameters for [`validate`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationParams {
    /// Tile subdivision for the area reduction; never changes the result
    pub tile_scale: usize,
    pub reference: ReferenceSampling,
}

impl Default for ValidationParams {
    fn default() -> Self {
        Self {
            tile_scale: 4,
            reference: ReferenceSampling::default(),
        }
    }
}

/// Area and polygon agreement of one mask
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationScore {
    pub area_ha: f64,
    /// Unweighted mean of the polygon scores, `None` when no polygon was scored
    pub mean_score: Option<f64>,
    pub polygons_scored: usize,
    pub polygon_scores: Vec<PolygonScore>,
}

/// Score a predicted mask (non-zero = irrigated) within `region`.
pub fn validate(
    mask: &Raster<u8>,
    region: &Region,
    polygons: &[Polygon<f64>],
    params: &ValidationParams,
) -> Result<ValidationScore> {
    let area_ha = irrigated_area_ha(mask, region, params.tile_scale)?;

    // cells outside the region never count as foreground
    let clipped = mask.with_data(ndarray::Array2::from_shape_fn(mask.shape(), |(r, c)| {
        u8::from(mask.data()[(r, c)] != 0 && region.contains(r, c))
    }))?;
    let scores = polygon_scores(&clipped, polygons);
    let mean_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().map(|s| s.score).sum::<f64>() / scores.len() as f64)
    };

    debug!(
        region = region.name(),
        area_ha,
        polygons = polygons.len(),
        scored = scores.len(),
        "validated mask"
    );

    Ok(ValidationScore {
        area_ha,
        mean_score,
        polygons_scored: scores.len(),
        polygon_scores: scores,
    })
}

/// Scores of the summer, winter and combined maps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalValidation {
    pub summer: ValidationScore,
    pub winter: ValidationScore,
    /// Pixels irrigated in either season
    pub union: ValidationScore,
}

/// Validate both seasonal maps and their union against the same polygons.
pub fn validate_seasons(
    summer: &IrrigatedAreaRaster,
    winter: &IrrigatedAreaRaster,
    region: &Region,
    polygons: &[Polygon<f64>],
    params: &ValidationParams,
) -> Result<SeasonalValidation> {
    let summer_mask = summer.irrigated_mask();
    let winter_mask = winter.irrigated_mask();
    summer_mask.ensure_same_grid(&winter_mask)?;

    let union = ndarray::Zip::from(summer_mask.data())
        .and(winter_mask.data())
        .map_collect(|&s, &w| u8::from(s != 0 || w != 0));
    let union_mask = summer_mask.with_data(union)?;

    Ok(SeasonalValidation {
        summer: validate(&summer_mask, region, polygons, params)?,
        winter: validate(&winter_mask, region, polygons, params)?,
        union: validate(&union_mask, region, polygons, params)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::polygon;
    use irrigis_core::GeoTransform;

    fn grid(values: Vec<u8>) -> Raster<u8> {
        let mut r = Raster::from_vec(values, 4, 4).unwrap();
        r.set_transform(GeoTransform::new(0.0, 400.0, 100.0, -100.0));
        r
    }

    fn left_half() -> Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: 200.0, y: 0.0), (x: 200.0, y: 400.0), (x: 0.0, y: 400.0)]
    }

    fn right_half() -> Polygon<f64> {
        polygon![(x: 200.0, y: 0.0), (x: 400.0, y: 0.0), (x: 400.0, y: 400.0), (x: 200.0, y: 400.0)]
    }

    #[test]
    fn test_validate_mask() {
        let mask = grid(vec![1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 0, 0, 0]);
        let region = Region::covering("r", &mask);
        let score = validate(&mask, &region, &[left_half(), right_half()], &ValidationParams::default())
            .unwrap();

        // 7 cells of 1 ha
        assert_relative_eq!(score.area_ha, 7.0);
        assert_eq!(score.polygons_scored, 2);
        assert_relative_eq!(score.polygon_scores[0].score, 7.0 / 8.0);
        assert_relative_eq!(score.polygon_scores[1].score, 0.0);
        assert_relative_eq!(score.mean_score.unwrap(), 7.0 / 16.0);
    }

    #[test]
    fn test_validate_without_polygons() {
        let mask = grid(vec![1; 16]);
        let region = Region::covering("r", &mask);
        let score = validate(&mask, &region, &[], &ValidationParams::default()).unwrap();
        assert_eq!(score.mean_score, None);
        assert_relative_eq!(score.area_ha, 16.0);
    }

    #[test]
    fn test_validate_seasons_union() {
        let summer = IrrigatedAreaRaster::from_raster(grid(vec![
            2, 2, 0, 0, 2, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ]))
        .unwrap();
        let winter = IrrigatedAreaRaster::from_raster(grid(vec![
            0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0,
        ]))
        .unwrap();
        let region = Region::covering("r", summer.raster());

        let result = validate_seasons(
            &summer,
            &winter,
            &region,
            &[left_half(), right_half()],
            &ValidationParams::default(),
        )
        .unwrap();
        assert_relative_eq!(result.summer.area_ha, 4.0);
        assert_relative_eq!(result.winter.area_ha, 4.0);
        assert_relative_eq!(result.union.area_ha, 8.0);
        assert_relative_eq!(result.union.mean_score.unwrap(), 0.5);
    }
}
