//! Agreement between a mask and reference polygons

use geo::Area;
use geo_types::{Geometry, Polygon};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use irrigis_core::raster::Raster;
use irrigis_core::vector::{polygon_cells, FeatureCollection};
use irrigis_core::{Error, Result};

/// Mask agreement inside one reference polygon
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PolygonScore {
    /// Index of the polygon in the input slice
    pub index: usize,
    /// Cells whose centre lies inside the polygon
    pub total: usize,
    /// Of those, cells set in the mask
    pub foreground: usize,
    /// `foreground / total`
    pub score: f64,
}

/// Score every polygon against the non-zero cells of `mask`.
///
/// Polygons that contain no cell centre are skipped.
pub fn polygon_scores(mask: &Raster<u8>, polygons: &[Polygon<f64>]) -> Vec<PolygonScore> {
    let (rows, cols) = mask.shape();
    let transform = mask.transform();
    let data = mask.data();

    polygons
        .iter()
        .enumerate()
        .filter_map(|(index, polygon)| {
            let cells = polygon_cells(polygon, transform, rows, cols);
            if cells.is_empty() {
                return None;
            }
            let foreground = cells.iter().filter(|&&cell| data[cell] != 0).count();
            let total = cells.len();
            Some(PolygonScore {
                index,
                total,
                foreground,
                score: (foreground as f64 / total as f64).min(1.0),
            })
        })
        .collect()
}

/// Parameters for [`sample_reference_polygons`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceSampling {
    /// Smallest polygon kept, m2
    pub min_area_m2: f64,
    /// Largest polygon kept, m2
    pub max_area_m2: f64,
    /// Probability of keeping each polygon in the area range
    pub fraction: f64,
    pub seed: u64,
}

impl Default for ReferenceSampling {
    fn default() -> Self {
        Self {
            min_area_m2: 10_000.0,
            max_area_m2: 100_000.0,
            fraction: 0.2,
            seed: 0,
        }
    }
}

/// Draw a random subset of reference polygons of moderate size.
///
/// Multipolygons are exploded first. Areas are planar, so the features are
/// expected in a projected CRS in metres.
pub fn sample_reference_polygons(
    features: &FeatureCollection,
    params: &ReferenceSampling,
) -> Result<Vec<Polygon<f64>>> {
    if !(0.0..=1.0).contains(&params.fraction) {
        return Err(Error::InvalidParameter {
            name: "fraction",
            value: params.fraction.to_string(),
            reason: "must be within [0, 1]".into(),
        });
    }
    if params.min_area_m2 > params.max_area_m2 {
        return Err(Error::InvalidParameter {
            name: "min_area_m2",
            value: params.min_area_m2.to_string(),
            reason: format!("exceeds max_area_m2 {}", params.max_area_m2),
        });
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let sampled = features
        .explode()
        .into_iter()
        .filter_map(|f| match f.geometry {
            Some(Geometry::Polygon(p)) => Some(p),
            _ => None,
        })
        .filter(|p| {
            let area = p.unsigned_area();
            area >= params.min_area_m2 && area <= params.max_area_m2
        })
        .filter(|_| rng.gen::<f64>() < params.fraction)
        .collect();
    Ok(sampled)
}
