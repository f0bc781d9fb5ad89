//! Composite builder

use std::collections::BTreeSet;

use chrono::{Datelike, Months};
use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use irrigis_core::composite::{
    AggregationMode, BandKey, CompositeMetadata, FeatureComposite, Period, Source, Statistic,
};
use irrigis_core::raster::Raster;
use irrigis_core::region::Region;
use irrigis_core::sensor::Sensor;
use irrigis_core::temporal::{DateRange, Season};
use irrigis_core::{Error, Result};

use super::reducer::reduce;
use super::scene::Scene;
use crate::hydrology::{flow_accumulation, flow_direction};
use crate::imagery::{buffer_pixels, erode_footprint, index_value, qa_clear_mask, IndexParams};
use crate::terrain::{slope, twi, SlopeParams, TwiParams};

/// What to composite and how.
#[derive(Debug, Clone)]
pub struct CompositeRequest {
    pub sensor: Sensor,
    pub date_range: DateRange,
    /// Keep only scenes acquired in the months of this season
    pub season: Option<Season>,
    pub aggregation: AggregationMode,
    pub sources: Vec<Source>,
    pub statistics: Vec<Statistic>,
    /// Scene border to discard; `None` uses the sensor default
    pub edge_buffer_m: Option<f64>,
    pub index_params: IndexParams,
}

impl CompositeRequest {
    /// Whole-period composite of every reflectance band and index with
    /// the standard statistics
    pub fn new(sensor: Sensor, date_range: DateRange) -> Self {
        Self {
            sensor,
            date_range,
            season: None,
            aggregation: AggregationMode::WholePeriod,
            sources: Source::catalog(),
            statistics: Statistic::standard_set(),
            edge_buffer_m: None,
            index_params: IndexParams::default(),
        }
    }

    pub fn with_season(mut self, season: Season) -> Self {
        self.season = Some(season);
        self
    }

    pub fn with_aggregation(mut self, aggregation: AggregationMode) -> Self {
        self.aggregation = aggregation;
        self
    }

    fn edge_buffer(&self) -> f64 {
        self.edge_buffer_m
            .unwrap_or_else(|| self.sensor.default_edge_buffer_m())
    }

    fn accepts(&self, scene: &Scene) -> bool {
        scene.platform.sensor() == self.sensor
            && self.date_range.contains(scene.date)
            && self
                .season
                .map_or(true, |s| s.window().contains(scene.month()))
    }
}

/// Elevation model and optional flow accumulation on the region grid
#[derive(Debug, Clone)]
pub struct TerrainInputs {
    pub dem: Raster<f64>,
    /// Upslope cell count; derived from the DEM by D8 routing when absent
    pub flow_accumulation: Option<Raster<f64>>,
}

impl TerrainInputs {
    pub fn new(dem: Raster<f64>) -> Self {
        Self {
            dem,
            flow_accumulation: None,
        }
    }
}

/// Scenes contributing to one output period
struct PeriodGroup {
    period: Period,
    members: Vec<usize>,
    /// Used for a pixel when `members` hold no valid observation
    fallback: Vec<usize>,
}

/// Build a feature composite from a scene collection.
///
/// Scenes of other sensors, outside the date range or outside the season
/// window are ignored. Each accepted scene is masked by its quality band,
/// its footprint is eroded by the edge buffer and every pixel outside the
/// region is dropped. The remaining observations are reduced per pixel and
/// per period; slope and TWI are appended last.
pub fn build_composite(
    scenes: &[Scene],
    terrain: &TerrainInputs,
    region: &Region,
    request: &CompositeRequest,
) -> Result<FeatureComposite> {
    if request.sources.is_empty() || request.statistics.is_empty() {
        return Err(Error::InvalidParameter {
            name: "composite",
            value: format!(
                "{} sources, {} statistics",
                request.sources.len(),
                request.statistics.len()
            ),
            reason: "at least one source and one statistic are required".into(),
        });
    }
    region.ensure_grid(&terrain.dem)?;

    let selected: Vec<&Scene> = scenes.iter().filter(|s| request.accepts(s)).collect();
    if selected.is_empty() {
        return Err(Error::Algorithm(format!(
            "no {} scenes between {} and {}",
            request.sensor, request.date_range.start, request.date_range.end
        )));
    }
    for scene in &selected {
        region.ensure_grid(&scene.reflectance[0])?;
    }
    debug!(
        sensor = %request.sensor,
        accepted = selected.len(),
        offered = scenes.len(),
        "selected scenes"
    );

    let buffer_px = buffer_pixels(request.edge_buffer(), request.sensor.resolution_m())?;
    let masks: Vec<Raster<u8>> = selected
        .par_iter()
        .map(|scene| valid_mask(scene, region, buffer_px))
        .collect::<Result<Vec<_>>>()?;

    let groups = period_groups(&selected, request);
    let keys = band_keys(request, &groups);
    let temporal = reduce_series(&selected, &masks, &groups, request)?;

    let template = region.mask();
    let mut bands: Vec<(BandKey, Raster<f64>)> = Vec::with_capacity(keys.len() + 2);
    for (key, data) in keys.into_iter().zip(temporal) {
        let mut raster = template.with_data(data)?;
        raster.set_nodata(Some(f64::NAN));
        bands.push((key, raster));
    }

    let (slope_deg, wetness) = static_covariates(terrain, region, request.sensor)?;
    bands.push((BandKey::slope(), slope_deg));
    bands.push((BandKey::twi(), wetness));

    let metadata = CompositeMetadata {
        sensor: request.sensor,
        resolution_m: request.sensor.resolution_m(),
        date_range: request.date_range,
        season: request.season,
        aggregation: request.aggregation,
        region: region.name().to_string(),
        scene_count: selected.len(),
    };
    FeatureComposite::from_bands(metadata, bands)
}

/// 1 where the scene holds a clear observation inside the eroded footprint
/// and the region
fn valid_mask(scene: &Scene, region: &Region, buffer_px: usize) -> Result<Raster<u8>> {
    let (rows, cols) = scene.shape();
    let footprint = Array2::from_shape_fn((rows, cols), |(r, c)| {
        u8::from(scene.reflectance.iter().all(|b| b.data()[(r, c)].is_finite()))
    });
    let footprint = region.mask().with_data(footprint)?;
    let mut valid = erode_footprint(&footprint, buffer_px)?;

    let clear = scene
        .qa
        .as_ref()
        .map(|qa| qa_clear_mask(qa, scene.platform.qa_scheme()));
    for ((r, c), v) in valid.data_mut().indexed_iter_mut() {
        let is_clear = clear.as_ref().map_or(true, |m| m.data()[(r, c)] == 1);
        if !is_clear || !region.contains(r, c) {
            *v = 0;
        }
    }
    Ok(valid)
}

fn period_groups(scenes: &[&Scene], request: &CompositeRequest) -> Vec<PeriodGroup> {
    let by_months = |months: &[u32]| -> Vec<usize> {
        scenes
            .iter()
            .enumerate()
            .filter(|(_, s)| months.contains(&s.month()))
            .map(|(i, _)| i)
            .collect()
    };

    match request.aggregation {
        AggregationMode::WholePeriod => vec![PeriodGroup {
            period: Period::Whole,
            members: (0..scenes.len()).collect(),
            fallback: Vec::new(),
        }],
        AggregationMode::Monthly => months_of(request)
            .into_iter()
            .map(|m| {
                let prev = if m == 1 { 12 } else { m - 1 };
                let next = if m == 12 { 1 } else { m + 1 };
                PeriodGroup {
                    period: Period::Month(m as u8),
                    members: by_months(&[m]),
                    fallback: by_months(&[prev, next]),
                }
            })
            .collect(),
        AggregationMode::Seasonal => Season::ALL
            .iter()
            .map(|season| PeriodGroup {
                period: Period::Season(*season),
                members: by_months(&season.window().months()),
                fallback: Vec::new(),
            })
            .collect(),
    }
}

/// Calendar months covered by the request, in chronological order
fn months_of(request: &CompositeRequest) -> Vec<u32> {
    if let Some(season) = request.season {
        return season.window().months();
    }
    let mut seen = BTreeSet::new();
    let mut months = Vec::new();
    let mut day = request.date_range.start.with_day(1);
    while let Some(d) = day {
        if d >= request.date_range.end || seen.len() == 12 {
            break;
        }
        if seen.insert(d.month()) {
            months.push(d.month());
        }
        day = d.checked_add_months(Months::new(1));
    }
    months
}

fn band_keys(request: &CompositeRequest, groups: &[PeriodGroup]) -> Vec<BandKey> {
    let mut keys = Vec::new();
    for source in &request.sources {
        for statistic in &request.statistics {
            for group in groups {
                keys.push(BandKey::temporal(*source, *statistic).with_period(group.period));
            }
        }
    }
    keys
}

/// Reduce every pixel's series; returns one array per band in key order
fn reduce_series(
    scenes: &[&Scene],
    masks: &[Raster<u8>],
    groups: &[PeriodGroup],
    request: &CompositeRequest,
) -> Result<Vec<Array2<f64>>> {
    let (rows, cols) = scenes[0].shape();
    let n_sources = request.sources.len();
    let n_stats = request.statistics.len();
    let n_groups = groups.len();
    let n_bands = n_sources * n_stats * n_groups;

    let row_values: Vec<Vec<f64>> = (0..rows)
        .into_par_iter()
        .map(|row| {
            let mut out = vec![f64::NAN; cols * n_bands];
            let mut obs = vec![f64::NAN; scenes.len() * n_sources];
            let mut series: Vec<f64> = Vec::with_capacity(scenes.len());
            let mut px = [0.0; 6];

            for col in 0..cols {
                let mut any = false;
                for (k, scene) in scenes.iter().enumerate() {
                    let slot = &mut obs[k * n_sources..(k + 1) * n_sources];
                    if masks[k].data()[(row, col)] == 0 {
                        slot.fill(f64::NAN);
                        continue;
                    }
                    any = true;
                    for (v, band) in px.iter_mut().zip(scene.reflectance.iter()) {
                        *v = band.data()[(row, col)];
                    }
                    for (value, source) in slot.iter_mut().zip(&request.sources) {
                        *value = match source {
                            Source::Reflectance(r) => px[r.index()],
                            Source::Index(i) => index_value(*i, &px, &request.index_params),
                        };
                    }
                }
                if !any {
                    continue;
                }

                let pixel = &mut out[col * n_bands..(col + 1) * n_bands];
                for s in 0..n_sources {
                    for (g, group) in groups.iter().enumerate() {
                        collect(&obs, n_sources, s, &group.members, &mut series);
                        if series.is_empty() {
                            collect(&obs, n_sources, s, &group.fallback, &mut series);
                        }
                        series.sort_by(|a, b| a.total_cmp(b));
                        for (t, statistic) in request.statistics.iter().enumerate() {
                            pixel[(s * n_stats + t) * n_groups + g] = reduce(&series, *statistic);
                        }
                    }
                }
            }
            out
        })
        .collect();

    let bands = (0..n_bands)
        .map(|b| Array2::from_shape_fn((rows, cols), |(r, c)| row_values[r][c * n_bands + b]))
        .collect();
    Ok(bands)
}

fn collect(obs: &[f64], n_sources: usize, source: usize, members: &[usize], out: &mut Vec<f64>) {
    out.clear();
    out.extend(
        members
            .iter()
            .map(|&k| obs[k * n_sources + source])
            .filter(|v| v.is_finite()),
    );
}

/// Slope in degrees and TWI, NaN outside the region
fn static_covariates(
    terrain: &TerrainInputs,
    region: &Region,
    sensor: Sensor,
) -> Result<(Raster<f64>, Raster<f64>)> {
    let slope_deg = slope(&terrain.dem, SlopeParams::default())?;
    let accumulation = match &terrain.flow_accumulation {
        Some(acc) => {
            region.ensure_grid(acc)?;
            acc.clone()
        }
        None => {
            debug!("deriving flow accumulation from the DEM");
            flow_accumulation(&flow_direction(&terrain.dem)?)?
        }
    };
    let params = TwiParams {
        resolution_m: Some(sensor.resolution_m()),
        ..TwiParams::default()
    };
    let wetness = twi(&accumulation, &slope_deg, &params)?;

    let clip = |raster: Raster<f64>| -> Raster<f64> {
        let mut raster = raster;
        for ((r, c), v) in raster.data_mut().indexed_iter_mut() {
            if !region.contains(r, c) {
                *v = f64::NAN;
            }
        }
        raster.set_nodata(Some(f64::NAN));
        raster
    };
    Ok((clip(slope_deg), clip(wetness)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use irrigis_core::composite::SpectralIndex;
    use irrigis_core::raster::GeoTransform;
    use irrigis_core::sensor::Platform;

    const ROWS: usize = 6;
    const COLS: usize = 6;

    fn grid<T: irrigis_core::RasterElement>(value: T) -> Raster<T> {
        let mut r = Raster::filled(ROWS, COLS, value);
        r.set_transform(GeoTransform::new(500_000.0, 4_100_000.0, 30.0, -30.0));
        r
    }

    fn scene(platform: Platform, date: (i32, u32, u32), red: f64, nir: f64) -> Scene {
        let bands = [400.0, 800.0, red, nir, 1800.0, 1000.0].map(grid);
        Scene::new(
            platform,
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            bands,
        )
        .unwrap()
    }

    fn terrain() -> TerrainInputs {
        let mut dem = grid(0.0);
        for r in 0..ROWS {
            for c in 0..COLS {
                dem.set(r, c, (r * 3 + c) as f64).unwrap();
            }
        }
        TerrainInputs::new(dem)
    }

    fn request(aggregation: AggregationMode) -> CompositeRequest {
        let mut req = CompositeRequest::new(
            Sensor::Landsat,
            DateRange::parse("2019-01-01", "2020-01-01").unwrap(),
        )
        .with_aggregation(aggregation);
        req.sources = vec![Source::Index(SpectralIndex::Ndvi)];
        req.statistics = vec![Statistic::Mean, Statistic::Max];
        req.edge_buffer_m = Some(0.0);
        req
    }

    fn ndvi(red: f64, nir: f64) -> f64 {
        (nir - red) / (nir + red)
    }

    #[test]
    fn test_whole_period_statistics() {
        let scenes = vec![
            scene(Platform::Landsat8, (2019, 5, 3), 600.0, 3000.0),
            scene(Platform::Landsat7, (2019, 7, 14), 1000.0, 3000.0),
            // wrong sensor and out of range
            scene(Platform::Sentinel2A, (2019, 6, 1), 100.0, 3000.0),
            scene(Platform::Landsat8, (2021, 6, 1), 100.0, 3000.0),
        ];
        let region = Region::covering("test", &grid(0u8));
        let composite =
            build_composite(&scenes, &terrain(), &region, &request(AggregationMode::WholePeriod))
                .unwrap();

        assert_eq!(composite.metadata().scene_count, 2);
        let names: Vec<String> = composite.schema().keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(names, vec!["NDVI_mean", "NDVI_max", "slope", "TWI"]);

        let mean = composite.band(&"NDVI_mean".parse().unwrap()).unwrap();
        let expected = (ndvi(600.0, 3000.0) + ndvi(1000.0, 3000.0)) / 2.0;
        assert_relative_eq!(mean.get(2, 2).unwrap(), expected, epsilon = 1e-12);
        let max = composite.band(&"NDVI_max".parse().unwrap()).unwrap();
        assert_relative_eq!(max.get(0, 5).unwrap(), ndvi(600.0, 3000.0), epsilon = 1e-12);
    }

    #[test]
    fn test_cloudy_observations_are_skipped() {
        let cloudy_qa = grid(1u16 << 3);
        let scenes = vec![
            scene(Platform::Landsat8, (2019, 5, 3), 600.0, 3000.0),
            scene(Platform::Landsat8, (2019, 6, 3), 1000.0, 3000.0)
                .with_qa(cloudy_qa)
                .unwrap(),
        ];
        let region = Region::covering("test", &grid(0u8));
        let composite =
            build_composite(&scenes, &terrain(), &region, &request(AggregationMode::WholePeriod))
                .unwrap();
        let mean = composite.band(&"NDVI_mean".parse().unwrap()).unwrap();
        assert_relative_eq!(mean.get(1, 1).unwrap(), ndvi(600.0, 3000.0), epsilon = 1e-12);
    }

    #[test]
    fn test_monthly_gap_fill_from_adjacent_months() {
        let scenes = vec![
            scene(Platform::Landsat8, (2019, 6, 3), 600.0, 3000.0),
            scene(Platform::Landsat8, (2019, 8, 3), 1000.0, 3000.0),
        ];
        let region = Region::covering("test", &grid(0u8));
        let req = request(AggregationMode::Monthly).with_season(Season::Summer);
        let composite = build_composite(&scenes, &terrain(), &region, &req).unwrap();

        // 6 summer months x 2 statistics + slope + TWI
        assert_eq!(composite.band_count(), 14);
        let july = composite.band(&"NDVI_mean_07".parse().unwrap()).unwrap();
        let expected = (ndvi(600.0, 3000.0) + ndvi(1000.0, 3000.0)) / 2.0;
        assert_relative_eq!(july.get(3, 3).unwrap(), expected, epsilon = 1e-12);
        let june = composite.band(&"NDVI_mean_06".parse().unwrap()).unwrap();
        assert_relative_eq!(june.get(3, 3).unwrap(), ndvi(600.0, 3000.0), epsilon = 1e-12);
        // April has no scene in March, April or May
        let april = composite.band(&"NDVI_mean_04".parse().unwrap()).unwrap();
        assert!(april.get(3, 3).unwrap().is_nan());
    }

    #[test]
    fn test_seasonal_bands_and_region_clip() {
        let scenes = vec![
            scene(Platform::Landsat8, (2019, 6, 3), 600.0, 3000.0),
            scene(Platform::Landsat8, (2019, 11, 3), 1000.0, 3000.0),
        ];
        let mut mask = grid(1u8);
        mask.set(0, 0, 0).unwrap();
        let region = Region::from_mask("test", mask);
        let composite =
            build_composite(&scenes, &terrain(), &region, &request(AggregationMode::Seasonal))
                .unwrap();

        let winter = composite.band(&"NDVI_mean_winter".parse().unwrap()).unwrap();
        assert_relative_eq!(winter.get(2, 2).unwrap(), ndvi(1000.0, 3000.0), epsilon = 1e-12);
        assert!(winter.get(0, 0).unwrap().is_nan());
        assert!(composite.band(&BandKey::slope()).unwrap().get(0, 0).unwrap().is_nan());
        assert!(composite.band(&BandKey::twi()).unwrap().get(3, 3).unwrap().is_finite());
    }

    #[test]
    fn test_edge_buffer_erodes_scene_border() {
        let mut partial = scene(Platform::Landsat8, (2019, 6, 3), 600.0, 3000.0);
        for band in partial.reflectance.iter_mut() {
            for r in 0..ROWS {
                band.set(r, 0, f64::NAN).unwrap();
            }
        }
        let region = Region::covering("test", &grid(0u8));
        let mut req = request(AggregationMode::WholePeriod);
        req.edge_buffer_m = Some(30.0);
        let composite = build_composite(&[partial], &terrain(), &region, &req).unwrap();
        let mean = composite.band(&"NDVI_mean".parse().unwrap()).unwrap();
        assert!(mean.get(2, 1).unwrap().is_nan());
        assert!(mean.get(2, 2).unwrap().is_finite());
    }

    #[test]
    fn test_no_scene_is_an_error() {
        let region = Region::covering("test", &grid(0u8));
        let err = build_composite(&[], &terrain(), &region, &request(AggregationMode::WholePeriod))
            .unwrap_err();
        assert!(matches!(err, Error::Algorithm(_)));
    }
}
