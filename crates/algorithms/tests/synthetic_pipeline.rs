//! End-to-end run on a synthetic scene stack: composite, labels, sampling,
//! random forest, post-processing, fusion and validation.

use chrono::NaiveDate;
use geo_types::polygon;

use irrigis_algorithms::classification::{predict_raster, train, ClassifierSpec, RandomForestParams};
use irrigis_algorithms::compositing::{build_composite, CompositeRequest, Scene, TerrainInputs};
use irrigis_algorithms::fusion::{fuse, AnnualClass};
use irrigis_algorithms::labels::{synthesize, ExclusionMasks, Rule, RuleSet, SynthesisParams, TrainingClass};
use irrigis_algorithms::postprocess::{postprocess, IrrigatedAreaRaster, PostProcessParams};
use irrigis_algorithms::sampling::{
    class_pixel_counts, stratified_sample, ClassPointBudget, QuotaParams, SamplingParams,
};
use irrigis_algorithms::validation::{validate, ValidationParams};
use irrigis_core::composite::{SpectralIndex, Statistic, Source};
use irrigis_core::crs::CRS;
use irrigis_core::sensor::{Platform, Sensor};
use irrigis_core::temporal::Season;
use irrigis_core::{GeoTransform, Raster, Region};

const N: usize = 40;
const X0: f64 = 600_000.0;
const Y0: f64 = 4_200_000.0;
const CELL: f64 = 30.0;

fn grid(value: f64) -> Raster<f64> {
    let mut r = Raster::filled(N, N, value);
    r.set_transform(GeoTransform::new(X0, Y0, CELL, -CELL));
    r.set_crs(Some(CRS::etrs89_utm(30)));
    r
}

/// Top-left quadrant irrigated crops, bottom-left irrigated trees, right half dry
fn red_nir(row: usize, col: usize, date_shift: f64) -> (f64, f64) {
    let noise = ((row * 7 + col * 13) % 11) as f64 * 10.0 + date_shift;
    match (row < N / 2, col < N / 2) {
        (true, true) => (500.0 + noise, 4000.0),
        (false, true) => (800.0 + noise, 3000.0),
        _ => (2000.0 + noise, 2500.0),
    }
}

fn scene(month: u32, day: u32, date_shift: f64) -> Scene {
    let mut red = grid(0.0);
    let mut nir = grid(0.0);
    for r in 0..N {
        for c in 0..N {
            let (rv, nv) = red_nir(r, c, date_shift);
            red.set(r, c, rv).unwrap();
            nir.set(r, c, nv).unwrap();
        }
    }
    let bands = [grid(400.0), grid(800.0), red, nir, grid(1800.0), grid(1000.0)];
    Scene::new(
        Platform::Landsat8,
        NaiveDate::from_ymd_opt(2019, month, day).unwrap(),
        bands,
    )
    .unwrap()
}

fn dem() -> Raster<f64> {
    let mut dem = grid(0.0);
    for r in 0..N {
        for c in 0..N {
            dem.set(r, c, 100.0 + r as f64 * 0.5 + c as f64 * 0.2).unwrap();
        }
    }
    dem
}

fn rules() -> RuleSet {
    RuleSet::new(vec![
        Rule::new(TrainingClass::Rainfed, &["NDVI_median < 0.3"]).unwrap(),
        Rule::new(
            TrainingClass::IrrigatedTrees,
            &["NDVI_median >= 0.45", "NDVI_median < 0.68"],
        )
        .unwrap(),
        Rule::new(TrainingClass::IrrigatedCrops, &["NDVI_median >= 0.7"]).unwrap(),
    ])
}

#[test]
fn test_summer_run_maps_the_synthetic_fields() {
    let scenes: Vec<Scene> = [(5, 10, 0.0), (6, 11, 20.0), (7, 13, -20.0), (8, 14, 10.0)]
        .into_iter()
        .map(|(m, d, s)| scene(m, d, s))
        .collect();
    let dem = dem();
    let region = Region::covering("synthetic", &dem);

    let mut request = CompositeRequest::new(Sensor::Landsat, Season::Summer.date_range(2019).unwrap())
        .with_season(Season::Summer);
    request.sources = vec![Source::Index(SpectralIndex::Ndvi), Source::Index(SpectralIndex::Ndwi)];
    request.statistics = vec![Statistic::Median, Statistic::Max];
    request.edge_buffer_m = Some(0.0);

    let composite = build_composite(&scenes, &TerrainInputs::new(dem), &region, &request).unwrap();
    assert_eq!(composite.metadata().scene_count, 4);
    assert_eq!(composite.band_count(), 6);

    let areas = synthesize(
        &composite,
        &region,
        &rules(),
        &ExclusionMasks::default(),
        &SynthesisParams::default(),
    )
    .unwrap();
    let counts = class_pixel_counts(areas.labels(), areas.eligible()).unwrap();
    assert_eq!(counts.get(&TrainingClass::IrrigatedCrops.code()), Some(&400));
    assert_eq!(counts.get(&TrainingClass::IrrigatedTrees.code()), Some(&400));
    assert_eq!(counts.get(&TrainingClass::Rainfed.code()), Some(&800));

    let quota = QuotaParams {
        fraction: 0.2,
        min_points: 50,
        max_points: 200,
    };
    let budget = ClassPointBudget::from_counts(&counts, &quota).unwrap();
    assert_eq!(budget.quota(TrainingClass::Rainfed.code()), 160);

    let sample = stratified_sample(&composite, &areas, &budget, &SamplingParams::default()).unwrap();
    assert_eq!(sample.len(), 80 + 80 + 160);

    let spec = ClassifierSpec::RandomForest(RandomForestParams {
        trees: 25,
        min_leaf_population: 1,
        ..Default::default()
    });
    let model = train(&spec, &sample).unwrap();
    let classified = predict_raster(model.as_ref(), &composite, areas.eligible(), None).unwrap();
    assert_eq!(classified.classes.get(5, 5).unwrap(), TrainingClass::IrrigatedCrops.code());
    assert_eq!(classified.classes.get(30, 5).unwrap(), TrainingClass::IrrigatedTrees.code());
    assert_eq!(classified.classes.get(5, 30).unwrap(), TrainingClass::Rainfed.code());

    let summer = postprocess(&classified, &PostProcessParams::default()).unwrap();
    assert_eq!(summer.raster().count_where(|v| v == IrrigatedAreaRaster::CROP), 400);
    assert_eq!(summer.raster().count_where(|v| v == IrrigatedAreaRaster::TREE), 400);

    // crop quadrant in map coordinates
    let half = N as f64 / 2.0 * CELL;
    let crop_field = polygon![
        (x: X0, y: Y0 - half),
        (x: X0 + half, y: Y0 - half),
        (x: X0 + half, y: Y0),
        (x: X0, y: Y0),
    ];
    let dry_field = polygon![
        (x: X0 + half, y: Y0 - 2.0 * half),
        (x: X0 + 2.0 * half, y: Y0 - 2.0 * half),
        (x: X0 + 2.0 * half, y: Y0),
        (x: X0 + half, y: Y0),
    ];
    let score = validate(
        &summer.irrigated_mask(),
        &region,
        &[crop_field, dry_field],
        &ValidationParams::default(),
    )
    .unwrap();
    // 800 cells of 900 m2
    assert!((score.area_ha - 72.0).abs() < 1e-9);
    assert_eq!(score.polygons_scored, 2);
    assert_eq!(score.polygon_scores[0].score, 1.0);
    assert_eq!(score.polygon_scores[1].score, 0.0);

    let winter = IrrigatedAreaRaster::from_raster(summer.raster().like(0)).unwrap();
    let fused = fuse(&summer, &winter, &region, 2019).unwrap();
    assert_eq!(fused.annual.get(5, 5).unwrap(), AnnualClass::SummerCrops.code());
    assert_eq!(fused.annual.get(30, 5).unwrap(), AnnualClass::SummerTrees.code());
    assert_eq!(fused.annual.get(5, 30).unwrap(), AnnualClass::NotIrrigated.code());
}
