//! Full session run on a synthetic scene stack, including the
//! skip-on-rerun behaviour of the result export.

use std::sync::Arc;

use chrono::NaiveDate;
use geo_types::{polygon, Geometry};

use irrigis_algorithms::compositing::{Scene, TerrainInputs};
use irrigis_algorithms::fusion::AnnualClass;
use irrigis_algorithms::labels::{ExclusionMasks, TrainingClass};
use irrigis_algorithms::postprocess::IrrigatedAreaRaster;
use irrigis_core::crs::CRS;
use irrigis_core::sensor::{Platform, Sensor};
use irrigis_core::temporal::Season;
use irrigis_core::vector::{Feature, FeatureCollection};
use irrigis_core::{GeoTransform, Raster, Region};
use irrigis_pipeline::{
    build_feature_composite, classify, export_feature_composite, export_fused,
    export_training_areas, fuse_seasons, synthesize_training_labels, validate, Asset, AssetId,
    ClassificationRun, ClassifyOutcome, CompositeInputs, InMemoryStore, LocalJobService,
    PipelineConfig, Session,
};

const N: usize = 40;
const X0: f64 = 600_000.0;
const Y0: f64 = 4_200_000.0;
const CELL: f64 = 30.0;

const CONFIG: &str = r#"
[composite]
sources = ["NDVI", "NDWI"]
statistics = ["median", "max"]
edge_buffer_m = 0.0

[[rules.summer]]
class = "rainfed"
when = ["NDVI_median < 0.3"]

[[rules.summer]]
class = "irrigated_trees"
when = ["NDVI_median >= 0.45", "NDVI_median < 0.68"]

[[rules.summer]]
class = "irrigated_crops"
when = ["NDVI_median >= 0.7"]

[sampling]
min_points = 50
max_points = 200

[classification.classifier]
kind = "random_forest"
trees = 25
min_leaf_population = 1

[validation.reference]
max_area_m2 = 1000000.0
fraction = 1.0

[jobs]
poll_interval_s = 0.0
retry_delay_s = 0.0
"#;

fn grid(value: f64) -> Raster<f64> {
    let mut r = Raster::filled(N, N, value);
    r.set_transform(GeoTransform::new(X0, Y0, CELL, -CELL));
    r.set_crs(Some(CRS::etrs89_utm(30)));
    r
}

/// Top-left quadrant irrigated crops, bottom-left irrigated trees, right half dry
fn scene(month: u32, day: u32, shift: f64) -> Scene {
    let mut red = grid(0.0);
    let mut nir = grid(0.0);
    for r in 0..N {
        for c in 0..N {
            let noise = ((r * 7 + c * 13) % 11) as f64 * 10.0 + shift;
            let (rv, nv) = match (r < N / 2, c < N / 2) {
                (true, true) => (500.0 + noise, 4000.0),
                (false, true) => (800.0 + noise, 3000.0),
                _ => (2000.0 + noise, 2500.0),
            };
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

fn inputs() -> CompositeInputs {
    let mut dem = grid(0.0);
    for r in 0..N {
        for c in 0..N {
            dem.set(r, c, 100.0 + r as f64 * 0.5 + c as f64 * 0.2).unwrap();
        }
    }
    CompositeInputs {
        scenes: vec![scene(5, 10, 0.0), scene(6, 11, 20.0), scene(7, 13, -20.0), scene(8, 14, 10.0)],
        terrain: TerrainInputs::new(dem),
    }
}

fn session(config: PipelineConfig) -> (Session, Arc<InMemoryStore>, Arc<LocalJobService>) {
    let store = Arc::new(InMemoryStore::new());
    let jobs = Arc::new(LocalJobService::new(store.clone()));
    (Session::new(config, store.clone(), jobs.clone()), store, jobs)
}

fn square(x: f64, y: f64, size: f64) -> Feature {
    Feature::new(Geometry::Polygon(polygon![
        (x: x, y: y - size),
        (x: x + size, y: y - size),
        (x: x + size, y: y),
        (x: x, y: y),
    ]))
}

#[test]
fn test_summer_session_end_to_end() {
    let (session, store, jobs) = session(PipelineConfig::from_toml_str(CONFIG).unwrap());
    let inputs = inputs();
    let region = Region::covering("synthetic", &inputs.terrain.dem);
    let date_range = Season::Summer.date_range(2019).unwrap();

    let composite = build_feature_composite(
        &session,
        &inputs,
        &region,
        date_range,
        Sensor::Landsat,
        Some(Season::Summer),
    )
    .unwrap();
    assert_eq!(composite.band_count(), 6);
    let composite_job = export_feature_composite(&session, &composite).unwrap();
    assert_eq!(
        composite_job.job().unwrap().asset_id.as_str(),
        "data/synthetic/landsat/all_scenes_reduced/feature_data_synthetic_summer_2019"
    );

    let training = synthesize_training_labels(
        &session,
        &region,
        &composite,
        Season::Summer,
        &ExclusionMasks::default(),
    )
    .unwrap();
    assert_eq!(training.labelled_count(), 1600);
    let training_job = export_training_areas(&session, &region, &training, Season::Summer, 2019).unwrap();

    let spec = session.config().classification.classifier.clone();
    let run = ClassificationRun::new(Season::Summer, 2019);
    let outcome = classify(&session, &composite, &training, &region, &spec, &run).unwrap();
    let (classify_job, summer) = match outcome {
        ClassifyOutcome::Submitted {
            job,
            irrigated,
            budget,
            ..
        } => {
            assert_eq!(budget.quota(TrainingClass::Rainfed.code()), 160);
            assert_eq!(budget.total(), 320);
            (job, irrigated)
        }
        ClassifyOutcome::Skipped { asset } => panic!("unexpected skip of {asset}"),
    };
    assert_eq!(
        classify_job.asset_id.as_str(),
        "results/random_forest/synthetic/ia_random_forest_25tr_2vps_50bf_synthetic_summer_2019"
    );
    assert_eq!(summer.raster().count_where(|v| v == IrrigatedAreaRaster::CROP), 400);
    assert_eq!(summer.raster().count_where(|v| v == IrrigatedAreaRaster::TREE), 400);

    let report = session
        .tracker()
        .track(
            session.jobs(),
            vec![
                ("composite".to_string(), composite_job.job().unwrap().clone()),
                ("training".to_string(), training_job.job().unwrap().clone()),
                ("classification".to_string(), classify_job.clone()),
            ],
        )
        .unwrap();
    assert_eq!(report.completed.len(), 3);
    assert!(report.skipped.is_empty());

    match store.get(&classify_job.asset_id).unwrap() {
        Some(Asset::ClassMap(stored)) => assert_eq!(stored.data(), summer.raster().data()),
        other => panic!("unexpected {other:?}"),
    }

    let winter = IrrigatedAreaRaster::from_raster(summer.raster().like(0)).unwrap();
    let fused = fuse_seasons(&session, &summer, &winter, &region, 2019).unwrap();
    assert_eq!(fused.annual.get(5, 5).unwrap(), AnnualClass::SummerCrops.code());
    assert_eq!(fused.annual.get(30, 5).unwrap(), AnnualClass::SummerTrees.code());
    let fused_job = export_fused(&session, &fused, &region).unwrap();
    assert_eq!(
        fused_job.job().unwrap().asset_id,
        AssetId::irrigated_area("synthetic", 2019, None).unwrap()
    );
    assert_eq!(jobs.submissions(), 4);

    let half = N as f64 / 2.0 * CELL;
    let reference: FeatureCollection = vec![square(X0, Y0, half), square(X0 + half, Y0, half)]
        .into_iter()
        .collect();
    let score = validate(&session, &summer.irrigated_mask(), &region, &reference).unwrap();
    approx::assert_abs_diff_eq!(score.area_ha, 72.0, epsilon = 1e-9);
    assert_eq!(score.polygons_scored, 2);
    approx::assert_abs_diff_eq!(score.mean_score.unwrap(), 0.5, epsilon = 1e-12);
}

#[test]
fn test_classify_twice_without_overwrite_submits_once() {
    let (session, _store, jobs) = session(PipelineConfig::from_toml_str(CONFIG).unwrap());
    let inputs = inputs();
    let region = Region::covering("synthetic", &inputs.terrain.dem);
    let composite = build_feature_composite(
        &session,
        &inputs,
        &region,
        Season::Summer.date_range(2019).unwrap(),
        Sensor::Landsat,
        Some(Season::Summer),
    )
    .unwrap();
    let training = synthesize_training_labels(
        &session,
        &region,
        &composite,
        Season::Summer,
        &ExclusionMasks::default(),
    )
    .unwrap();
    let spec = session.config().classification.classifier.clone();
    let run = ClassificationRun::new(Season::Summer, 2019);

    let first = classify(&session, &composite, &training, &region, &spec, &run).unwrap();
    assert!(!first.is_skipped());
    let second = classify(&session, &composite, &training, &region, &spec, &run).unwrap();
    match second {
        ClassifyOutcome::Skipped { asset } => assert_eq!(
            asset.name(),
            "ia_random_forest_25tr_2vps_50bf_synthetic_summer_2019"
        ),
        other => panic!("expected a skip, got {other:?}"),
    }
    assert_eq!(jobs.submissions(), 1);
}

#[test]
fn test_classify_with_overwrite_resubmits() {
    let mut config = PipelineConfig::from_toml_str(CONFIG).unwrap();
    config.store.overwrite = true;
    config.store.folder = Some("calibration".into());
    let (session, store, jobs) = session(config);
    let inputs = inputs();
    let region = Region::covering("synthetic", &inputs.terrain.dem);
    let composite = build_feature_composite(
        &session,
        &inputs,
        &region,
        Season::Summer.date_range(2019).unwrap(),
        Sensor::Landsat,
        Some(Season::Summer),
    )
    .unwrap();
    let training = synthesize_training_labels(
        &session,
        &region,
        &composite,
        Season::Summer,
        &ExclusionMasks::default(),
    )
    .unwrap();
    let spec = session.config().classification.classifier.clone();
    let run = ClassificationRun::new(Season::Summer, 2019);

    classify(&session, &composite, &training, &region, &spec, &run).unwrap();
    let second = classify(&session, &composite, &training, &region, &spec, &run).unwrap();
    assert!(!second.is_skipped());
    assert_eq!(jobs.submissions(), 2);
    assert_eq!(store.len(), 1);
    assert_eq!(
        store.ids().unwrap()[0].as_str(),
        "results/random_forest/synthetic/calibration/ia_random_forest_25tr_2vps_50bf_synthetic_summer_2019"
    );
}

#[test]
fn test_loss_year_layer_requires_coverage_year() {
    let (session, _store, _jobs) = session(PipelineConfig::from_toml_str(CONFIG).unwrap());
    let inputs = inputs();
    let region = Region::covering("synthetic", &inputs.terrain.dem);
    let composite = build_feature_composite(
        &session,
        &inputs,
        &region,
        Season::Summer.date_range(2019).unwrap(),
        Sensor::Landsat,
        Some(Season::Summer),
    )
    .unwrap();
    let training = synthesize_training_labels(
        &session,
        &region,
        &composite,
        Season::Summer,
        &ExclusionMasks::default(),
    )
    .unwrap();
    let spec = session.config().classification.classifier.clone();
    let run = ClassificationRun::new(Season::Summer, 2019)
        .with_loss_year(composite.template().with_same_meta::<u8>(N, N));

    let err = classify(&session, &composite, &training, &region, &spec, &run).unwrap_err();
    assert!(matches!(err, irrigis_pipeline::PipelineError::Config(_)));
}

#[test]
fn test_classification_is_bounded_by_eligible_area() {
    let config = PipelineConfig::from_toml_str(&format!(
        "{CONFIG}\n[synthesis]\neligibility = [\"NDVI_median < 0.7\"]\n"
    ))
    .unwrap();
    let (session, _store, _jobs) = session(config);
    let inputs = inputs();
    let region = Region::covering("synthetic", &inputs.terrain.dem);
    let composite = build_feature_composite(
        &session,
        &inputs,
        &region,
        Season::Summer.date_range(2019).unwrap(),
        Sensor::Landsat,
        Some(Season::Summer),
    )
    .unwrap();
    let training = synthesize_training_labels(
        &session,
        &region,
        &composite,
        Season::Summer,
        &ExclusionMasks::default(),
    )
    .unwrap();
    let ineligible = training.eligible().count_where(|v| v == 0);
    assert_eq!(ineligible, (N / 2) * (N / 2));

    let spec = session.config().classification.classifier.clone();
    let run = ClassificationRun::new(Season::Summer, 2019);
    let irrigated = match classify(&session, &composite, &training, &region, &spec, &run).unwrap() {
        ClassifyOutcome::Submitted { irrigated, .. } => irrigated,
        ClassifyOutcome::Skipped { asset } => panic!("unexpected skip of {asset}"),
    };

    let mapped_ineligible = training
        .eligible()
        .data()
        .iter()
        .zip(irrigated.raster().data().iter())
        .filter(|&(&eligible, &class)| eligible == 0 && class != IrrigatedAreaRaster::OTHER)
        .count();
    assert_eq!(mapped_ineligible, 0);
    assert_eq!(irrigated.raster().count_where(|v| v == IrrigatedAreaRaster::CROP), 0);
    assert_eq!(irrigated.raster().count_where(|v| v == IrrigatedAreaRaster::TREE), 400);
}
