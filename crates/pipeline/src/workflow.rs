//! Pipeline entry points
//!
//! Each step runs the matching algorithm with the session's configuration
//! and, where the step produces a product, exports it under its
//! deterministic [`AssetId`].

use std::borrow::Cow;

use tracing::{debug, info};

use irrigis_algorithms::classification::{
    predict_raster, train, Classifier, ClassifierSpec, DisturbanceLayer,
};
use irrigis_algorithms::compositing::{build_composite, CompositeRequest, Scene, TerrainInputs};
use irrigis_algorithms::fusion::{fuse, SeasonalFusionRaster};
use irrigis_algorithms::labels::{synthesize, ExclusionMasks, TrainingAreas};
use irrigis_algorithms::postprocess::{postprocess, IrrigatedAreaRaster};
use irrigis_algorithms::sampling::{class_pixel_counts, stratified_sample, ClassPointBudget};
use irrigis_algorithms::validation::{
    sample_reference_polygons, validate_seasons, SeasonalValidation, ValidationScore,
};
use irrigis_core::composite::FeatureComposite;
use irrigis_core::raster::Raster;
use irrigis_core::region::Region;
use irrigis_core::sensor::Sensor;
use irrigis_core::temporal::{DateRange, Season};
use irrigis_core::vector::FeatureCollection;

use crate::assets::{Asset, AssetId};
use crate::error::{PipelineError, Result};
use crate::jobs::{ExportOutcome, JobHandle};
use crate::session::Session;

/// Raw inputs of a composite: the scene collection and terrain
#[derive(Debug, Clone)]
pub struct CompositeInputs {
    pub scenes: Vec<Scene>,
    pub terrain: TerrainInputs,
}

/// Build the feature composite of `region` over `date_range`.
///
/// Sources, statistics, aggregation and edge buffer come from
/// `[composite]`. With a season only scenes of its months are used.
pub fn build_feature_composite(
    session: &Session,
    inputs: &CompositeInputs,
    region: &Region,
    date_range: DateRange,
    sensor: Sensor,
    season: Option<Season>,
) -> Result<FeatureComposite> {
    let config = &session.config().composite;
    let mut request = CompositeRequest::new(sensor, date_range).with_aggregation(config.aggregation);
    request.sources = config.sources.clone();
    request.statistics = config.statistics.clone();
    request.edge_buffer_m = config.edge_buffer_m;
    if let Some(season) = season {
        request = request.with_season(season);
    }

    info!(
        region = region.name(),
        %sensor,
        scenes = inputs.scenes.len(),
        "building feature composite"
    );
    let composite = build_composite(&inputs.scenes, &inputs.terrain, region, &request)?;
    debug!(
        bands = composite.band_count(),
        used = composite.metadata().scene_count,
        "feature composite built"
    );
    Ok(composite)
}

/// Export a composite as `data/{region}/{sensor}/{method}/...`
pub fn export_feature_composite(session: &Session, composite: &FeatureComposite) -> Result<ExportOutcome> {
    let meta = composite.metadata();
    let id = AssetId::feature_data(
        &meta.region,
        meta.sensor,
        meta.aggregation,
        meta.season,
        meta.date_range.start_year(),
    )?;
    session.export(id, Asset::Composite(composite.clone()))
}

/// Label the composite with the rules configured for `season`
pub fn synthesize_training_labels(
    session: &Session,
    region: &Region,
    composite: &FeatureComposite,
    season: Season,
    masks: &ExclusionMasks,
) -> Result<TrainingAreas> {
    let rules = session.config().rules_for(season);
    let areas = synthesize(composite, region, &rules, masks, &session.config().synthesis)?;
    info!(
        region = region.name(),
        season = season.as_str(),
        labelled = areas.labelled_count(),
        "training areas synthesized"
    );
    Ok(areas)
}

/// Export training areas as `training_areas/{region}/...`
pub fn export_training_areas(
    session: &Session,
    region: &Region,
    areas: &TrainingAreas,
    season: Season,
    year: i32,
) -> Result<ExportOutcome> {
    let id = AssetId::training_areas(region.name(), season, year, session.folder())?;
    session.export(id, Asset::TrainingAreas(areas.clone()))
}

/// What a classification run is about
#[derive(Debug, Clone)]
pub struct ClassificationRun {
    pub season: Season,
    pub year: i32,
    /// Forest loss year layer; needs `classification.disturbance_last_year`
    pub loss_year: Option<Raster<u8>>,
}

impl ClassificationRun {
    pub fn new(season: Season, year: i32) -> Self {
        Self {
            season,
            year,
            loss_year: None,
        }
    }

    pub fn with_loss_year(mut self, loss_year: Raster<u8>) -> Self {
        self.loss_year = Some(loss_year);
        self
    }
}

/// Result of [`classify`]
#[derive(Debug)]
pub enum ClassifyOutcome {
    Submitted {
        job: JobHandle,
        model: Box<dyn Classifier>,
        irrigated: IrrigatedAreaRaster,
        budget: ClassPointBudget,
    },
    /// The result asset exists and overwriting is off; nothing was computed
    Skipped { asset: AssetId },
}

impl ClassifyOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, ClassifyOutcome::Skipped { .. })
    }
}

/// Train a classifier on the training areas, map the region and export
/// the post-processed irrigated-area raster.
///
/// The existence check runs first so that a finished run costs nothing
/// when repeated with `overwrite = false`.
pub fn classify(
    session: &Session,
    composite: &FeatureComposite,
    training: &TrainingAreas,
    region: &Region,
    hyperparameters: &ClassifierSpec,
    run: &ClassificationRun,
) -> Result<ClassifyOutcome> {
    let config = session.config();
    region.ensure_grid(composite.template())?;

    let features: Cow<'_, FeatureComposite> = match &config.classification.bands {
        Some(schema) => Cow::Owned(composite.select(schema)?),
        None => Cow::Borrowed(composite),
    };

    let asset_id = AssetId::classification(
        hyperparameters.model_name(),
        &hyperparameters.hyper_tag(features.band_count()),
        region.name(),
        run.season,
        run.year,
        session.folder(),
    )?;
    if !config.store.overwrite && session.store().exists(&asset_id)? {
        info!(asset = %asset_id, "already exists, skipping");
        return Ok(ClassifyOutcome::Skipped { asset: asset_id });
    }

    let disturbance = match &run.loss_year {
        Some(loss_year) => {
            let last_year = config.classification.disturbance_last_year.ok_or_else(|| {
                PipelineError::Config(
                    "classification.disturbance_last_year is required with a loss-year layer".into(),
                )
            })?;
            Some(DisturbanceLayer::new(loss_year.clone(), last_year))
        }
        None => None,
    };

    let counts = class_pixel_counts(training.labels(), training.eligible())?;
    let budget = ClassPointBudget::from_counts(&counts, &config.sampling.quota())?;
    for (class, quota) in budget.iter() {
        debug!(class, available = counts.get(&class).copied().unwrap_or(0), quota, "class quota");
    }

    let sample = stratified_sample(&features, training, &budget, &config.sampling.sampler())?;
    info!(
        model = hyperparameters.model_name(),
        points = sample.len(),
        bands = sample.width(),
        "training classifier"
    );
    let model = train(hyperparameters, &sample)?;

    let classified = predict_raster(
        model.as_ref(),
        &features,
        training.eligible(),
        disturbance.as_ref(),
    )?;
    let irrigated = postprocess(&classified, &config.postprocess)?;

    let raster = irrigated.raster().clone();
    match session.export(asset_id, Asset::ClassMap(raster))? {
        ExportOutcome::Submitted(job) => Ok(ClassifyOutcome::Submitted {
            job,
            model,
            irrigated,
            budget,
        }),
        ExportOutcome::Skipped(asset) => Ok(ClassifyOutcome::Skipped { asset }),
    }
}

/// Fuse the seasonal irrigated-area rasters of `year` into annual classes;
/// see [`export_fused`] to persist the result
pub fn fuse_seasons(
    _session: &Session,
    summer: &IrrigatedAreaRaster,
    winter: &IrrigatedAreaRaster,
    region: &Region,
    year: i32,
) -> Result<SeasonalFusionRaster> {
    let fused = fuse(summer, winter, region, year)?;
    let counts = fused.class_counts();
    info!(region = region.name(), year, ?counts, "seasons fused");
    Ok(fused)
}

/// Export a fused map as `results/irrigated_area/{region}/...`
pub fn export_fused(
    session: &Session,
    fused: &SeasonalFusionRaster,
    region: &Region,
) -> Result<ExportOutcome> {
    let id = AssetId::irrigated_area(region.name(), fused.year, session.folder())?;
    session.export(id, Asset::ClassMap(fused.annual.clone()))
}

/// Score a predicted mask against a draw of the reference polygons.
///
/// Reference features are exploded, filtered by area and sampled with the
/// `[validation.reference]` parameters before scoring.
pub fn validate(
    session: &Session,
    predicted_mask: &Raster<u8>,
    region: &Region,
    reference_polygons: &FeatureCollection,
) -> Result<ValidationScore> {
    let params = &session.config().validation;
    let polygons = sample_reference_polygons(reference_polygons, &params.reference)?;
    debug!(drawn = polygons.len(), "reference polygons sampled");
    let score = irrigis_algorithms::validation::validate(predicted_mask, region, &polygons, params)?;
    info!(
        region = region.name(),
        area_ha = score.area_ha,
        mean_score = ?score.mean_score,
        polygons = score.polygons_scored,
        "validation done"
    );
    Ok(score)
}

/// Score summer, winter and their union against the same reference draw
pub fn validate_seasonal(
    session: &Session,
    summer: &IrrigatedAreaRaster,
    winter: &IrrigatedAreaRaster,
    region: &Region,
    reference_polygons: &FeatureCollection,
) -> Result<SeasonalValidation> {
    let params = &session.config().validation;
    let polygons = sample_reference_polygons(reference_polygons, &params.reference)?;
    Ok(validate_seasons(summer, winter, region, &polygons, params)?)
}
