//! Product naming and storage
//!
//! Every product of a run has a deterministic [`AssetId`] built from the
//! region, sensor, method, season and year. Re-running with the same
//! parameters yields the same id, which makes the store's existence check
//! the idempotency test of the pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use irrigis_algorithms::labels::TrainingAreas;
use irrigis_core::composite::{AggregationMode, FeatureComposite};
use irrigis_core::io::{write_categorical_geotiff, write_geotiff};
use irrigis_core::raster::Raster;
use irrigis_core::sensor::Sensor;
use irrigis_core::temporal::Season;

use crate::error::{PipelineError, Result};

/// Slash-separated product path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(String);

impl AssetId {
    /// Id from a raw path; segments may hold letters, digits, `_` and `-`
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let valid = !path.is_empty()
            && path.split('/').all(|seg| {
                !seg.is_empty()
                    && seg
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            });
        if !valid {
            return Err(PipelineError::Config(format!("invalid asset id '{path}'")));
        }
        Ok(Self(path))
    }

    fn from_parts(parts: &[&str]) -> Result<Self> {
        Self::new(
            parts
                .iter()
                .filter(|p| !p.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join("/"),
        )
    }

    /// `data/{region}/{sensor}/{method}/feature_data_{region}_{season}_{year}`
    pub fn feature_data(
        region: &str,
        sensor: Sensor,
        aggregation: AggregationMode,
        season: Option<Season>,
        year: i32,
    ) -> Result<Self> {
        let season = season.map_or("annual", |s| s.as_str());
        let name = format!("feature_data_{region}_{season}_{year}");
        Self::from_parts(&["data", region, sensor.as_str(), aggregation.method_name(), &name])
    }

    /// `training_areas/{region}/{folder?}/training_areas_{season}_{region}_{year}`
    pub fn training_areas(
        region: &str,
        season: Season,
        year: i32,
        folder: Option<&str>,
    ) -> Result<Self> {
        let name = format!("training_areas_{}_{region}_{year}", season.as_str());
        Self::from_parts(&["training_areas", region, folder.unwrap_or(""), &name])
    }

    /// `results/{model}/{region}/{folder?}/ia_{model}_{hyper}_{region}_{season}_{year}`
    pub fn classification(
        model: &str,
        hyper: &str,
        region: &str,
        season: Season,
        year: i32,
        folder: Option<&str>,
    ) -> Result<Self> {
        let name = format!("ia_{model}_{hyper}_{region}_{}_{year}", season.as_str());
        Self::from_parts(&["results", model, region, folder.unwrap_or(""), &name])
    }

    /// `results/irrigated_area/{region}/{folder?}/irrigated_areas_{region}_{year}`
    pub fn irrigated_area(region: &str, year: i32, folder: Option<&str>) -> Result<Self> {
        let name = format!("irrigated_areas_{region}_{year}");
        Self::from_parts(&["results", "irrigated_area", region, folder.unwrap_or(""), &name])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored product
#[derive(Debug, Clone)]
pub enum Asset {
    Composite(FeatureComposite),
    TrainingAreas(TrainingAreas),
    /// Categorical map: irrigated-area or annual classes
    ClassMap(Raster<u8>),
}

impl Asset {
    pub fn kind(&self) -> &'static str {
        match self {
            Asset::Composite(_) => "composite",
            Asset::TrainingAreas(_) => "training_areas",
            Asset::ClassMap(_) => "class_map",
        }
    }
}

/// Where products are persisted.
///
/// `put` never replaces an existing asset; callers that want to overwrite
/// delete first.
pub trait AssetStore: Send + Sync {
    fn exists(&self, id: &AssetId) -> Result<bool>;

    /// Store `asset`, failing with [`PipelineError::AssetExists`] if `id` is taken
    fn put(&self, id: &AssetId, asset: Asset) -> Result<()>;

    /// Remove `id`; removing a missing asset is not an error
    fn delete(&self, id: &AssetId) -> Result<()>;
}

fn poisoned() -> PipelineError {
    PipelineError::Transport("asset store lock poisoned".into())
}

/// Process-local store, used by tests and dry runs
#[derive(Debug, Default)]
pub struct InMemoryStore {
    assets: RwLock<BTreeMap<AssetId, Asset>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &AssetId) -> Result<Option<Asset>> {
        Ok(self.assets.read().map_err(|_| poisoned())?.get(id).cloned())
    }

    pub fn ids(&self) -> Result<Vec<AssetId>> {
        Ok(self.assets.read().map_err(|_| poisoned())?.keys().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.assets.read().map_or(0, |a| a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetStore for InMemoryStore {
    fn exists(&self, id: &AssetId) -> Result<bool> {
        Ok(self.assets.read().map_err(|_| poisoned())?.contains_key(id))
    }

    fn put(&self, id: &AssetId, asset: Asset) -> Result<()> {
        let mut assets = self.assets.write().map_err(|_| poisoned())?;
        if assets.contains_key(id) {
            return Err(PipelineError::AssetExists(id.to_string()));
        }
        assets.insert(id.clone(), asset);
        Ok(())
    }

    fn delete(&self, id: &AssetId) -> Result<()> {
        self.assets.write().map_err(|_| poisoned())?.remove(id);
        Ok(())
    }
}

/// GeoTIFF files under a root directory.
///
/// An asset is a directory named after its id holding one file per layer:
/// `bands/{band}.tif` for composites, `labels.tif` and `eligible.tif` for
/// training areas and `classes.tif` for class maps.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, id: &AssetId) -> PathBuf {
        id.as_str().split('/').fold(self.root.clone(), |p, seg| p.join(seg))
    }

    fn write(&self, dir: &Path, asset: &Asset) -> Result<()> {
        match asset {
            Asset::Composite(composite) => {
                let bands = dir.join("bands");
                fs::create_dir_all(&bands).map_err(irrigis_core::Error::from)?;
                for (key, raster) in composite.iter() {
                    write_geotiff(raster, bands.join(format!("{key}.tif")))?;
                }
            }
            Asset::TrainingAreas(areas) => {
                write_categorical_geotiff(areas.labels(), dir.join("labels.tif"))?;
                write_categorical_geotiff(areas.eligible(), dir.join("eligible.tif"))?;
            }
            Asset::ClassMap(raster) => {
                write_categorical_geotiff(raster, dir.join("classes.tif"))?;
            }
        }
        Ok(())
    }
}

impl AssetStore for DirectoryStore {
    fn exists(&self, id: &AssetId) -> Result<bool> {
        Ok(self.path_of(id).is_dir())
    }

    fn put(&self, id: &AssetId, asset: Asset) -> Result<()> {
        let dir = self.path_of(id);
        if dir.is_dir() {
            return Err(PipelineError::AssetExists(id.to_string()));
        }
        fs::create_dir_all(&dir).map_err(irrigis_core::Error::from)?;
        if let Err(e) = self.write(&dir, &asset) {
            // leave no half-written asset behind
            let _ = fs::remove_dir_all(&dir);
            return Err(e);
        }
        Ok(())
    }

    fn delete(&self, id: &AssetId) -> Result<()> {
        let dir = self.path_of(id);
        if dir.is_dir() {
            fs::remove_dir_all(&dir).map_err(irrigis_core::Error::from)?;
        }
        Ok(())
    }
}
