//! Spatial clean-up of classified maps
//!
//! A classified raster is reduced to a ternary irrigated-area map
//! (0 other, 1 irrigated tree, 2 irrigated crop), isolated speckles are
//! removed and small background pockets inside irrigated fields are filled.

use serde::{Deserialize, Serialize};
use tracing::debug;

use irrigis_core::raster::{Connectivity, Raster};
use irrigis_core::{Algorithm, Error, Result};

use crate::classification::ClassifiedRaster;
use crate::morphology::{fill_holes, remove_small_patches, HoleFillParams};

/// Parameters for [`postprocess`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostProcessParams {
    /// Class code of irrigated trees in the classifier output
    pub tree_class: u8,
    /// Class code of irrigated crops in the classifier output
    pub crop_class: u8,
    /// Components with fewer cells are reset to 0
    pub min_speckle_size: usize,
    pub speckle_connectivity: Connectivity,
    pub max_hole_size: usize,
    pub fill_radius: usize,
}

impl Default for PostProcessParams {
    fn default() -> Self {
        Self {
            tree_class: 6,
            crop_class: 5,
            min_speckle_size: 4,
            speckle_connectivity: Connectivity::Four,
            max_hole_size: 5,
            fill_radius: 2,
        }
    }
}

impl PostProcessParams {
    fn hole_fill(&self) -> HoleFillParams {
        HoleFillParams {
            max_hole_size: self.max_hole_size,
            fill_radius: self.fill_radius,
        }
    }
}

/// Ternary irrigated-area map: 0 other, 1 tree, 2 crop
#[derive(Debug, Clone)]
pub struct IrrigatedAreaRaster {
    raster: Raster<u8>,
}

impl IrrigatedAreaRaster {
    pub const OTHER: u8 = 0;
    pub const TREE: u8 = 1;
    pub const CROP: u8 = 2;

    /// Wrap a raster, rejecting values outside {0, 1, 2}
    pub fn from_raster(raster: Raster<u8>) -> Result<Self> {
        if let Some(&bad) = raster.data().iter().find(|&&v| v > Self::CROP) {
            return Err(Error::InvalidParameter {
                name: "irrigated_area",
                value: bad.to_string(),
                reason: "irrigated-area codes must be 0, 1 or 2".into(),
            });
        }
        Ok(Self { raster })
    }

    pub fn raster(&self) -> &Raster<u8> {
        &self.raster
    }

    pub fn into_raster(self) -> Raster<u8> {
        self.raster
    }

    pub fn shape(&self) -> (usize, usize) {
        self.raster.shape()
    }

    /// 1 where the map is irrigated (tree or crop)
    pub fn irrigated_mask(&self) -> Raster<u8> {
        self.raster.map(|v| u8::from(v != Self::OTHER))
    }
}

/// Collapse class codes to the ternary irrigated map
pub fn reduce_to_irrigated(classes: &Raster<u8>, tree_class: u8, crop_class: u8) -> Raster<u8> {
    classes.map(|v| {
        if v == crop_class {
            IrrigatedAreaRaster::CROP
        } else if v == tree_class {
            IrrigatedAreaRaster::TREE
        } else {
            IrrigatedAreaRaster::OTHER
        }
    })
}

/// Reduce, despeckle and hole-fill a classified raster.
pub fn postprocess(
    classified: &ClassifiedRaster,
    params: &PostProcessParams,
) -> Result<IrrigatedAreaRaster> {
    if params.tree_class == params.crop_class {
        return Err(Error::InvalidParameter {
            name: "tree_class",
            value: params.tree_class.to_string(),
            reason: "tree and crop classes must differ".into(),
        });
    }

    let ternary = reduce_to_irrigated(&classified.classes, params.tree_class, params.crop_class);
    let despeckled = remove_small_patches(
        &ternary,
        params.min_speckle_size,
        params.speckle_connectivity,
    )?;
    let filled = fill_holes(&despeckled, &params.hole_fill())?;

    debug!(
        irrigated = ternary.count_where(|v| v != 0),
        despeckled = despeckled.count_where(|v| v != 0),
        filled = filled.count_where(|v| v != 0),
        "post-processed irrigated map"
    );

    IrrigatedAreaRaster::from_raster(filled)
}

/// Post-processing as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct PostProcess;

impl Algorithm for PostProcess {
    type Input = ClassifiedRaster;
    type Output = IrrigatedAreaRaster;
    type Params = PostProcessParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "PostProcess"
    }

    fn description(&self) -> &'static str {
        "Reduce a class map to irrigated tree/crop and clean speckles and holes"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        postprocess(&input, &params)
    }
}
