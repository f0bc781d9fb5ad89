//! Summer/winter fusion into an annual irrigation map
//!
//! Each seasonal ternary map is recoded so that the product of the two
//! codes identifies the combination uniquely:
//!
//! | summer \ winter | none (1) | tree (4) | crop (5) |
//! |-----------------|----------|----------|----------|
//! | none (1)        | 1 -> 0   | 4 -> 6   | 5 -> 5   |
//! | crop (2)        | 2 -> 3   | 8 -> 7   | 10 -> 1  |
//! | tree (3)        | 3 -> 4   | 12 -> 2  | 15 -> 7  |

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use irrigis_core::raster::Raster;
use irrigis_core::{Error, Region, Result};

use crate::postprocess::IrrigatedAreaRaster;

/// Annual irrigation class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AnnualClass {
    NotIrrigated = 0,
    YearRoundCrops = 1,
    YearRoundTrees = 2,
    SummerCrops = 3,
    SummerTrees = 4,
    WinterCrops = 5,
    WinterTrees = 6,
    Uncertain = 7,
}

impl AnnualClass {
    pub const ALL: [AnnualClass; 8] = [
        AnnualClass::NotIrrigated,
        AnnualClass::YearRoundCrops,
        AnnualClass::YearRoundTrees,
        AnnualClass::SummerCrops,
        AnnualClass::SummerTrees,
        AnnualClass::WinterCrops,
        AnnualClass::WinterTrees,
        AnnualClass::Uncertain,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            AnnualClass::NotIrrigated => "Not irrigated",
            AnnualClass::YearRoundCrops => "Year-round crops",
            AnnualClass::YearRoundTrees => "Year-round trees",
            AnnualClass::SummerCrops => "Summer crops",
            AnnualClass::SummerTrees => "Summer trees",
            AnnualClass::WinterCrops => "Winter crops",
            AnnualClass::WinterTrees => "Winter trees",
            AnnualClass::Uncertain => "Uncertain",
        }
    }
}

impl fmt::Display for AnnualClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Summer recode: other -> 1, crop -> 2, tree -> 3
pub fn summer_code(value: u8) -> Result<u8> {
    match value {
        IrrigatedAreaRaster::OTHER => Ok(1),
        IrrigatedAreaRaster::CROP => Ok(2),
        IrrigatedAreaRaster::TREE => Ok(3),
        v => Err(unexpected_code("summer", v)),
    }
}

/// Winter recode: other -> 1, tree -> 4, crop -> 5
pub fn winter_code(value: u8) -> Result<u8> {
    match value {
        IrrigatedAreaRaster::OTHER => Ok(1),
        IrrigatedAreaRaster::TREE => Ok(4),
        IrrigatedAreaRaster::CROP => Ok(5),
        v => Err(unexpected_code("winter", v)),
    }
}

fn unexpected_code(season: &'static str, value: u8) -> Error {
    Error::Algorithm(format!("{season} map holds code {value}, expected 0, 1 or 2"))
}

/// Annual class for a product of recoded summer and winter values
pub fn annual_class(product: u8) -> Result<AnnualClass> {
    let class = match product {
        1 => AnnualClass::NotIrrigated,
        10 => AnnualClass::YearRoundCrops,
        12 => AnnualClass::YearRoundTrees,
        2 => AnnualClass::SummerCrops,
        3 => AnnualClass::SummerTrees,
        5 => AnnualClass::WinterCrops,
        4 => AnnualClass::WinterTrees,
        8 | 15 => AnnualClass::Uncertain,
        other => {
            return Err(Error::Algorithm(format!(
                "seasonal product {other} has no annual class"
            )))
        }
    };
    Ok(class)
}

/// Annual class of one pixel from its summer and winter ternary values
pub fn fuse_pixel(summer: u8, winter: u8) -> Result<AnnualClass> {
    annual_class(summer_code(summer)? * winter_code(winter)?)
}

/// Annual map with the seasonal maps it was built from
#[derive(Debug, Clone)]
pub struct SeasonalFusionRaster {
    pub annual: Raster<u8>,
    pub summer: IrrigatedAreaRaster,
    pub winter: IrrigatedAreaRaster,
    pub year: i32,
}

impl SeasonalFusionRaster {
    /// Number of pixels in each annual class
    pub fn class_counts(&self) -> [usize; 8] {
        let mut counts = [0usize; 8];
        for &v in self.annual.data().iter() {
            if let Some(slot) = counts.get_mut(usize::from(v)) {
                *slot += 1;
            }
        }
        counts
    }
}

/// Fuse summer and winter irrigated-area maps of `year`.
///
/// Both maps must lie on the region grid. Pixels outside the region are 0.
pub fn fuse(
    summer: &IrrigatedAreaRaster,
    winter: &IrrigatedAreaRaster,
    region: &Region,
    year: i32,
) -> Result<SeasonalFusionRaster> {
    region.ensure_grid(summer.raster())?;
    region.ensure_grid(winter.raster())?;

    let (rows, cols) = summer.shape();
    let s = summer.raster().data();
    let w = winter.raster().data();

    let annual: Vec<u8> = (0..rows)
        .into_par_iter()
        .map(|row| {
            (0..cols)
                .map(|col| {
                    if !region.contains(row, col) {
                        return Ok(AnnualClass::NotIrrigated.code());
                    }
                    fuse_pixel(s[(row, col)], w[(row, col)]).map(AnnualClass::code)
                })
                .collect::<Result<Vec<u8>>>()
        })
        .collect::<Result<Vec<Vec<u8>>>>()?
        .into_iter()
        .flatten()
        .collect();

    let array = ndarray::Array2::from_shape_vec((rows, cols), annual)
        .map_err(|e| Error::Other(e.to_string()))?;
    let annual = summer.raster().with_data(array)?;

    let fused = SeasonalFusionRaster {
        annual,
        summer: summer.clone(),
        winter: winter.clone(),
        year,
    };
    debug!(year, counts = ?fused.class_counts(), "fused seasonal maps");
    Ok(fused)
}
