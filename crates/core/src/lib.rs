//! # irrigis core
//!
//! Core types and I/O for irrigated-area mapping.
//!
//! This crate provides:
//! - `Raster<T>`: generic georeferenced grid
//! - `FeatureComposite` and its typed `BandSchema`
//! - `Region`, `Sensor`, `Season` and date windows
//! - Vector features for reference polygons
//! - GeoTIFF I/O

pub mod composite;
pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod region;
pub mod sensor;
pub mod temporal;
pub mod vector;

pub use composite::{BandKey, BandSchema, FeatureComposite};
pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use region::Region;
pub use sensor::Sensor;
pub use temporal::{DateRange, Season};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::composite::{BandKey, BandSchema, FeatureComposite};
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::region::Region;
    pub use crate::sensor::Sensor;
    pub use crate::temporal::{DateRange, Season};
    pub use crate::Algorithm;
}

/// Common shape of the raster algorithms.
///
/// Algorithms are pure functions from an input and parameters to an output.
pub trait Algorithm {
    type Input;
    type Output;
    type Params: Default;
    type Error: std::error::Error;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
