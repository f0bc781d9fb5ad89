//! Static terrain covariates appended to every composite
//!
//! - Slope: Horn (1981) gradient of the elevation model
//! - TWI: topographic wetness index from flow accumulation and slope

mod slope;
mod twi;

pub use slope::{slope, Slope, SlopeParams, SlopeUnits};
pub use twi::{twi, TwiParams};
