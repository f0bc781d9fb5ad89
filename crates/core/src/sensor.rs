//! Optical sensors and the platforms merged under each of them

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sensor family a composite is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensor {
    /// Landsat 5, 7, 8 and 9 merged, 30 m
    Landsat,
    /// Sentinel-2 A and B, 10 m
    Sentinel,
}

impl Sensor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sensor::Landsat => "landsat",
            Sensor::Sentinel => "sentinel",
        }
    }

    /// Working resolution in metres
    pub fn resolution_m(&self) -> f64 {
        match self {
            Sensor::Landsat => 30.0,
            Sensor::Sentinel => 10.0,
        }
    }

    /// Platforms whose scenes are merged into one collection
    pub fn platforms(&self) -> &'static [Platform] {
        match self {
            Sensor::Landsat => &[
                Platform::Landsat5,
                Platform::Landsat7,
                Platform::Landsat8,
                Platform::Landsat9,
            ],
            Sensor::Sentinel => &[Platform::Sentinel2A, Platform::Sentinel2B],
        }
    }

    /// Width of the scene border discarded before compositing, in metres.
    ///
    /// Landsat scene edges carry striping and partial-swath artefacts.
    pub fn default_edge_buffer_m(&self) -> f64 {
        match self {
            Sensor::Landsat => 6000.0,
            Sensor::Sentinel => 0.0,
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sensor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "landsat" => Ok(Sensor::Landsat),
            "sentinel" | "sentinel2" | "sentinel-2" | "s2" => Ok(Sensor::Sentinel),
            _ => Err(Error::UnknownSensor(s.to_string())),
        }
    }
}

/// Individual satellite a scene was acquired by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Landsat5,
    Landsat7,
    Landsat8,
    Landsat9,
    Sentinel2A,
    Sentinel2B,
}

impl Platform {
    pub fn sensor(&self) -> Sensor {
        match self {
            Platform::Landsat5 | Platform::Landsat7 | Platform::Landsat8 | Platform::Landsat9 => {
                Sensor::Landsat
            }
            Platform::Sentinel2A | Platform::Sentinel2B => Sensor::Sentinel,
        }
    }

    /// Layout of the platform's quality band
    pub fn qa_scheme(&self) -> QaScheme {
        match self {
            Platform::Landsat5 | Platform::Landsat7 => QaScheme::LandsatTm,
            Platform::Landsat8 | Platform::Landsat9 => QaScheme::LandsatOli,
            Platform::Sentinel2A | Platform::Sentinel2B => QaScheme::SentinelQa60,
        }
    }
}

/// Bit layout of a per-pixel quality word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QaScheme {
    /// Landsat 4-7 `pixel_qa`
    LandsatTm,
    /// Landsat 8-9 `pixel_qa`
    LandsatOli,
    /// Sentinel-2 `QA60`
    SentinelQa60,
}
