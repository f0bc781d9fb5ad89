//! Typed band keys of a feature composite.
//!
//! A band is identified by what was measured (a reflectance role, a
//! spectral index or a static covariate), how the time series was reduced
//! and over which period. Keys have a canonical string form such as
//! `NDVI_mean`, `WGI_stdDev`, `R_p15`, `NDVI_median_07`, `WGI_min_summer`,
//! `slope` or `TWI`, used in configuration files and product metadata.

use crate::error::{Error, Result};
use crate::temporal::Season;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Spectral role of a surface reflectance band, shared by all sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reflectance {
    Blue,
    Green,
    Red,
    Nir,
    Swir1,
    Swir2,
}

impl Reflectance {
    pub const ALL: [Reflectance; 6] = [
        Reflectance::Blue,
        Reflectance::Green,
        Reflectance::Red,
        Reflectance::Nir,
        Reflectance::Swir1,
        Reflectance::Swir2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Reflectance::Blue => "B",
            Reflectance::Green => "G",
            Reflectance::Red => "R",
            Reflectance::Nir => "NIR",
            Reflectance::Swir1 => "SWIR",
            Reflectance::Swir2 => "SWIR2",
        }
    }

    /// Position in a scene's reflectance array
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Band-ratio indices derived per scene before reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpectralIndex {
    /// Normalized difference vegetation index, nd(NIR, R)
    Ndvi,
    /// Gao water index, nd(NIR, SWIR)
    Ndwi,
    /// Open water / built-up water index, nd(G, SWIR)
    Ndwbi,
    /// Built-up index, nd(SWIR, NIR)
    Ndbi,
    /// Green chlorophyll vegetation index, NIR / G - 1
    Gcvi,
    /// Wet green index, NDWI x GCVI
    Wgi,
    /// Enhanced vegetation index
    Evi,
    /// Soil adjusted vegetation index
    Savi,
    /// Green index, NIR / G
    Gi,
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 9] = [
        SpectralIndex::Ndvi,
        SpectralIndex::Ndwi,
        SpectralIndex::Ndwbi,
        SpectralIndex::Ndbi,
        SpectralIndex::Gcvi,
        SpectralIndex::Wgi,
        SpectralIndex::Evi,
        SpectralIndex::Savi,
        SpectralIndex::Gi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "NDVI",
            SpectralIndex::Ndwi => "NDWI",
            SpectralIndex::Ndwbi => "NDWBI",
            SpectralIndex::Ndbi => "NDBI",
            SpectralIndex::Gcvi => "GCVI",
            SpectralIndex::Wgi => "WGI",
            SpectralIndex::Evi => "EVI",
            SpectralIndex::Savi => "SAVI",
            SpectralIndex::Gi => "GI",
        }
    }
}

/// Time-invariant terrain layers appended to every composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StaticCovariate {
    /// Terrain slope in degrees
    Slope,
    /// Topographic wetness index
    Twi,
}

impl StaticCovariate {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaticCovariate::Slope => "slope",
            StaticCovariate::Twi => "TWI",
        }
    }
}

/// What a time-series band measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Source {
    Reflectance(Reflectance),
    Index(SpectralIndex),
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Reflectance(r) => r.as_str(),
            Source::Index(i) => i.as_str(),
        }
    }

    /// Every reflectance role and index, in catalog order
    pub fn catalog() -> Vec<Source> {
        Reflectance::ALL
            .iter()
            .copied()
            .map(Source::Reflectance)
            .chain(SpectralIndex::ALL.iter().copied().map(Source::Index))
            .collect()
    }
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Source::catalog()
            .into_iter()
            .find(|src| src.as_str() == s)
            .ok_or_else(|| Error::UnknownBand(s.to_string()))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Source {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Source> for String {
    fn from(source: Source) -> String {
        source.as_str().to_string()
    }
}

/// Per-pixel reducer applied to a time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Statistic {
    Mean,
    Median,
    Min,
    Max,
    /// Percentile in 1..=99
    Percentile(u8),
    StdDev,
}

impl Statistic {
    /// Statistics of the standard composite: mean, median, min, max,
    /// 85th and 15th percentiles and standard deviation
    pub fn standard_set() -> Vec<Statistic> {
        vec![
            Statistic::Mean,
            Statistic::Median,
            Statistic::Min,
            Statistic::Max,
            Statistic::Percentile(85),
            Statistic::Percentile(15),
            Statistic::StdDev,
        ]
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Mean => f.write_str("mean"),
            Statistic::Median => f.write_str("median"),
            Statistic::Min => f.write_str("min"),
            Statistic::Max => f.write_str("max"),
            Statistic::Percentile(p) => write!(f, "p{}", p),
            Statistic::StdDev => f.write_str("stdDev"),
        }
    }
}

impl FromStr for Statistic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mean" => Ok(Statistic::Mean),
            "median" => Ok(Statistic::Median),
            "min" => Ok(Statistic::Min),
            "max" => Ok(Statistic::Max),
            "stdDev" | "std" => Ok(Statistic::StdDev),
            _ => s
                .strip_prefix('p')
                .and_then(|p| p.parse::<u8>().ok())
                .filter(|p| (1..=99).contains(p))
                .map(Statistic::Percentile)
                .ok_or_else(|| Error::UnknownBand(s.to_string())),
        }
    }
}

impl TryFrom<String> for Statistic {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Statistic> for String {
    fn from(statistic: Statistic) -> String {
        statistic.to_string()
    }
}

/// Part of the observation window a statistic was computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    /// The whole date range
    Whole,
    /// One calendar month, 1..=12
    Month(u8),
    Season(Season),
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Whole => Ok(()),
            Period::Month(m) => write!(f, "{:02}", m),
            Period::Season(s) => f.write_str(s.as_str()),
        }
    }
}

/// Key of one composite band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BandKey {
    Temporal {
        source: Source,
        statistic: Statistic,
        period: Period,
    },
    Static(StaticCovariate),
}

impl BandKey {
    /// Whole-period statistic of a source
    pub fn temporal(source: Source, statistic: Statistic) -> Self {
        BandKey::Temporal {
            source,
            statistic,
            period: Period::Whole,
        }
    }

    /// Whole-period statistic of a spectral index
    pub fn index(index: SpectralIndex, statistic: Statistic) -> Self {
        Self::temporal(Source::Index(index), statistic)
    }

    /// Whole-period statistic of a reflectance band
    pub fn reflectance(band: Reflectance, statistic: Statistic) -> Self {
        Self::temporal(Source::Reflectance(band), statistic)
    }

    pub fn slope() -> Self {
        BandKey::Static(StaticCovariate::Slope)
    }

    pub fn twi() -> Self {
        BandKey::Static(StaticCovariate::Twi)
    }

    /// Same key restricted to another period
    pub fn with_period(self, period: Period) -> Self {
        match self {
            BandKey::Temporal {
                source, statistic, ..
            } => BandKey::Temporal {
                source,
                statistic,
                period,
            },
            other => other,
        }
    }
}

impl fmt::Display for BandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandKey::Static(c) => f.write_str(c.as_str()),
            BandKey::Temporal {
                source,
                statistic,
                period: Period::Whole,
            } => write!(f, "{}_{}", source.as_str(), statistic),
            BandKey::Temporal {
                source,
                statistic,
                period,
            } => write!(f, "{}_{}_{}", source.as_str(), statistic, period),
        }
    }
}

impl FromStr for BandKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        match name {
            "slope" => return Ok(BandKey::slope()),
            "TWI" | "MTI" => return Ok(BandKey::twi()),
            _ => {}
        }

        let unknown = || Error::UnknownBand(name.to_string());
        let mut parts = name.split('_');
        let source: Source = parts.next().ok_or_else(unknown)?.parse().map_err(|_| unknown())?;
        let statistic: Statistic = parts.next().ok_or_else(unknown)?.parse().map_err(|_| unknown())?;
        let period = match parts.next() {
            None => Period::Whole,
            Some(tag) => match tag.parse::<u8>() {
                Ok(m) if (1..=12).contains(&m) => Period::Month(m),
                Ok(_) => return Err(unknown()),
                Err(_) => Period::Season(tag.parse().map_err(|_| unknown())?),
            },
        };
        if parts.next().is_some() {
            return Err(unknown());
        }
        Ok(BandKey::Temporal {
            source,
            statistic,
            period,
        })
    }
}

impl TryFrom<String> for BandKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<BandKey> for String {
    fn from(key: BandKey) -> String {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names() {
        assert_eq!(BandKey::index(SpectralIndex::Ndvi, Statistic::Mean).to_string(), "NDVI_mean");
        assert_eq!(BandKey::index(SpectralIndex::Wgi, Statistic::StdDev).to_string(), "WGI_stdDev");
        assert_eq!(
            BandKey::reflectance(Reflectance::Red, Statistic::Percentile(15)).to_string(),
            "R_p15"
        );
        assert_eq!(
            BandKey::index(SpectralIndex::Ndvi, Statistic::Median)
                .with_period(Period::Month(7))
                .to_string(),
            "NDVI_median_07"
        );
        assert_eq!(
            BandKey::index(SpectralIndex::Wgi, Statistic::Min)
                .with_period(Period::Season(Season::Summer))
                .to_string(),
            "WGI_min_summer"
        );
        assert_eq!(BandKey::twi().to_string(), "TWI");
    }

    #[test]
    fn test_parse_names() {
        let key: BandKey = "NDWBI_mean".parse().unwrap();
        assert_eq!(key, BandKey::index(SpectralIndex::Ndwbi, Statistic::Mean));

        let key: BandKey = "SWIR_median_11".parse().unwrap();
        assert_eq!(
            key,
            BandKey::reflectance(Reflectance::Swir1, Statistic::Median).with_period(Period::Month(11))
        );

        assert_eq!("slope".parse::<BandKey>().unwrap(), BandKey::slope());
        assert_eq!("MTI".parse::<BandKey>().unwrap(), BandKey::twi());
    }

    #[test]
    fn test_parse_rejects_unknown() {
        for bad in ["NDXI_mean", "NDVI_avg", "NDVI", "NDVI_p100", "NDVI_mean_13", "NDVI_mean_spring", "NDVI_mean_07_x"] {
            assert!(
                matches!(bad.parse::<BandKey>(), Err(Error::UnknownBand(_))),
                "{} should not parse",
                bad
            );
        }
    }

    #[test]
    fn test_every_catalog_name_parses_back() {
        for source in Source::catalog() {
            for stat in Statistic::standard_set() {
                let key = BandKey::temporal(source, stat);
                assert_eq!(key.to_string().parse::<BandKey>().unwrap(), key);
            }
        }
    }
}
