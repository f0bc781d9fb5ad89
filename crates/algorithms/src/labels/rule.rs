//! Threshold rules

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use irrigis_core::composite::BandKey;
use irrigis_core::temporal::Season;
use irrigis_core::{Error, Result};

/// Land-cover class of a training patch. Discriminants are the label codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TrainingClass {
    NaturalTrees = 1,
    Scrub = 2,
    Rainfed = 3,
    Greenhouses = 4,
    IrrigatedCrops = 5,
    IrrigatedTrees = 6,
    Water = 7,
    Urban = 8,
}

impl TrainingClass {
    pub const ALL: [TrainingClass; 8] = [
        TrainingClass::NaturalTrees,
        TrainingClass::Scrub,
        TrainingClass::Rainfed,
        TrainingClass::Greenhouses,
        TrainingClass::IrrigatedCrops,
        TrainingClass::IrrigatedTrees,
        TrainingClass::Water,
        TrainingClass::Urban,
    ];

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrainingClass::NaturalTrees => "Natural trees",
            TrainingClass::Scrub => "Scrub",
            TrainingClass::Rainfed => "Rainfed trees and crops",
            TrainingClass::Greenhouses => "Greenhouses",
            TrainingClass::IrrigatedCrops => "Irrigated crops",
            TrainingClass::IrrigatedTrees => "Irrigated trees",
            TrainingClass::Water => "Water",
            TrainingClass::Urban => "Urban",
        }
    }
}

/// Comparison operator of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }

    /// NaN never satisfies a comparison
    #[inline]
    pub fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
        }
    }
}

impl FromStr for Comparison {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "<" => Ok(Comparison::Lt),
            "<=" => Ok(Comparison::Le),
            ">" => Ok(Comparison::Gt),
            ">=" => Ok(Comparison::Ge),
            _ => Err(Error::InvalidParameter {
                name: "operator",
                value: s.to_string(),
                reason: "expected one of <, <=, >, >=".into(),
            }),
        }
    }
}

/// `band op value`, written as `"slope <= 4"` in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Condition {
    pub band: BandKey,
    pub op: Comparison,
    pub value: f64,
}

impl Condition {
    pub fn new(band: BandKey, op: Comparison, value: f64) -> Self {
        Self { band, op, value }
    }

    #[inline]
    pub fn holds(&self, band_value: f64) -> bool {
        self.op.holds(band_value, self.value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.band, self.op.as_str(), self.value)
    }
}

impl FromStr for Condition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let (Some(band), Some(op), Some(value), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::InvalidParameter {
                name: "condition",
                value: s.to_string(),
                reason: "expected '<band> <op> <value>'".into(),
            });
        };
        let value = value.parse::<f64>().map_err(|e| Error::InvalidParameter {
            name: "condition",
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            band: band.parse()?,
            op: op.parse()?,
            value,
        })
    }
}

impl TryFrom<String> for Condition {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Condition> for String {
    fn from(c: Condition) -> String {
        c.to_string()
    }
}

/// Conjunction of conditions assigning a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub class: TrainingClass,
    #[serde(rename = "when")]
    pub conditions: Vec<Condition>,
    /// Never match inside protected habitat sites
    #[serde(default)]
    pub exclude_protected: bool,
    /// Only match where the land cover raster holds one of these codes
    #[serde(default)]
    pub land_cover_codes: Vec<u16>,
}

impl Rule {
    /// Rule from condition strings such as `"WGI_min < -0.05"`
    pub fn new(class: TrainingClass, conditions: &[&str]) -> Result<Self> {
        Ok(Self {
            class,
            conditions: conditions
                .iter()
                .map(|c| c.parse())
                .collect::<Result<Vec<_>>>()?,
            exclude_protected: false,
            land_cover_codes: Vec::new(),
        })
    }

    pub fn excluding_protected(mut self) -> Self {
        self.exclude_protected = true;
        self
    }

    pub fn within_land_cover(mut self, codes: &[u16]) -> Self {
        self.land_cover_codes = codes.to_vec();
        self
    }
}

/// Ordered rules; when several match a pixel the last one wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Default rules of a season
    pub fn for_season(season: Season) -> Self {
        match season {
            Season::Summer => Self::summer(),
            Season::Winter => Self::winter(),
        }
    }

    /// Every band referenced by a condition
    pub fn bands(&self) -> BTreeSet<BandKey> {
        self.rules
            .iter()
            .flat_map(|r| r.conditions.iter().map(|c| c.band))
            .collect()
    }
}
