//! Default summer and winter rule sets
//!
//! Thresholds were calibrated on Landsat composites of south-eastern Spain.
//! Reflectance thresholds apply to the median composite in scaled units
//! (10000 = 100 %).

use irrigis_core::composite::{BandKey, Reflectance, SpectralIndex, Statistic};

use super::rule::{Comparison, Condition, Rule, RuleSet, TrainingClass};
use super::synthesize::URBAN_FABRIC;

use super::rule::Comparison::{Ge, Gt, Le, Lt};
use irrigis_core::composite::SpectralIndex::{Ndbi, Ndvi, Ndwbi, Ndwi, Wgi};
use irrigis_core::composite::Statistic::{Mean, Min, StdDev};

fn slope(op: Comparison, value: f64) -> Condition {
    Condition::new(BandKey::slope(), op, value)
}

fn idx(index: SpectralIndex, statistic: Statistic, op: Comparison, value: f64) -> Condition {
    Condition::new(BandKey::index(index, statistic), op, value)
}

fn refl(band: Reflectance, op: Comparison, value: f64) -> Condition {
    Condition::new(BandKey::reflectance(band, Statistic::Median), op, value)
}

fn rule(class: TrainingClass, conditions: Vec<Condition>) -> Rule {
    Rule {
        class,
        conditions,
        exclude_protected: false,
        land_cover_codes: Vec::new(),
    }
}

impl RuleSet {
    /// Rules for the April to September composite
    pub fn summer() -> Self {
        RuleSet::new(vec![
            rule(
                TrainingClass::Scrub,
                vec![
                    slope(Gt, 5.0),
                    idx(Ndwi, StdDev, Ge, 0.0),
                    idx(Ndwi, StdDev, Le, 0.05),
                    idx(Wgi, Mean, Ge, -0.15),
                    idx(Wgi, Mean, Le, 0.0),
                    refl(Reflectance::Nir, Ge, 1700.0),
                    refl(Reflectance::Nir, Le, 2700.0),
                ],
            ),
            rule(
                TrainingClass::NaturalTrees,
                vec![slope(Gt, 8.0), idx(Ndvi, Min, Gt, 0.2), idx(Wgi, Min, Lt, 0.1)],
            ),
            rule(
                TrainingClass::Rainfed,
                vec![
                    slope(Le, 4.0),
                    idx(Ndbi, Min, Ge, 0.05),
                    idx(Ndbi, Min, Le, 0.15),
                    idx(Wgi, StdDev, Le, 0.05),
                    idx(Wgi, Min, Lt, -0.05),
                    idx(Ndwi, StdDev, Lt, 0.05),
                ],
            ),
            rule(
                TrainingClass::Greenhouses,
                vec![
                    slope(Le, 5.0),
                    idx(Ndwbi, Mean, Gt, -0.25),
                    idx(Ndwbi, Mean, Lt, -0.06),
                    refl(Reflectance::Blue, Ge, 1800.0),
                    idx(Ndwi, Mean, Gt, 0.0),
                ],
            ),
            rule(
                TrainingClass::IrrigatedCrops,
                vec![
                    slope(Le, 4.0),
                    idx(Wgi, Min, Lt, -0.05),
                    idx(Wgi, StdDev, Ge, 0.1),
                    idx(Ndwbi, Mean, Lt, -0.28),
                    idx(Ndwbi, Mean, Gt, -0.45),
                    idx(Ndwbi, Min, Gt, -0.5),
                ],
            )
            .excluding_protected(),
            rule(
                TrainingClass::IrrigatedTrees,
                vec![
                    slope(Le, 4.0),
                    idx(Wgi, Min, Gt, 0.05),
                    idx(Ndwbi, Mean, Lt, -0.28),
                    idx(Ndwbi, Mean, Gt, -0.4),
                ],
            )
            .excluding_protected(),
            rule(TrainingClass::Water, vec![idx(Ndwbi, Mean, Gt, 0.4)]),
            rule(
                TrainingClass::Urban,
                vec![
                    slope(Le, 4.0),
                    idx(Ndwbi, Min, Gt, -0.4),
                    idx(Ndwbi, Min, Lt, -0.25),
                    refl(Reflectance::Swir1, Gt, 2000.0),
                    refl(Reflectance::Swir1, Lt, 4000.0),
                    idx(Ndbi, Min, Lt, 0.1),
                    idx(Ndbi, Min, Gt, -0.05),
                    idx(Wgi, StdDev, Lt, 0.05),
                ],
            )
            .within_land_cover(&[URBAN_FABRIC]),
        ])
    }

    /// Rules for the October to March composite
    pub fn winter() -> Self {
        RuleSet::new(vec![
            rule(
                TrainingClass::Scrub,
                vec![
                    slope(Gt, 5.0),
                    idx(Ndwi, StdDev, Ge, 0.0),
                    idx(Ndwi, StdDev, Le, 0.08),
                    idx(Wgi, Mean, Ge, -0.1),
                    idx(Wgi, Mean, Le, 0.05),
                ],
            ),
            rule(
                TrainingClass::NaturalTrees,
                vec![
                    slope(Gt, 8.0),
                    idx(Ndvi, Min, Gt, 0.2),
                    refl(Reflectance::Nir, Lt, 2000.0),
                ],
            ),
            rule(
                TrainingClass::Rainfed,
                vec![
                    slope(Le, 4.0),
                    idx(Ndbi, Min, Ge, -0.05),
                    idx(Ndbi, Min, Le, 0.06),
                    idx(Wgi, StdDev, Ge, 0.0),
                    idx(Wgi, StdDev, Le, 0.2),
                    idx(Wgi, Min, Lt, -0.05),
                    idx(Wgi, Min, Ge, -0.13),
                    idx(Ndwi, StdDev, Lt, 0.1),
                ],
            ),
            rule(
                TrainingClass::Greenhouses,
                vec![
                    slope(Le, 5.0),
                    idx(Ndwbi, Mean, Gt, -0.25),
                    idx(Ndwbi, Mean, Lt, 0.1),
                    refl(Reflectance::Blue, Ge, 1500.0),
                    idx(Ndwi, Mean, Gt, 0.04),
                ],
            ),
            rule(
                TrainingClass::IrrigatedCrops,
                vec![
                    slope(Le, 4.0),
                    idx(Wgi, Min, Le, 0.0),
                    idx(Wgi, StdDev, Ge, 0.2),
                    idx(Ndwbi, Mean, Lt, -0.25),
                ],
            )
            .excluding_protected(),
            rule(
                TrainingClass::IrrigatedTrees,
                vec![slope(Le, 4.0), idx(Wgi, Min, Gt, 0.1), idx(Ndwbi, Mean, Lt, -0.25)],
            )
            .excluding_protected(),
            rule(TrainingClass::Water, vec![idx(Ndwbi, Mean, Gt, 0.4)]),
            rule(
                TrainingClass::Urban,
                vec![
                    idx(Ndwbi, Min, Gt, -0.35),
                    idx(Ndwbi, Min, Lt, -0.25),
                    refl(Reflectance::Swir1, Gt, 2000.0),
                    idx(Ndbi, Mean, Gt, -0.05),
                ],
            )
            .within_land_cover(&[URBAN_FABRIC]),
        ])
    }
}
