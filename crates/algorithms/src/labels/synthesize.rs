//! Training-area synthesis

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use irrigis_core::composite::FeatureComposite;
use irrigis_core::raster::{Connectivity, Raster};
use irrigis_core::region::Region;
use irrigis_core::temporal::Season;
use irrigis_core::{Error, Result};

use super::rule::{Condition, RuleSet};
use crate::morphology::remove_small_patches;

/// CORINE land cover code of continuous urban fabric
pub const URBAN_FABRIC: u16 = 111;

/// Optional layers restricting where rules may match
#[derive(Debug, Clone, Default)]
pub struct ExclusionMasks {
    /// 1 inside protected habitat sites
    pub protected: Option<Raster<u8>>,
    /// Land cover class codes
    pub land_cover: Option<Raster<u16>>,
}

/// Parameters of the synthesizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthesisParams {
    /// Patches with fewer pixels are dropped; 0 or 1 disables the filter
    pub min_patch_size: usize,
    pub connectivity: Connectivity,
    /// Extra conditions a pixel must meet to be sampled
    pub eligibility: Vec<Condition>,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            min_patch_size: 25,
            connectivity: Connectivity::Eight,
            eligibility: Vec::new(),
        }
    }
}

/// Labelled training patches and the pixels that may be sampled
#[derive(Debug, Clone)]
pub struct TrainingAreas {
    labels: Raster<u8>,
    eligible: Raster<u8>,
    season: Option<Season>,
}

impl TrainingAreas {
    /// Assemble from existing layers; both must share one grid
    pub fn new(labels: Raster<u8>, eligible: Raster<u8>, season: Option<Season>) -> Result<Self> {
        labels.ensure_same_grid(&eligible)?;
        Ok(Self {
            labels,
            eligible,
            season,
        })
    }

    /// Class codes, 0 unlabelled
    pub fn labels(&self) -> &Raster<u8> {
        &self.labels
    }

    /// 1 where the pixel may be sampled or classified
    pub fn eligible(&self) -> &Raster<u8> {
        &self.eligible
    }

    pub fn season(&self) -> Option<Season> {
        self.season
    }

    pub fn labelled_count(&self) -> usize {
        self.labels.count_where(|v| v != 0)
    }
}

/// A rule with its condition bands resolved against the composite
struct BoundRule<'a> {
    code: u8,
    conditions: Vec<(&'a Raster<f64>, Condition)>,
    protected: Option<&'a Raster<u8>>,
    land_cover: Option<(&'a Raster<u16>, &'a [u16])>,
}

impl BoundRule<'_> {
    #[inline]
    fn matches(&self, row: usize, col: usize) -> bool {
        if let Some(mask) = self.protected {
            if mask.data()[(row, col)] != 0 {
                return false;
            }
        }
        if let Some((lc, codes)) = self.land_cover {
            if !codes.contains(&lc.data()[(row, col)]) {
                return false;
            }
        }
        self.conditions
            .iter()
            .all(|(band, c)| c.holds(band.data()[(row, col)]))
    }
}

/// Label the composite with a rule set.
///
/// Each pixel of the region takes the code of the last rule that matches
/// it. Rules flagged `exclude_protected` never match inside the protected
/// mask and rules with land cover codes only match on those codes; when
/// the corresponding mask is absent the restriction is skipped with a
/// warning. Small patches are then removed.
pub fn synthesize(
    composite: &FeatureComposite,
    region: &Region,
    rules: &RuleSet,
    masks: &ExclusionMasks,
    params: &SynthesisParams,
) -> Result<TrainingAreas> {
    if rules.is_empty() {
        return Err(Error::InvalidParameter {
            name: "rules",
            value: "[]".into(),
            reason: "at least one rule is required".into(),
        });
    }
    let template = composite.template();
    region.ensure_grid(template)?;
    if let Some(p) = &masks.protected {
        region.ensure_grid(p)?;
    }
    if let Some(lc) = &masks.land_cover {
        region.ensure_grid(lc)?;
    }

    let mut warned_protected = false;
    let mut warned_land_cover = false;
    let mut bound = Vec::with_capacity(rules.rules().len());
    for rule in rules.rules() {
        let conditions = rule
            .conditions
            .iter()
            .map(|c| Ok((composite.band(&c.band)?, *c)))
            .collect::<Result<Vec<_>>>()?;

        let protected = if rule.exclude_protected {
            if masks.protected.is_none() && !warned_protected {
                warn!("no protected-area mask, habitat exclusion disabled");
                warned_protected = true;
            }
            masks.protected.as_ref()
        } else {
            None
        };
        let land_cover = if rule.land_cover_codes.is_empty() {
            None
        } else {
            if masks.land_cover.is_none() && !warned_land_cover {
                warn!("no land cover raster, land cover restriction disabled");
                warned_land_cover = true;
            }
            masks
                .land_cover
                .as_ref()
                .map(|lc| (lc, rule.land_cover_codes.as_slice()))
        };
        bound.push(BoundRule {
            code: rule.class.code(),
            conditions,
            protected,
            land_cover,
        });
    }

    let eligibility = params
        .eligibility
        .iter()
        .map(|c| Ok((composite.band(&c.band)?, *c)))
        .collect::<Result<Vec<_>>>()?;

    let (rows, cols) = composite.shape();
    let pixels: Vec<(u8, u8)> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut values = Vec::with_capacity(composite.band_count());
            let mut row_data = vec![(0u8, 0u8); cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                if !region.contains(row, col) {
                    continue;
                }
                let label = bound
                    .iter()
                    .rev()
                    .find(|r| r.matches(row, col))
                    .map_or(0, |r| r.code);
                let eligible = composite.pixel_into(row, col, &mut values)
                    && eligibility
                        .iter()
                        .all(|(band, c)| c.holds(band.data()[(row, col)]));
                *out = (label, u8::from(eligible));
            }
            row_data
        })
        .collect();

    let (labels, eligible): (Vec<u8>, Vec<u8>) = pixels.into_iter().unzip();
    let labels = Array2::from_shape_vec((rows, cols), labels)
        .map_err(|e| Error::Other(e.to_string()))?;
    let eligible = Array2::from_shape_vec((rows, cols), eligible)
        .map_err(|e| Error::Other(e.to_string()))?;

    let mut labels = region.mask().with_data(labels)?;
    let raw = labels.count_where(|v| v != 0);
    labels = remove_small_patches(&labels, params.min_patch_size, params.connectivity)?;
    debug!(
        raw,
        kept = labels.count_where(|v| v != 0),
        min_patch_size = params.min_patch_size,
        "training patches filtered"
    );

    TrainingAreas::new(
        labels,
        region.mask().with_data(eligible)?,
        composite.metadata().season,
    )
}
