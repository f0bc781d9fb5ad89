//! Pipeline configuration file (TOML)
//!
//! Every threshold of the pipeline lives here with its historical default.
//! A missing section or key falls back to that default; an unknown key is
//! an error so that typos do not silently change a run.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use irrigis_algorithms::classification::ClassifierSpec;
use irrigis_algorithms::labels::{RuleSet, SynthesisParams};
use irrigis_algorithms::postprocess::PostProcessParams;
use irrigis_algorithms::sampling::{QuotaParams, SamplingParams};
use irrigis_algorithms::validation::ValidationParams;
use irrigis_core::composite::{AggregationMode, BandSchema, Source, Statistic};
use irrigis_core::temporal::Season;

use crate::error::{PipelineError, Result};

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub composite: CompositeConfig,
    pub rules: RulesConfig,
    pub synthesis: SynthesisParams,
    pub sampling: SamplingConfig,
    pub classification: ClassificationConfig,
    pub postprocess: PostProcessParams,
    pub validation: ValidationParams,
    pub jobs: JobsConfig,
    pub store: StoreConfig,
}

impl PipelineConfig {
    /// Parse and check a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(text).map_err(|e| PipelineError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.composite.sources.is_empty() || self.composite.statistics.is_empty() {
            return Err(PipelineError::Config(
                "composite needs at least one source and one statistic".into(),
            ));
        }
        self.sampling.quota().validate()?;
        if self.sampling.tile_size == 0 {
            return Err(PipelineError::Config("sampling.tile_size must be positive".into()));
        }
        if self.validation.tile_scale == 0 {
            return Err(PipelineError::Config("validation.tile_scale must be positive".into()));
        }
        if !(self.jobs.poll_interval_s >= 0.0 && self.jobs.retry_delay_s >= 0.0) {
            return Err(PipelineError::Config("job delays must be non-negative".into()));
        }
        Ok(())
    }

    /// Labelling rules for `season`: the configured list, else the preset
    pub fn rules_for(&self, season: Season) -> RuleSet {
        let configured = match season {
            Season::Summer => self.rules.summer.as_ref(),
            Season::Winter => self.rules.winter.as_ref(),
        };
        configured
            .cloned()
            .unwrap_or_else(|| RuleSet::for_season(season))
    }
}

/// `[composite]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositeConfig {
    /// Reflectance roles and spectral indices to reduce
    pub sources: Vec<Source>,
    /// Reducers, percentiles written as `pNN`
    pub statistics: Vec<Statistic>,
    pub aggregation: AggregationMode,
    /// Scene border discarded, metres; sensor default when absent
    pub edge_buffer_m: Option<f64>,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            sources: Source::catalog(),
            statistics: Statistic::standard_set(),
            aggregation: AggregationMode::WholePeriod,
            edge_buffer_m: None,
        }
    }
}

/// `[rules]`: optional replacements of the preset rule lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    pub summer: Option<RuleSet>,
    pub winter: Option<RuleSet>,
}

/// `[sampling]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingConfig {
    pub fraction: f64,
    pub min_points: usize,
    pub max_points: usize,
    pub seed: u64,
    pub tile_size: usize,
    pub remove_outliers: bool,
    pub z_limit: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        let quota = QuotaParams::default();
        let sampler = SamplingParams::default();
        Self {
            fraction: quota.fraction,
            min_points: quota.min_points,
            max_points: quota.max_points,
            seed: sampler.seed,
            tile_size: sampler.tile_size,
            remove_outliers: sampler.remove_outliers,
            z_limit: sampler.z_limit,
        }
    }
}

impl SamplingConfig {
    pub fn quota(&self) -> QuotaParams {
        QuotaParams {
            fraction: self.fraction,
            min_points: self.min_points,
            max_points: self.max_points,
        }
    }

    pub fn sampler(&self) -> SamplingParams {
        SamplingParams {
            seed: self.seed,
            tile_size: self.tile_size,
            remove_outliers: self.remove_outliers,
            z_limit: self.z_limit,
        }
    }
}

/// `[classification]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassificationConfig {
    /// Bands fed to the classifier; every composite band when absent
    pub bands: Option<BandSchema>,
    pub classifier: ClassifierSpec,
    /// Last loss year covered by the disturbance layer, if one is supplied
    pub disturbance_last_year: Option<i32>,
}

/// `[jobs]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobsConfig {
    /// Seconds between two status sweeps
    pub poll_interval_s: f64,
    /// Seconds to wait before retrying a failed status call
    pub retry_delay_s: f64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            poll_interval_s: 60.0,
            retry_delay_s: 30.0,
        }
    }
}

impl JobsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_s)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay_s)
    }
}

/// `[store]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Extra folder level inserted in training and result paths
    pub folder: Option<String>,
    /// Replace existing outputs instead of skipping them
    pub overwrite: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use irrigis_core::composite::SpectralIndex;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.sampling.quota(), QuotaParams::default());
        assert_eq!(config.jobs.poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let text = PipelineConfig::default().to_toml_string().unwrap();
        let back = PipelineConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, PipelineConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = PipelineConfig::from_toml_str("[sampling]\nfractoin = 0.3\n").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_partial_sections() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [composite]
            sources = ["NDVI", "WGI", "R"]
            statistics = ["median", "p15"]

            [sampling]
            max_points = 6000

            [classification.classifier]
            kind = "random_forest"
            trees = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.composite.sources[0], Source::Index(SpectralIndex::Ndvi));
        assert_eq!(config.composite.statistics[1], Statistic::Percentile(15));
        assert_eq!(config.sampling.max_points, 6000);
        assert_eq!(config.sampling.min_points, 1000);
        assert_eq!(config.classification.classifier.hyper_tag(9), "100tr_3vps_50bf");
    }

    #[test]
    fn test_invalid_quota_rejected() {
        let err = PipelineConfig::from_toml_str("[sampling]\nmin_points = 10\nmax_points = 5\n")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Core(_)));
    }

    #[test]
    fn test_rules_fall_back_to_presets() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [[rules.winter]]
            class = "irrigated_crops"
            when = ["NDVI_median >= 0.5"]
            "#,
        )
        .unwrap();
        assert_eq!(config.rules_for(Season::Winter).rules().len(), 1);
        assert_eq!(
            config.rules_for(Season::Summer),
            RuleSet::for_season(Season::Summer)
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load("/nonexistent/irrigis.toml").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
