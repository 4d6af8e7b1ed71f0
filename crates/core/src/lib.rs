pub mod alert;
pub mod assessment;
pub mod decision;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod levels;
pub mod patterns;
pub mod pipeline;
pub mod series;
pub mod time;

pub use error::{AnalysisError, Result};
pub use pipeline::{Analysis, AnalysisConfig, Analyzer};

pub mod config {
    use crate::pipeline::AnalysisConfig;
    use anyhow::Context;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub analysis_config_path: Option<String>,
        pub alert_confidence_threshold: Option<f64>,
        pub analysis_min_factors: Option<usize>,
    }

    fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match std::env::var(name) {
            Ok(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse()
                .map(Some)
                .with_context(|| format!("{name} is not a valid value: {raw}")),
            _ => Ok(None),
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                analysis_config_path: std::env::var("ANALYSIS_CONFIG_PATH").ok(),
                alert_confidence_threshold: parse_var("ALERT_CONFIDENCE_THRESHOLD")?,
                analysis_min_factors: parse_var("ANALYSIS_MIN_FACTORS")?,
            })
        }

        /// Loads the analysis config from `ANALYSIS_CONFIG_PATH` (or the
        /// defaults) and applies the env overrides on top.
        pub fn analysis_config(&self) -> anyhow::Result<AnalysisConfig> {
            let config = match self.analysis_config_path.as_deref() {
                Some(path) => AnalysisConfig::from_json_file(path)?,
                None => AnalysisConfig::default(),
            };
            self.apply_overrides(config)
        }

        pub fn apply_overrides(&self, mut config: AnalysisConfig) -> anyhow::Result<AnalysisConfig> {
            if let Some(threshold) = self.alert_confidence_threshold {
                anyhow::ensure!(
                    (0.0..=1.0).contains(&threshold),
                    "ALERT_CONFIDENCE_THRESHOLD must be within [0, 1] (got {threshold})"
                );
                config.alert.confidence_threshold = threshold;
            }
            if let Some(min_factors) = self.analysis_min_factors {
                config.decision.min_factors = min_factors;
            }
            config.validate().context("invalid analysis config")?;
            Ok(config)
        }
    }

}
