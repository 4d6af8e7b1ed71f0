//! The end-to-end analysis run and the alert entry points.

use crate::alert::{AlertConfig, AlertEvaluator, AlertStore, PriceUpdate};
use crate::assessment::{self, Assessment};
use crate::decision::{self, DecisionConfig, DecisionContext, ExternalSignals};
use crate::domain::{
    AlertEvent, BarInterval, IndicatorSet, IndicatorSpec, PatternEvent, RawBar, Recommendation,
};
use crate::error::{AnalysisError, Result};
use crate::indicators;
use crate::levels::{self, Levels, LevelsConfig};
use crate::patterns::{self, PatternConfig};
use crate::series::{self, Series, SeriesOptions};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

pub fn default_indicators() -> Vec<IndicatorSpec> {
    vec![
        IndicatorSpec::Sma { period: 20 },
        IndicatorSpec::Sma { period: 50 },
        IndicatorSpec::Ema { period: 20 },
        IndicatorSpec::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        },
        IndicatorSpec::Rsi { period: 14 },
        IndicatorSpec::Stochastic {
            k_period: 14,
            d_period: 3,
        },
        IndicatorSpec::Bollinger { period: 20, k: 2.0 },
        IndicatorSpec::Atr { period: 14 },
        IndicatorSpec::Obv,
        IndicatorSpec::Vwma { period: 20 },
    ]
}

/// Every tunable of one analysis run. Missing fields take their defaults, so
/// `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub indicators: Vec<IndicatorSpec>,
    pub series: SeriesOptions,
    pub patterns: PatternConfig,
    pub decision: DecisionConfig,
    pub levels: LevelsConfig,
    pub alert: AlertConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            indicators: default_indicators(),
            series: SeriesOptions::default(),
            patterns: PatternConfig::default(),
            decision: DecisionConfig::default(),
            levels: LevelsConfig::default(),
            alert: AlertConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read analysis config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid analysis config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid analysis config {}", path.display()))?;
        Ok(config)
    }

    /// Rejects tunables that would divide by zero or invert a comparison.
    /// Indicator parameters are checked against the series when computed.
    pub fn validate(&self) -> Result<()> {
        self.patterns.validate()?;
        self.decision.validate()?;
        self.levels.validate()?;
        self.alert.validate()
    }

    /// Bars needed before every configured indicator is defined at the last bar.
    pub fn min_len(&self) -> usize {
        self.series.min_len.max(indicators::max_lookback(&self.indicators))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub symbol: String,
    pub interval: BarInterval,
    pub bars: usize,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub last_close: f64,
    pub gaps: Vec<usize>,
}

impl SeriesSummary {
    fn of(series: &Series) -> Option<Self> {
        let (first, last) = (series.bars().first()?, series.last()?);
        Some(Self {
            symbol: series.symbol().to_string(),
            interval: series.interval(),
            bars: series.len(),
            first: first.timestamp,
            last: last.timestamp,
            last_close: last.close,
            gaps: series.gaps().to_vec(),
        })
    }
}

/// Builds the series with the length every configured indicator needs. When
/// an indicator sets that length, the error names it.
pub fn build_series(
    symbol: &str,
    interval: BarInterval,
    raw_bars: Vec<RawBar>,
    config: &AnalysisConfig,
) -> Result<Series> {
    let options = SeriesOptions {
        min_len: config.min_len(),
        ..config.series.clone()
    };
    series::build(symbol, interval, raw_bars, &options).map_err(|err| match err {
        AnalysisError::InsufficientData {
            required,
            available,
            context,
        } if required > config.series.min_len => {
            let context = config
                .indicators
                .iter()
                .find(|spec| spec.lookback() == required)
                .map_or(context, |spec| format!("{} on {}", spec.name(), symbol.trim()));
            AnalysisError::InsufficientData {
                required,
                available,
                context,
            }
        }
        other => other,
    })
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub series: SeriesSummary,
    pub indicators: IndicatorSet,
    pub patterns: Vec<PatternEvent>,
    pub recommendation: Recommendation,
    pub levels: Levels,
    pub assessment: Assessment,
}

/// Runs analyses and owns the alert state they feed.
#[derive(Debug, Clone)]
pub struct Analyzer {
    alerts: AlertEvaluator,
}

impl Analyzer {
    pub fn new(store: Arc<AlertStore>, alert_config: AlertConfig) -> Self {
        Self {
            alerts: AlertEvaluator::new(store, alert_config),
        }
    }

    pub fn alerts(&self) -> &AlertEvaluator {
        &self.alerts
    }

    pub fn analyze(
        &self,
        symbol: &str,
        interval: BarInterval,
        raw_bars: Vec<RawBar>,
        config: &AnalysisConfig,
    ) -> Result<Analysis> {
        self.analyze_with_signals(symbol, interval, raw_bars, &ExternalSignals::default(), config)
    }

    /// Like [`analyze`](Self::analyze), with sentiment and fundamental
    /// scalars voting alongside the technical factors.
    pub fn analyze_with_signals(
        &self,
        symbol: &str,
        interval: BarInterval,
        raw_bars: Vec<RawBar>,
        signals: &ExternalSignals,
        config: &AnalysisConfig,
    ) -> Result<Analysis> {
        let series = build_series(symbol, interval, raw_bars, config)?;
        self.analyze_series_with(&series, signals, config)
    }

    /// Runs the pipeline over an already built series. Used directly when
    /// replaying prefixes of one series.
    pub fn analyze_series(&self, series: &Series, config: &AnalysisConfig) -> Result<Analysis> {
        self.analyze_series_with(series, &ExternalSignals::default(), config)
    }

    pub fn analyze_series_with(
        &self,
        series: &Series,
        signals: &ExternalSignals,
        config: &AnalysisConfig,
    ) -> Result<Analysis> {
        config.validate()?;
        signals.validate()?;
        let indicators = indicators::compute(series, &config.indicators)?;
        let patterns = patterns::scan(series, &indicators, &config.patterns);
        let levels = levels::compute(series, &indicators, &config.levels);
        let context = DecisionContext {
            support_resistance: Some(&levels.support_resistance),
            signals: *signals,
        };
        let recommendation =
            decision::decide_with(series, &indicators, &patterns, &context, &config.decision)?;
        let assessment = assessment::assess(series, &indicators, &recommendation);

        // build() guarantees at least one bar.
        let summary = SeriesSummary::of(series).ok_or_else(|| {
            AnalysisError::InsufficientData {
                required: 1,
                available: 0,
                context: format!("series {}", series.symbol()),
            }
        })?;

        tracing::info!(
            symbol = series.symbol(),
            bars = series.len(),
            patterns = patterns.len(),
            action = %recommendation.action,
            confidence = recommendation.confidence,
            "analysis complete"
        );

        Ok(Analysis {
            series: summary,
            indicators,
            patterns,
            recommendation,
            levels,
            assessment,
        })
    }

    pub fn check_alert(&self, symbol: &str, recommendation: &Recommendation) -> Option<AlertEvent> {
        self.alerts.evaluate(symbol, recommendation)
    }

    /// Alerts on the analysis' recommendation under `config`, and on its last
    /// close reaching the stop or a target watched since the previous run.
    pub fn check_analysis(&self, analysis: &Analysis, config: &AlertConfig) -> Option<AlertEvent> {
        let price = PriceUpdate::new(analysis.series.last_close, &analysis.levels.trade);
        self.alerts.evaluate_with(
            &analysis.series.symbol,
            &analysis.recommendation,
            Some(price),
            config,
        )
    }

    pub fn reset_alert_state(&self, symbol: &str) {
        self.alerts.reset(symbol);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, AlertReason};
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn raw(n: usize) -> Vec<RawBar> {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.3).sin() * 4.0;
                RawBar {
                    timestamp: start + Duration::hours(i as i64),
                    open: close - 0.2,
                    high: close + 0.8,
                    low: close - 0.9,
                    close,
                    volume: 1000.0,
                }
            })
            .collect()
    }

    fn analyzer() -> Analyzer {
        Analyzer::new(Arc::new(AlertStore::new()), AlertConfig::default())
    }

    #[test]
    fn config_accepts_empty_and_partial_json() {
        let config: AnalysisConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.min_len(), 50);

        let config: AnalysisConfig = serde_json::from_value(json!({
            "indicators": [{"kind": "rsi", "period": 14}],
            "decision": {"min_factors": 1}
        }))
        .unwrap();
        assert_eq!(config.min_len(), 15);
        assert_eq!(config.decision.tie_epsilon, 0.05);
    }

    #[test]
    fn short_series_reports_required_length() {
        let err = analyzer()
            .analyze("S", BarInterval::Hour, raw(30), &AnalysisConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientData {
                required: 50,
                available: 30,
                context: "sma_50 on S".to_string(),
            }
        );

        let config: AnalysisConfig = serde_json::from_value(json!({
            "series": {"min_len": 60}
        }))
        .unwrap();
        let err = analyzer()
            .analyze(" S ", BarInterval::Hour, raw(30), &config)
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientData {
                required: 60,
                available: 30,
                context: "series S".to_string(),
            }
        );
    }

    #[test]
    fn invalid_tunables_fail_before_any_work() {
        let mut config = AnalysisConfig::default();
        config.patterns.doji_body_ratio = 0.0;
        let err = analyzer()
            .analyze("S", BarInterval::Hour, raw(120), &config)
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_parameter");

        let signals = ExternalSignals {
            sentiment: Some(2.0),
            fundamental: None,
        };
        let err = analyzer()
            .analyze_with_signals("S", BarInterval::Hour, raw(120), &signals, &AnalysisConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("signals.sentiment"));
    }

    #[test]
    fn signals_join_the_rationale() {
        let signals = ExternalSignals {
            sentiment: Some(0.8),
            fundamental: Some(-0.2),
        };
        let analysis = analyzer()
            .analyze_with_signals("S", BarInterval::Hour, raw(120), &signals, &AnalysisConfig::default())
            .unwrap();
        let origins: Vec<&str> = analysis
            .recommendation
            .factors
            .iter()
            .map(|f| f.origin.as_str())
            .collect();
        assert!(origins.contains(&"sentiment"));
        assert!(origins.contains(&"fundamental"));
    }

    #[test]
    fn check_analysis_uses_the_given_threshold() {
        let config = AnalysisConfig::default();
        let base = analyzer()
            .analyze(" S ", BarInterval::Hour, raw(120), &config)
            .unwrap();
        let with_confidence = |confidence: f64| {
            let mut a = base.clone();
            a.recommendation.action = Action::Hold;
            a.recommendation.confidence = confidence;
            a.recommendation.score = confidence;
            a
        };
        let (low, high) = (with_confidence(0.1), with_confidence(0.3));

        let strict = analyzer();
        assert!(strict.check_analysis(&low, &config.alert).is_none());
        assert!(strict.check_analysis(&high, &config.alert).is_none());

        let loose = AlertConfig {
            confidence_threshold: 0.2,
        };
        let analyzer = analyzer();
        assert!(analyzer.check_analysis(&low, &loose).is_none());
        let event = analyzer.check_analysis(&high, &loose).unwrap();
        assert_eq!(event.symbol, "S");
        assert_eq!(event.reason, AlertReason::ConfidenceRose { threshold: 0.2 });

        analyzer.reset_alert_state(" S");
        assert!(analyzer.alerts().store().is_empty());
    }

    #[test]
    fn full_run_produces_every_section() {
        let analysis = analyzer()
            .analyze("S", BarInterval::Hour, raw(120), &AnalysisConfig::default())
            .unwrap();
        assert_eq!(analysis.series.bars, 120);
        assert_eq!(analysis.indicators.len(), 10);
        assert!(analysis.recommendation.confidence <= 1.0);
        assert!(analysis.levels.fibonacci.is_some());
        assert!(analysis.levels.trade.long_term_target.is_some());
        // Serializes for presentation layers.
        let value = serde_json::to_value(&analysis).unwrap();
        assert!(value["indicators"]["macd_12_26_9"].is_object());
    }
}
