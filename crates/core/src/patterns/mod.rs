//! Pattern recognizer. Each submodule contributes events for a family of
//! rules; [`scan`] merges, filters and orders them.

pub mod candles;
pub mod chart;
pub mod crossovers;
pub mod divergence;

use crate::domain::{IndicatorSet, PatternEvent};
use crate::error::{ensure_positive, ensure_within, AnalysisError, Result};
use crate::series::Series;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Events weaker than this are dropped.
    pub min_strength: f64,

    pub doji_body_ratio: f64,
    /// Hammer / shooting star: long shadow as a share of the range.
    pub hammer_shadow_ratio: f64,
    /// Hammer / shooting star: the opposite shadow may not exceed this share.
    pub hammer_max_opposite_shadow: f64,
    pub hammer_max_body_ratio: f64,
    /// Morning / evening star middle candle.
    pub star_small_body_ratio: f64,
    /// Morning / evening star outer candles.
    pub star_large_body_ratio: f64,

    /// Change of the fast/slow SMA spread, relative to the slow SMA, that
    /// counts as a full-strength cross.
    pub ma_cross_scale: f64,
    /// Histogram change relative to close that counts as a full-strength cross.
    pub macd_cross_scale: f64,

    pub divergence_window: usize,
    /// RSI points between the two extremes required to call a divergence.
    pub divergence_min_gap: f64,
    /// RSI gap that counts as full strength.
    pub divergence_full_gap: f64,

    /// Bars on each side a pivot must dominate.
    pub pivot_radius: usize,
    /// Max relative difference between the two peaks (troughs).
    pub double_tolerance: f64,
    /// Min relative depth of the valley (height of the ridge) between them.
    pub double_min_depth: f64,
    pub shoulder_tolerance: f64,
    /// Head height above the neckline, relative to the head, for full strength.
    pub head_full_height: f64,

    /// Most recent pivot highs (and lows) a channel line is fitted through.
    pub channel_pivots: usize,
    /// Both fitted lines need at least this correlation.
    pub channel_min_r: f64,
    /// Max difference of the two slopes, per bar and relative to price.
    pub channel_slope_tolerance: f64,
    /// Pivots at one level needed for a multiple top (bottom).
    pub multiple_touches: usize,
    /// Max spread of those pivots relative to their mean.
    pub multiple_tolerance: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_strength: 0.05,
            doji_body_ratio: 0.1,
            hammer_shadow_ratio: 0.6,
            hammer_max_opposite_shadow: 0.1,
            hammer_max_body_ratio: 0.35,
            star_small_body_ratio: 0.3,
            star_large_body_ratio: 0.5,
            ma_cross_scale: 0.005,
            macd_cross_scale: 0.002,
            divergence_window: 14,
            divergence_min_gap: 2.0,
            divergence_full_gap: 10.0,
            pivot_radius: 3,
            double_tolerance: 0.02,
            double_min_depth: 0.05,
            shoulder_tolerance: 0.05,
            head_full_height: 0.1,
            channel_pivots: 4,
            channel_min_r: 0.7,
            channel_slope_tolerance: 0.001,
            multiple_touches: 3,
            multiple_tolerance: 0.03,
        }
    }
}

impl PatternConfig {
    /// Every ratio and scale must be positive: several rules divide by them.
    pub fn validate(&self) -> Result<()> {
        const SECTION: &str = "patterns";
        ensure_within(SECTION, "min_strength", self.min_strength, (0.0, 1.0))?;
        for (parameter, value) in [
            ("doji_body_ratio", self.doji_body_ratio),
            ("hammer_shadow_ratio", self.hammer_shadow_ratio),
            ("hammer_max_opposite_shadow", self.hammer_max_opposite_shadow),
            ("hammer_max_body_ratio", self.hammer_max_body_ratio),
            ("star_small_body_ratio", self.star_small_body_ratio),
            ("star_large_body_ratio", self.star_large_body_ratio),
            ("ma_cross_scale", self.ma_cross_scale),
            ("macd_cross_scale", self.macd_cross_scale),
            ("divergence_min_gap", self.divergence_min_gap),
            ("divergence_full_gap", self.divergence_full_gap),
            ("double_tolerance", self.double_tolerance),
            ("double_min_depth", self.double_min_depth),
            ("shoulder_tolerance", self.shoulder_tolerance),
            ("head_full_height", self.head_full_height),
            ("channel_slope_tolerance", self.channel_slope_tolerance),
            ("multiple_tolerance", self.multiple_tolerance),
        ] {
            ensure_positive(SECTION, parameter, value)?;
        }
        ensure_within(SECTION, "channel_min_r", self.channel_min_r, (0.0, 1.0))?;
        for (parameter, value, min) in [
            ("divergence_window", self.divergence_window, 2),
            ("pivot_radius", self.pivot_radius, 1),
            ("channel_pivots", self.channel_pivots, 2),
            ("multiple_touches", self.multiple_touches, 3),
        ] {
            if value < min {
                return Err(AnalysisError::InvalidParameter {
                    indicator: SECTION.to_string(),
                    parameter,
                    value: value.to_string(),
                    reason: format!("must be at least {min}"),
                });
            }
        }
        Ok(())
    }
}

/// Runs every rule over the series. The result is ordered by start bar, then
/// pattern kind, then end bar, and holds no duplicate `(kind, start, end)`.
pub fn scan(series: &Series, indicators: &IndicatorSet, config: &PatternConfig) -> Vec<PatternEvent> {
    let mut events = candles::scan(series.bars(), config);
    events.extend(crossovers::scan(series, indicators, config));
    events.extend(divergence::scan(series, indicators, config));
    events.extend(chart::scan(series.bars(), config));

    let found = events.len();
    events.retain(|e| e.strength >= config.min_strength);
    events.sort_by(|a, b| a.key().cmp(&b.key()));
    events.dedup_by_key(|e| e.key());

    tracing::debug!(
        symbol = series.symbol(),
        found,
        kept = events.len(),
        "pattern scan finished"
    );
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BarInterval, IndicatorSpec, RawBar};
    use crate::{indicators, series};
    use chrono::{Duration, TimeZone, Utc};

    fn zigzag() -> Series {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let raw = (0..90)
            .map(|i| {
                let close = 100.0 + ((i as f64) * 0.45).sin() * 8.0;
                let open = if i % 3 == 0 { close } else { close - 0.6 };
                RawBar {
                    timestamp: start + Duration::minutes(i),
                    open,
                    high: open.max(close) + 0.4,
                    low: open.min(close) - 0.4,
                    close,
                    volume: 500.0,
                }
            })
            .collect();
        series::build("ZZ", BarInterval::Minute, raw, &series::SeriesOptions::default()).unwrap()
    }

    #[test]
    fn scan_is_ordered_unique_and_filtered() {
        let s = zigzag();
        let specs = [
            IndicatorSpec::Sma { period: 5 },
            IndicatorSpec::Sma { period: 15 },
            IndicatorSpec::Macd {
                fast: 5,
                slow: 12,
                signal: 4,
            },
            IndicatorSpec::Rsi { period: 7 },
        ];
        let set = indicators::compute(&s, &specs).unwrap();
        let config = PatternConfig::default();
        let events = scan(&s, &set, &config);

        assert!(!events.is_empty());
        for pair in events.windows(2) {
            assert!(pair[0].key() < pair[1].key());
        }
        for e in &events {
            assert!(e.end >= e.start);
            assert!(e.strength >= config.min_strength && e.strength <= 1.0);
        }
        assert_eq!(events, scan(&s, &set, &config));
    }

    #[test]
    fn missing_indicators_only_skip_rules() {
        let s = zigzag();
        let events = scan(&s, &IndicatorSet::new(), &PatternConfig::default());
        assert!(events.iter().all(|e| !matches!(
            e.kind,
            crate::domain::PatternKind::GoldenCross
                | crate::domain::PatternKind::DeathCross
                | crate::domain::PatternKind::MacdBullishCross
                | crate::domain::PatternKind::MacdBearishCross
                | crate::domain::PatternKind::BullishDivergence
                | crate::domain::PatternKind::BearishDivergence
        )));
    }

    #[test]
    fn zero_thresholds_are_rejected() {
        assert!(PatternConfig::default().validate().is_ok());
        for config in [
            PatternConfig {
                doji_body_ratio: 0.0,
                ..PatternConfig::default()
            },
            PatternConfig {
                double_tolerance: 0.0,
                ..PatternConfig::default()
            },
            PatternConfig {
                shoulder_tolerance: -0.1,
                ..PatternConfig::default()
            },
            PatternConfig {
                multiple_touches: 2,
                ..PatternConfig::default()
            },
        ] {
            assert_eq!(config.validate().unwrap_err().kind(), "invalid_parameter");
        }
    }

    #[test]
    fn config_fills_missing_fields_with_defaults() {
        let config: PatternConfig =
            serde_json::from_value(serde_json::json!({"min_strength": 0.2})).unwrap();
        assert_eq!(config.min_strength, 0.2);
        assert_eq!(config.divergence_window, 14);
    }
}
