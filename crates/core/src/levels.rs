//! Price levels derived from the series: support/resistance, Fibonacci
//! retracement and suggested stop/target prices.

use crate::domain::{IndicatorKind, IndicatorSet};
use crate::error::{ensure_non_negative, ensure_within, Result};
use crate::patterns::chart::{pivot_highs, pivot_lows};
use crate::series::Series;
use serde::{Deserialize, Serialize};

pub const FIB_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelsConfig {
    pub pivot_radius: usize,
    /// Pivots within this relative distance of each other form one level.
    pub group_tolerance: f64,
    pub fib_lookback: usize,
    pub stop_atr_multiple: f64,
    pub target_atr_multiple: f64,
    /// Stops sit this far below support, targets this far below resistance.
    pub level_buffer: f64,
    pub long_range_window: usize,
    pub long_range_extension: f64,
    /// Long-term target is capped at close × (1 + cap).
    pub long_target_cap: f64,
}

impl Default for LevelsConfig {
    fn default() -> Self {
        Self {
            pivot_radius: 5,
            group_tolerance: 0.02,
            fib_lookback: 100,
            stop_atr_multiple: 2.0,
            target_atr_multiple: 1.5,
            level_buffer: 0.02,
            long_range_window: 50,
            long_range_extension: 0.618,
            long_target_cap: 0.2,
        }
    }
}

impl LevelsConfig {
    pub fn validate(&self) -> Result<()> {
        const SECTION: &str = "levels";
        for (parameter, value) in [
            ("group_tolerance", self.group_tolerance),
            ("stop_atr_multiple", self.stop_atr_multiple),
            ("target_atr_multiple", self.target_atr_multiple),
            ("long_range_extension", self.long_range_extension),
            ("long_target_cap", self.long_target_cap),
        ] {
            ensure_non_negative(SECTION, parameter, value)?;
        }
        ensure_within(SECTION, "level_buffer", self.level_buffer, (0.0, 1.0))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    /// Nearest level below the last close (lowest level if none is below).
    pub support: Option<f64>,
    /// Nearest level above the last close (highest level if none is above).
    pub resistance: Option<f64>,
    pub strong_support: Option<f64>,
    pub strong_resistance: Option<f64>,
    pub support_levels: Vec<f64>,
    pub resistance_levels: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fibonacci {
    pub high: f64,
    pub low: f64,
    /// From the high (0 %) down to the low (100 %).
    pub levels: Vec<FibLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeLevels {
    pub stop_loss: Option<f64>,
    pub short_term_target: Option<f64>,
    pub long_term_target: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    pub support_resistance: SupportResistance,
    pub fibonacci: Option<Fibonacci>,
    pub trade: TradeLevels,
}

pub fn compute(series: &Series, indicators: &IndicatorSet, config: &LevelsConfig) -> Levels {
    let support_resistance = support_resistance(series, config);
    let fibonacci = fibonacci(series, config.fib_lookback);
    let trade = trade_levels(series, indicators, &support_resistance, config);
    Levels {
        support_resistance,
        fibonacci,
        trade,
    }
}

/// Sorts `levels` and averages runs whose neighbours lie within `tolerance`.
pub fn group_levels(mut levels: Vec<f64>, tolerance: f64) -> Vec<f64> {
    levels.sort_by(f64::total_cmp);
    let mut grouped = Vec::new();
    let mut group: Vec<f64> = Vec::new();
    for level in levels {
        if let Some(&prev) = group.last() {
            if (level - prev).abs() / prev > tolerance {
                grouped.push(group.iter().sum::<f64>() / group.len() as f64);
                group.clear();
            }
        }
        group.push(level);
    }
    if !group.is_empty() {
        grouped.push(group.iter().sum::<f64>() / group.len() as f64);
    }
    grouped
}

pub fn support_resistance(series: &Series, config: &LevelsConfig) -> SupportResistance {
    let bars = series.bars();
    let Some(close) = series.last().map(|b| b.close) else {
        return SupportResistance::default();
    };
    let support_levels = group_levels(
        pivot_lows(bars, config.pivot_radius).into_iter().map(|i| bars[i].low).collect(),
        config.group_tolerance,
    );
    let resistance_levels = group_levels(
        pivot_highs(bars, config.pivot_radius).into_iter().map(|i| bars[i].high).collect(),
        config.group_tolerance,
    );

    let support = support_levels
        .iter()
        .copied()
        .filter(|&l| l < close)
        .last()
        .or_else(|| support_levels.first().copied());
    let resistance = resistance_levels
        .iter()
        .copied()
        .find(|&l| l > close)
        .or_else(|| resistance_levels.last().copied());

    SupportResistance {
        support,
        resistance,
        strong_support: support_levels.first().copied(),
        strong_resistance: resistance_levels.last().copied(),
        support_levels,
        resistance_levels,
    }
}

/// Retracement levels between the highest high and lowest low of the last
/// `lookback` bars.
pub fn fibonacci(series: &Series, lookback: usize) -> Option<Fibonacci> {
    let bars = series.bars();
    let recent = &bars[bars.len().saturating_sub(lookback.max(1))..];
    if recent.is_empty() {
        return None;
    }
    let high = recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let span = high - low;
    Some(Fibonacci {
        high,
        low,
        levels: FIB_RATIOS
            .iter()
            .map(|&ratio| FibLevel {
                ratio,
                price: high - ratio * span,
            })
            .collect(),
    })
}

/// Each level is the most conservative of its available candidates; a level
/// with no candidate is left undefined.
pub fn trade_levels(
    series: &Series,
    indicators: &IndicatorSet,
    sr: &SupportResistance,
    config: &LevelsConfig,
) -> TradeLevels {
    let Some(close) = series.last().map(|b| b.close) else {
        return TradeLevels::default();
    };
    let atr = indicators
        .first_of_kind(IndicatorKind::Atr)
        .and_then(|r| r.primary_at(series.last_index()));
    let below = 1.0 - config.level_buffer;

    let stop_loss = min_of([
        sr.support.map(|s| s * below),
        atr.map(|a| close - config.stop_atr_multiple * a),
    ]);
    let short_term_target = min_of([
        sr.resistance.map(|r| r * below),
        atr.map(|a| close + config.target_atr_multiple * a),
    ]);

    let bars = series.bars();
    let window = config.long_range_window.max(1);
    let range = (bars.len() >= window).then(|| {
        let recent = &bars[bars.len() - window..];
        let high = recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        high - low
    });
    let long_term_target = range.map(|r| {
        (close + config.long_range_extension * r).min(close * (1.0 + config.long_target_cap))
    });

    TradeLevels {
        stop_loss,
        short_term_target,
        long_term_target,
    }
}

fn min_of<const N: usize>(candidates: [Option<f64>; N]) -> Option<f64> {
    candidates.into_iter().flatten().reduce(f64::min)
}
