//! Weighted voting of indicator and pattern factors into a [`Recommendation`].

pub mod factors;

use crate::domain::{Action, IndicatorSet, PatternEvent, Recommendation};
use crate::error::{ensure_non_negative, ensure_positive, ensure_within, AnalysisError, Result};
use crate::levels::SupportResistance;
use crate::series::Series;
use serde::{Deserialize, Serialize};

/// Base weight per factor family. A vote's weight is its base weight times a
/// magnitude in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorWeights {
    pub trend: f64,
    pub ma_alignment: f64,
    pub macd: f64,
    pub rsi: f64,
    pub stochastic: f64,
    pub bollinger: f64,
    pub volatility: f64,
    pub obv: f64,
    pub vwma: f64,
    pub support_resistance: f64,
    pub sentiment: f64,
    pub fundamental: f64,
    pub pattern: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            trend: 1.0,
            ma_alignment: 1.0,
            macd: 1.5,
            rsi: 1.0,
            stochastic: 0.5,
            bollinger: 0.75,
            volatility: 0.5,
            obv: 0.5,
            vwma: 0.5,
            support_resistance: 0.75,
            sentiment: 0.5,
            fundamental: 0.5,
            pattern: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub weights: FactorWeights,
    /// |score| at or below this is a HOLD.
    pub tie_epsilon: f64,
    /// Fewer evaluated indicator factors than this is an incomplete analysis.
    pub min_factors: usize,
    /// Relative distance from a moving average that counts as a full vote.
    pub trend_scale: f64,
    /// MACD line relative to close that counts as a full vote.
    pub macd_scale: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub stochastic_oversold: f64,
    pub stochastic_overbought: f64,
    /// ATR over its recent mean above this reads as elevated risk.
    pub atr_high_ratio: f64,
    pub atr_low_ratio: f64,
    pub atr_mean_window: usize,
    pub obv_lookback: usize,
    /// Patterns must end within this many bars of the last bar to vote.
    pub pattern_recency: usize,
    /// A close within this relative distance of support (resistance) is a
    /// full vote.
    pub sr_proximity: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            weights: FactorWeights::default(),
            tie_epsilon: 0.05,
            min_factors: 3,
            trend_scale: 0.05,
            macd_scale: 0.01,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            stochastic_oversold: 20.0,
            stochastic_overbought: 80.0,
            atr_high_ratio: 1.5,
            atr_low_ratio: 0.5,
            atr_mean_window: 20,
            obv_lookback: 10,
            pattern_recency: 5,
            sr_proximity: 0.02,
        }
    }
}

impl DecisionConfig {
    pub fn validate(&self) -> Result<()> {
        const SECTION: &str = "decision";
        let w = &self.weights;
        for (parameter, value) in [
            ("weights.trend", w.trend),
            ("weights.ma_alignment", w.ma_alignment),
            ("weights.macd", w.macd),
            ("weights.rsi", w.rsi),
            ("weights.stochastic", w.stochastic),
            ("weights.bollinger", w.bollinger),
            ("weights.volatility", w.volatility),
            ("weights.obv", w.obv),
            ("weights.vwma", w.vwma),
            ("weights.support_resistance", w.support_resistance),
            ("weights.sentiment", w.sentiment),
            ("weights.fundamental", w.fundamental),
            ("weights.pattern", w.pattern),
        ] {
            ensure_non_negative(SECTION, parameter, value)?;
        }
        for (parameter, value) in [
            ("trend_scale", self.trend_scale),
            ("macd_scale", self.macd_scale),
            ("atr_high_ratio", self.atr_high_ratio),
            ("atr_low_ratio", self.atr_low_ratio),
        ] {
            ensure_positive(SECTION, parameter, value)?;
        }
        ensure_within(SECTION, "tie_epsilon", self.tie_epsilon, (0.0, 1.0))?;
        ensure_within(SECTION, "sr_proximity", self.sr_proximity, (0.0, 1.0))?;
        ensure_within(SECTION, "rsi_oversold", self.rsi_oversold, (0.0, 100.0))?;
        ensure_within(SECTION, "rsi_overbought", self.rsi_overbought, (self.rsi_oversold, 100.0))?;
        ensure_within(SECTION, "stochastic_oversold", self.stochastic_oversold, (0.0, 100.0))?;
        ensure_within(
            SECTION,
            "stochastic_overbought",
            self.stochastic_overbought,
            (self.stochastic_oversold, 100.0),
        )?;
        // Zones are divided by their width.
        for (parameter, value) in [
            ("rsi_oversold", self.rsi_oversold),
            ("rsi_overbought", 100.0 - self.rsi_overbought),
            ("stochastic_oversold", self.stochastic_oversold),
            ("stochastic_overbought", 100.0 - self.stochastic_overbought),
        ] {
            ensure_positive(SECTION, parameter, value)?;
        }
        Ok(())
    }
}

/// Optional scores handed over by outside collaborators, each in [-1, 1];
/// positive reads bullish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalSignals {
    /// News or social sentiment.
    pub sentiment: Option<f64>,
    /// Fundamental valuation.
    pub fundamental: Option<f64>,
}

impl ExternalSignals {
    pub fn validate(&self) -> Result<()> {
        for (parameter, value) in [("sentiment", self.sentiment), ("fundamental", self.fundamental)] {
            if let Some(v) = value {
                ensure_within("signals", parameter, v, (-1.0, 1.0))?;
            }
        }
        Ok(())
    }
}

/// Inputs besides indicators and patterns that may vote.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionContext<'a> {
    pub support_resistance: Option<&'a SupportResistance>,
    pub signals: ExternalSignals,
}

/// Scores the last bar of `series` from indicators and patterns alone.
pub fn decide(
    series: &Series,
    indicators: &IndicatorSet,
    patterns: &[PatternEvent],
    config: &DecisionConfig,
) -> Result<Recommendation> {
    decide_with(series, indicators, patterns, &DecisionContext::default(), config)
}

/// Scores the last bar of `series`.
///
/// Factors appear in a fixed order: indicators in canonical order, the
/// support/resistance position, external signals, then patterns in scan
/// order. Only indicator factors count towards `min_factors`. The same input
/// always yields the same recommendation, factor order included.
pub fn decide_with(
    series: &Series,
    indicators: &IndicatorSet,
    patterns: &[PatternEvent],
    context: &DecisionContext<'_>,
    config: &DecisionConfig,
) -> Result<Recommendation> {
    let (mut trace, skipped) = factors::indicator_factors(series, indicators, config);
    let evaluated = trace.len();
    if evaluated < config.min_factors {
        return Err(AnalysisError::IncompleteAnalysis {
            evaluated,
            required: config.min_factors,
            skipped,
        });
    }
    if !skipped.is_empty() {
        tracing::debug!(symbol = series.symbol(), skipped = ?skipped, "undefined factors skipped");
    }

    if let (Some(sr), Some(bar)) = (context.support_resistance, series.last()) {
        trace.extend(factors::level_factor(bar.close, sr, config));
    }
    trace.extend(factors::signal_factors(&context.signals, config));
    trace.extend(factors::pattern_factors(patterns, series.last_index(), config));

    let net: f64 = trace.iter().map(|f| f.weight).sum();
    let total: f64 = trace.iter().map(|f| f.weight.abs()).sum();
    let score = if total > 0.0 { (net / total).clamp(-1.0, 1.0) } else { 0.0 };

    let action = if score.abs() <= config.tie_epsilon {
        Action::Hold
    } else if score > 0.0 {
        Action::Buy
    } else {
        Action::Sell
    };

    tracing::info!(
        symbol = series.symbol(),
        %action,
        score,
        factors = trace.len(),
        "recommendation decided"
    );

    Ok(Recommendation {
        action,
        confidence: score.abs(),
        score,
        factors: trace,
    })
}
