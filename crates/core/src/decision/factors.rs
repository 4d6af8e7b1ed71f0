//! Turns indicator values at the last bar, and recent patterns, into votes.

use super::{DecisionConfig, ExternalSignals};
use crate::domain::{Direction, Factor, IndicatorKind, IndicatorResult, IndicatorSet, PatternEvent};
use crate::levels::SupportResistance;
use crate::series::Series;

fn vote(
    source: impl Into<String>,
    origin: impl Into<String>,
    direction: Direction,
    base: f64,
    magnitude: f64,
    value: Option<f64>,
) -> Factor {
    let magnitude = if magnitude.is_finite() { magnitude.clamp(0.0, 1.0) } else { 0.0 };
    Factor {
        source: source.into(),
        origin: origin.into(),
        direction,
        weight: direction.sign() * base * magnitude,
        value,
    }
}

/// Above / below comparison used by every moving-average style factor.
fn relative(value: f64, reference: f64) -> (Direction, f64) {
    let magnitude = (value - reference).abs() / reference.abs();
    if value > reference {
        (Direction::Bullish, magnitude)
    } else if value < reference {
        (Direction::Bearish, magnitude)
    } else {
        (Direction::Neutral, 0.0)
    }
}

fn trend_label(direction: Direction, name: &str) -> String {
    match direction {
        Direction::Bullish => format!("Price above {name}"),
        Direction::Bearish => format!("Price below {name}"),
        Direction::Neutral => format!("Price at {name}"),
    }
}

/// Factors for every indicator in canonical order, plus the names of the
/// ones whose values were undefined at the last bar.
pub fn indicator_factors(
    series: &Series,
    indicators: &IndicatorSet,
    config: &DecisionConfig,
) -> (Vec<Factor>, Vec<String>) {
    let mut factors = Vec::new();
    let mut skipped = Vec::new();
    let last = series.last_index();
    let Some(close) = series.last().map(|b| b.close) else {
        return (factors, skipped);
    };

    for kind in IndicatorKind::ALL {
        let results = indicators.of_kind(kind);
        for result in &results {
            match evaluate(series, result, close, last, config) {
                Some(f) => factors.push(f),
                None => skipped.push(result.name.clone()),
            }
        }
        if kind == IndicatorKind::Sma && results.len() >= 2 {
            let (fast, slow) = (results[0], results[results.len() - 1]);
            let origin = format!("{}/{}", fast.name, slow.name);
            match (fast.primary_at(last), slow.primary_at(last)) {
                (Some(f), Some(s)) => {
                    let (direction, magnitude) = relative(f, s);
                    let source = match direction {
                        Direction::Bullish => "Fast SMA above slow SMA",
                        Direction::Bearish => "Fast SMA below slow SMA",
                        Direction::Neutral => "Fast SMA at slow SMA",
                    };
                    factors.push(vote(
                        source,
                        origin,
                        direction,
                        config.weights.ma_alignment,
                        magnitude / config.trend_scale,
                        Some(f - s),
                    ));
                }
                _ => skipped.push(origin),
            }
        }
    }
    (factors, skipped)
}

fn evaluate(
    series: &Series,
    result: &IndicatorResult,
    close: f64,
    last: usize,
    config: &DecisionConfig,
) -> Option<Factor> {
    let w = &config.weights;
    let name = result.name.as_str();

    let factor = match result.kind() {
        IndicatorKind::Sma | IndicatorKind::Ema | IndicatorKind::Vwma => {
            let ma = result.primary_at(last)?;
            let (direction, magnitude) = relative(close, ma);
            let base = if result.kind() == IndicatorKind::Vwma { w.vwma } else { w.trend };
            vote(
                trend_label(direction, name),
                name,
                direction,
                base,
                magnitude / config.trend_scale,
                Some(ma),
            )
        }
        IndicatorKind::Macd => {
            let macd = result.value_at("macd", last)?;
            let (direction, source) = if macd > 0.0 {
                (Direction::Bullish, "MACD bullish")
            } else if macd < 0.0 {
                (Direction::Bearish, "MACD bearish")
            } else {
                (Direction::Neutral, "MACD flat")
            };
            vote(
                source,
                name,
                direction,
                w.macd,
                macd.abs() / close / config.macd_scale,
                Some(macd),
            )
        }
        IndicatorKind::Rsi => {
            let rsi = result.primary_at(last)?;
            let (lo, hi) = (config.rsi_oversold, config.rsi_overbought);
            if rsi < lo {
                vote("RSI oversold", name, Direction::Bullish, w.rsi, (lo - rsi) / lo, Some(rsi))
            } else if rsi > hi {
                vote(
                    "RSI overbought",
                    name,
                    Direction::Bearish,
                    w.rsi,
                    (rsi - hi) / (100.0 - hi),
                    Some(rsi),
                )
            } else {
                vote("RSI neutral", name, Direction::Neutral, w.rsi, 0.0, Some(rsi))
            }
        }
        IndicatorKind::Stochastic => {
            let k = result.value_at("k", last)?;
            let (lo, hi) = (config.stochastic_oversold, config.stochastic_overbought);
            if k < lo {
                vote(
                    "Stochastic oversold",
                    name,
                    Direction::Bullish,
                    w.stochastic,
                    (lo - k) / lo,
                    Some(k),
                )
            } else if k > hi {
                vote(
                    "Stochastic overbought",
                    name,
                    Direction::Bearish,
                    w.stochastic,
                    (k - hi) / (100.0 - hi),
                    Some(k),
                )
            } else {
                vote("Stochastic neutral", name, Direction::Neutral, w.stochastic, 0.0, Some(k))
            }
        }
        IndicatorKind::Bollinger => {
            let upper = result.value_at("upper", last)?;
            let middle = result.value_at("middle", last)?;
            let lower = result.value_at("lower", last)?;
            let overshoot = |distance: f64, half_band: f64| {
                if half_band > 0.0 {
                    distance / half_band
                } else {
                    1.0
                }
            };
            if close < lower {
                vote(
                    "Close below lower band",
                    name,
                    Direction::Bullish,
                    w.bollinger,
                    overshoot(lower - close, middle - lower),
                    Some(lower),
                )
            } else if close > upper {
                vote(
                    "Close above upper band",
                    name,
                    Direction::Bearish,
                    w.bollinger,
                    overshoot(close - upper, upper - middle),
                    Some(upper),
                )
            } else {
                vote("Close inside bands", name, Direction::Neutral, w.bollinger, 0.0, Some(middle))
            }
        }
        IndicatorKind::Atr => {
            let atr = result.primary_at(last)?;
            let from = (last + 1).saturating_sub(config.atr_mean_window.max(1));
            let recent: Vec<f64> = result.primary()[from..=last].iter().flatten().copied().collect();
            let mean = recent.iter().sum::<f64>() / recent.len() as f64;
            if mean <= 0.0 {
                vote("Volatility normal", name, Direction::Neutral, w.volatility, 0.0, Some(atr))
            } else {
                let ratio = atr / mean;
                let (hi, lo) = (config.atr_high_ratio, config.atr_low_ratio);
                if ratio > hi {
                    vote(
                        "Volatility elevated",
                        name,
                        Direction::Bearish,
                        w.volatility,
                        (ratio - hi) / hi,
                        Some(ratio),
                    )
                } else if ratio < lo {
                    vote(
                        "Volatility subdued",
                        name,
                        Direction::Bullish,
                        w.volatility,
                        (lo - ratio) / lo,
                        Some(ratio),
                    )
                } else {
                    vote("Volatility normal", name, Direction::Neutral, w.volatility, 0.0, Some(ratio))
                }
            }
        }
        IndicatorKind::Obv => {
            let lookback = config.obv_lookback.max(1);
            let then = last.checked_sub(lookback)?;
            let delta = result.primary_at(last)? - result.primary_at(then)?;
            let volume: f64 = series.bars()[then + 1..=last]
                .iter()
                .map(|b| b.volume as f64)
                .sum();
            let magnitude = if volume > 0.0 { delta.abs() / volume } else { 0.0 };
            if delta > 0.0 {
                vote("OBV rising", name, Direction::Bullish, w.obv, magnitude, Some(delta))
            } else if delta < 0.0 {
                vote("OBV falling", name, Direction::Bearish, w.obv, magnitude, Some(delta))
            } else {
                vote("OBV flat", name, Direction::Neutral, w.obv, 0.0, Some(delta))
            }
        }
    };
    Some(factor)
}

/// Where `close` sits between the nearest support and resistance. Within
/// `sr_proximity` of either level is a full vote; in between, the vote grows
/// linearly from zero at the midpoint.
pub fn level_factor(close: f64, sr: &SupportResistance, config: &DecisionConfig) -> Option<Factor> {
    let (support, resistance) = (sr.support?, sr.resistance?);
    if resistance <= support {
        return None;
    }
    let base = config.weights.support_resistance;
    let origin = "support/resistance";
    let factor = if (close - support).abs() / close <= config.sr_proximity {
        vote("Near support", origin, Direction::Bullish, base, 1.0, Some(support))
    } else if (resistance - close).abs() / close <= config.sr_proximity {
        vote("Near resistance", origin, Direction::Bearish, base, 1.0, Some(resistance))
    } else {
        let position = ((close - support) / (resistance - support)).clamp(0.0, 1.0);
        let lean = 0.5 - position;
        let (direction, source) = if lean > 0.0 {
            (Direction::Bullish, "Closer to support")
        } else if lean < 0.0 {
            (Direction::Bearish, "Closer to resistance")
        } else {
            (Direction::Neutral, "Midway between support and resistance")
        };
        vote(source, origin, direction, base, 2.0 * lean.abs(), Some(position))
    };
    Some(factor)
}

/// One factor per external score that was supplied.
pub fn signal_factors(signals: &ExternalSignals, config: &DecisionConfig) -> Vec<Factor> {
    let w = &config.weights;
    [
        ("Sentiment", "sentiment", signals.sentiment, w.sentiment),
        ("Fundamentals", "fundamental", signals.fundamental, w.fundamental),
    ]
    .into_iter()
    .filter_map(|(label, origin, value, base)| {
        let v = value?;
        let (direction, tone) = if v > 0.0 {
            (Direction::Bullish, "positive")
        } else if v < 0.0 {
            (Direction::Bearish, "negative")
        } else {
            (Direction::Neutral, "neutral")
        };
        Some(vote(format!("{label} {tone}"), origin, direction, base, v.abs(), Some(v)))
    })
    .collect()
}

/// One factor per pattern that ended within `pattern_recency` bars of `last`.
pub fn pattern_factors(patterns: &[PatternEvent], last: usize, config: &DecisionConfig) -> Vec<Factor> {
    patterns
        .iter()
        .filter(|p| p.end <= last && last - p.end <= config.pattern_recency)
        .map(|p| {
            vote(
                p.kind.label(),
                format!("{:?}@{}..{}", p.kind, p.start, p.end),
                p.direction,
                config.weights.pattern,
                p.strength,
                Some(p.strength),
            )
        })
        .collect()
}
