//! Indicator engine: one pure function per [`IndicatorSpec`] variant.

pub mod momentum;
pub mod trend;
pub mod volatility;
pub mod volume;

use crate::domain::{IndicatorLine, IndicatorResult, IndicatorSet, IndicatorSpec};
use crate::error::{AnalysisError, Result};
use crate::series::Series;

/// Largest lookback among `specs`; the minimum series length for a full run.
pub fn max_lookback(specs: &[IndicatorSpec]) -> usize {
    specs.iter().map(IndicatorSpec::lookback).max().unwrap_or(1)
}

/// Rejects parameters that cannot produce a meaningful line over `len` bars.
pub fn validate(spec: &IndicatorSpec, len: usize) -> Result<()> {
    let invalid = |parameter: &'static str, value: String, reason: String| {
        Err(AnalysisError::InvalidParameter {
            indicator: spec.name(),
            parameter,
            value,
            reason,
        })
    };

    for (parameter, period) in spec.periods() {
        if period == 0 {
            return invalid(parameter, "0".into(), "must be at least 1".into());
        }
        if period > len {
            return invalid(
                parameter,
                period.to_string(),
                format!("exceeds series length (max {len})"),
            );
        }
    }

    match *spec {
        IndicatorSpec::Macd { fast, slow, .. } if fast >= slow => invalid(
            "fast",
            fast.to_string(),
            format!("must be below slow ({slow})"),
        ),
        IndicatorSpec::Bollinger { k, .. } if !k.is_finite() || k <= 0.0 => invalid(
            "k",
            k.to_string(),
            "must be a positive finite width".into(),
        ),
        _ => Ok(()),
    }
}

/// Computes every requested indicator. Duplicate specs collapse to one result.
pub fn compute(series: &Series, specs: &[IndicatorSpec]) -> Result<IndicatorSet> {
    let mut set = IndicatorSet::new();
    for spec in specs {
        let name = spec.name();
        if set.get(&name).is_some() {
            tracing::debug!(indicator = %name, "duplicate indicator spec ignored");
            continue;
        }
        validate(spec, series.len())?;
        let lines = evaluate(series, spec);
        tracing::debug!(
            symbol = series.symbol(),
            indicator = %name,
            lookback = spec.lookback(),
            "indicator computed"
        );
        set.insert(IndicatorResult {
            name,
            spec: *spec,
            lookback: spec.lookback(),
            lines,
        });
    }
    Ok(set)
}

fn line(name: &str, values: Vec<Option<f64>>) -> IndicatorLine {
    IndicatorLine {
        name: name.to_string(),
        values,
    }
}

fn evaluate(series: &Series, spec: &IndicatorSpec) -> Vec<IndicatorLine> {
    let closes = series.closes();
    match *spec {
        IndicatorSpec::Sma { period } => vec![line("value", trend::sma(&closes, period))],
        IndicatorSpec::Ema { period } => vec![line("value", trend::ema(&closes, period))],
        IndicatorSpec::Macd { fast, slow, signal } => {
            let m = trend::macd(&closes, fast, slow, signal);
            vec![
                line("macd", m.macd),
                line("signal", m.signal),
                line("histogram", m.histogram),
            ]
        }
        IndicatorSpec::Rsi { period } => vec![line("value", momentum::rsi(&closes, period))],
        IndicatorSpec::Stochastic { k_period, d_period } => {
            let s = momentum::stochastic(
                &series.highs(),
                &series.lows(),
                &closes,
                k_period,
                d_period,
            );
            vec![line("k", s.k), line("d", s.d)]
        }
        IndicatorSpec::Bollinger { period, k } => {
            let b = volatility::bollinger(&closes, period, k);
            vec![
                line("upper", b.upper),
                line("middle", b.middle),
                line("lower", b.lower),
            ]
        }
        IndicatorSpec::Atr { period } => {
            vec![line("value", volatility::atr(series.bars(), period))]
        }
        IndicatorSpec::Obv => vec![line("value", volume::obv(&closes, &series.volumes()))],
        IndicatorSpec::Vwma { period } => vec![line(
            "value",
            volume::vwma(&closes, &series.volumes(), period),
        )],
    }
}
