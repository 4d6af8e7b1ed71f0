//! Price/RSI divergence.
//!
//! Bearish: the close makes a new high for the window while RSI stays below
//! its earlier high by at least `divergence_min_gap` points. Bullish is the
//! mirror image on lows.

use super::PatternConfig;
use crate::domain::{Direction, IndicatorKind, IndicatorSet, PatternEvent, PatternKind};
use crate::series::Series;

pub fn scan(series: &Series, indicators: &IndicatorSet, config: &PatternConfig) -> Vec<PatternEvent> {
    let Some(rsi) = indicators.first_of_kind(IndicatorKind::Rsi) else {
        tracing::debug!(symbol = series.symbol(), "divergence skipped: no RSI");
        return Vec::new();
    };
    detect(&series.closes(), rsi.primary(), config)
}

fn detect(closes: &[f64], rsi: &[Option<f64>], config: &PatternConfig) -> Vec<PatternEvent> {
    let window = config.divergence_window.max(2);
    let mut out = Vec::new();

    for i in (window - 1)..closes.len() {
        let Some(rsi_now) = rsi.get(i).copied().flatten() else {
            continue;
        };
        let earlier = (i + 1 - window)..i;

        // Earlier bar with the highest close, among bars with a defined RSI.
        let peak = earlier
            .clone()
            .filter_map(|j| rsi[j].map(|r| (j, closes[j], r)))
            .fold(None::<(usize, f64, f64)>, |best, cand| match best {
                Some(b) if b.1 >= cand.1 => Some(b),
                _ => Some(cand),
            });
        if let Some((j, close_then, rsi_then)) = peak {
            let gap = rsi_then - rsi_now;
            if closes[i] > close_then && gap >= config.divergence_min_gap {
                out.push(PatternEvent::new(
                    PatternKind::BearishDivergence,
                    j,
                    i,
                    Direction::Bearish,
                    gap / config.divergence_full_gap,
                ));
            }
        }

        let trough = earlier
            .filter_map(|j| rsi[j].map(|r| (j, closes[j], r)))
            .fold(None::<(usize, f64, f64)>, |best, cand| match best {
                Some(b) if b.1 <= cand.1 => Some(b),
                _ => Some(cand),
            });
        if let Some((j, close_then, rsi_then)) = trough {
            let gap = rsi_now - rsi_then;
            if closes[i] < close_then && gap >= config.divergence_min_gap {
                out.push(PatternEvent::new(
                    PatternKind::BullishDivergence,
                    j,
                    i,
                    Direction::Bullish,
                    gap / config.divergence_full_gap,
                ));
            }
        }
    }
    out
}
