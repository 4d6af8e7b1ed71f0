//! Moving-average and MACD crossovers.

use super::PatternConfig;
use crate::domain::{Direction, IndicatorKind, IndicatorSet, PatternEvent, PatternKind};
use crate::series::Series;

pub fn scan(series: &Series, indicators: &IndicatorSet, config: &PatternConfig) -> Vec<PatternEvent> {
    let mut out = Vec::new();
    let closes = series.closes();

    let smas = indicators.of_kind(IndicatorKind::Sma);
    match (smas.first(), smas.last()) {
        (Some(fast), Some(slow)) if smas.len() >= 2 => {
            out.extend(crosses(
                fast.primary(),
                slow.primary(),
                |i, delta| delta.abs() / slow.primary_at(i).unwrap_or(f64::NAN) / config.ma_cross_scale,
                (PatternKind::GoldenCross, PatternKind::DeathCross),
            ));
        }
        _ => tracing::debug!(symbol = series.symbol(), "golden/death cross skipped: needs two SMAs"),
    }

    match indicators.first_of_kind(IndicatorKind::Macd) {
        Some(macd) => {
            let (Some(line), Some(signal)) = (macd.line("macd"), macd.line("signal")) else {
                return out;
            };
            out.extend(crosses(
                line,
                signal,
                |i, delta| delta.abs() / closes[i] / config.macd_cross_scale,
                (PatternKind::MacdBullishCross, PatternKind::MacdBearishCross),
            ));
        }
        None => tracing::debug!(symbol = series.symbol(), "MACD cross skipped: no MACD"),
    }
    out
}

/// Emits an event on every bar where `a - b` takes the opposite sign of its
/// last non-zero value, spanning the bar before and the bar of the cross.
/// Touching zero and returning to the same side is not a cross. An undefined
/// spread forgets the side. `strength` receives the bar index and the change
/// of the spread.
fn crosses(
    a: &[Option<f64>],
    b: &[Option<f64>],
    strength: impl Fn(usize, f64) -> f64,
    (up, down): (PatternKind, PatternKind),
) -> Vec<PatternEvent> {
    let spread: Vec<Option<f64>> = a.iter().zip(b).map(|(x, y)| Some((*x)? - (*y)?)).collect();
    let mut out = Vec::new();
    let mut side: Option<bool> = None;
    for (i, &cur) in spread.iter().enumerate() {
        let Some(cur) = cur else {
            side = None;
            continue;
        };
        if cur == 0.0 {
            continue;
        }
        let above = cur > 0.0;
        let was_above = side.replace(above);
        let prev = match (i.checked_sub(1).and_then(|j| spread[j]), was_above) {
            (Some(prev), Some(was)) if was != above => prev,
            _ => continue,
        };
        let kind = if above {
            (up, Direction::Bullish)
        } else {
            (down, Direction::Bearish)
        };
        let s = strength(i, cur - prev);
        if s.is_finite() {
            out.push(PatternEvent::new(kind.0, i - 1, i, kind.1, s));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(v: &[f64]) -> Vec<Option<f64>> {
        v.iter().copied().map(Some).collect()
    }

    #[test]
    fn detects_both_directions() {
        let fast = some(&[9.0, 10.0, 11.0, 10.0, 9.0]);
        let slow = some(&[10.0, 10.0, 10.0, 10.0, 10.0]);
        let events = crosses(
            &fast,
            &slow,
            |_, d| d.abs(),
            (PatternKind::GoldenCross, PatternKind::DeathCross),
        );
        // 0 -> +1 is a golden cross at bar 2; 0 -> -1 a death cross at bar 4.
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, PatternKind::GoldenCross);
        assert_eq!((events[0].start, events[0].end), (1, 2));
        assert_eq!(events[1].kind, PatternKind::DeathCross);
        assert_eq!((events[1].start, events[1].end), (3, 4));
    }

    #[test]
    fn touching_and_bouncing_back_is_not_a_cross() {
        let flat = some(&[10.0, 10.0, 10.0, 10.0, 10.0, 10.0]);
        let events = crosses(
            &some(&[11.0, 10.0, 11.0, 10.0, 10.0, 9.0]),
            &flat,
            |_, d| d.abs(),
            (PatternKind::GoldenCross, PatternKind::DeathCross),
        );
        // Above, touch, above, touch twice, then below: one death cross.
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, PatternKind::DeathCross);
        assert_eq!((events[0].start, events[0].end), (4, 5));
    }

    #[test]
    fn undefined_positions_never_cross() {
        let fast = vec![None, Some(11.0), Some(9.0)];
        let slow = vec![Some(10.0), None, Some(10.0)];
        let events = crosses(
            &fast,
            &slow,
            |_, _| 1.0,
            (PatternKind::GoldenCross, PatternKind::DeathCross),
        );
        assert!(events.is_empty());
    }
}
