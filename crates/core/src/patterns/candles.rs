//! Single, two and three bar candlestick shapes.

use super::PatternConfig;
use crate::domain::{Bar, Direction, PatternEvent, PatternKind};

pub fn scan(bars: &[Bar], config: &PatternConfig) -> Vec<PatternEvent> {
    let mut out = Vec::new();
    for (i, bar) in bars.iter().enumerate() {
        out.extend(single(i, bar, config));
        if i >= 1 {
            out.extend(engulfing(i, &bars[i - 1], bar));
        }
        if i >= 2 {
            out.extend(star(i, &bars[i - 2], &bars[i - 1], bar, config));
        }
    }
    out
}

fn single(i: usize, bar: &Bar, config: &PatternConfig) -> Vec<PatternEvent> {
    let range = bar.range();
    if range <= 0.0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    let body_ratio = bar.body_ratio();

    if body_ratio <= config.doji_body_ratio {
        let strength = 1.0 - body_ratio / config.doji_body_ratio;
        out.push(PatternEvent::new(PatternKind::Doji, i, i, Direction::Neutral, strength));
    }

    if body_ratio <= config.hammer_max_body_ratio {
        let lower = bar.lower_shadow() / range;
        let upper = bar.upper_shadow() / range;
        if lower >= config.hammer_shadow_ratio && upper <= config.hammer_max_opposite_shadow {
            out.push(PatternEvent::new(PatternKind::Hammer, i, i, Direction::Bullish, lower));
        }
        if upper >= config.hammer_shadow_ratio && lower <= config.hammer_max_opposite_shadow {
            out.push(PatternEvent::new(
                PatternKind::ShootingStar,
                i,
                i,
                Direction::Bearish,
                upper,
            ));
        }
    }
    out
}

fn engulfing(i: usize, prev: &Bar, cur: &Bar) -> Option<PatternEvent> {
    if prev.body() <= 0.0 || cur.body() <= prev.body() {
        return None;
    }
    let covers = cur.body_bottom() <= prev.body_bottom() && cur.body_top() >= prev.body_top();
    if !covers {
        return None;
    }
    let strength = 1.0 - prev.body() / cur.body();
    if prev.is_bearish() && cur.is_bullish() {
        Some(PatternEvent::new(
            PatternKind::BullishEngulfing,
            i - 1,
            i,
            Direction::Bullish,
            strength,
        ))
    } else if prev.is_bullish() && cur.is_bearish() {
        Some(PatternEvent::new(
            PatternKind::BearishEngulfing,
            i - 1,
            i,
            Direction::Bearish,
            strength,
        ))
    } else {
        None
    }
}

fn star(i: usize, first: &Bar, middle: &Bar, last: &Bar, config: &PatternConfig) -> Option<PatternEvent> {
    if first.body() <= 0.0
        || first.body_ratio() < config.star_large_body_ratio
        || last.body_ratio() < config.star_large_body_ratio
        || middle.body_ratio() > config.star_small_body_ratio
    {
        return None;
    }
    let midpoint = (first.open + first.close) / 2.0;
    let half_body = first.body() / 2.0;

    if first.is_bearish() && last.is_bullish() && middle.body_top() <= first.close {
        let reach = last.close - midpoint;
        (reach > 0.0).then(|| {
            PatternEvent::new(PatternKind::MorningStar, i - 2, i, Direction::Bullish, reach / half_body)
        })
    } else if first.is_bullish() && last.is_bearish() && middle.body_bottom() >= first.close {
        let reach = midpoint - last.close;
        (reach > 0.0).then(|| {
            PatternEvent::new(PatternKind::EveningStar, i - 2, i, Direction::Bearish, reach / half_body)
        })
    } else {
        None
    }
}
