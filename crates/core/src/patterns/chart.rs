//! Pivot-based chart patterns: double and multiple tops and bottoms, head and
//! shoulders, and price channels.

use super::PatternConfig;
use crate::domain::{Bar, Direction, PatternEvent, PatternKind};

/// Bars whose high dominates `radius` bars on each side. On a plateau only the
/// first bar qualifies.
pub fn pivot_highs(bars: &[Bar], radius: usize) -> Vec<usize> {
    pivots(bars, radius, |b| b.high, |a, b| a > b)
}

pub fn pivot_lows(bars: &[Bar], radius: usize) -> Vec<usize> {
    pivots(bars, radius, |b| b.low, |a, b| a < b)
}

fn pivots(
    bars: &[Bar],
    radius: usize,
    price: impl Fn(&Bar) -> f64,
    beats: impl Fn(f64, f64) -> bool,
) -> Vec<usize> {
    let radius = radius.max(1);
    if bars.len() < 2 * radius + 1 {
        return Vec::new();
    }
    (radius..bars.len() - radius)
        .filter(|&i| {
            let p = price(&bars[i]);
            bars[i - radius..i].iter().all(|b| beats(p, price(b)))
                && bars[i + 1..=i + radius].iter().all(|b| !beats(price(b), p))
        })
        .collect()
}

pub fn scan(bars: &[Bar], config: &PatternConfig) -> Vec<PatternEvent> {
    let highs = pivot_highs(bars, config.pivot_radius);
    let lows = pivot_lows(bars, config.pivot_radius);
    let mut out = Vec::new();

    for pair in highs.windows(2) {
        let (p, q) = (pair[0], pair[1]);
        let (a, b) = (bars[p].high, bars[q].high);
        let valley = lowest_low(&bars[p..=q]);
        let peak = (a + b) / 2.0;
        if let Some(s) = double_strength(a, b, (peak - valley) / peak, config) {
            out.push(PatternEvent::new(PatternKind::DoubleTop, p, q, Direction::Bearish, s));
        }
    }

    for pair in lows.windows(2) {
        let (p, q) = (pair[0], pair[1]);
        let (a, b) = (bars[p].low, bars[q].low);
        let ridge = highest_high(&bars[p..=q]);
        let trough = (a + b) / 2.0;
        if let Some(s) = double_strength(a, b, (ridge - trough) / trough, config) {
            out.push(PatternEvent::new(PatternKind::DoubleBottom, p, q, Direction::Bullish, s));
        }
    }

    for triple in highs.windows(3) {
        let (l, h, r) = (triple[0], triple[1], triple[2]);
        let (left, head, right) = (bars[l].high, bars[h].high, bars[r].high);
        if head <= left.max(right) {
            continue;
        }
        let shoulder_diff = (left - right).abs() / left.max(right);
        if shoulder_diff > config.shoulder_tolerance {
            continue;
        }
        let neckline = lowest_low(&bars[l..=h]).max(lowest_low(&bars[h..=r]));
        let height = (head - neckline) / head;
        let symmetry = 1.0 - shoulder_diff / config.shoulder_tolerance;
        let strength = (height / config.head_full_height).min(1.0) * symmetry;
        out.push(PatternEvent::new(
            PatternKind::HeadAndShoulders,
            l,
            r,
            Direction::Bearish,
            strength,
        ));
    }

    let touches = config.multiple_touches.max(3);
    for group in highs.windows(touches) {
        let (first, last) = (group[0], group[touches - 1]);
        let level = mean(group.iter().map(|&i| bars[i].high));
        let depth = (level - lowest_low(&bars[first..=last])) / level;
        let peaks = group.iter().map(|&i| bars[i].high);
        if let Some(s) = multiple_strength(peaks, level, depth, config) {
            out.push(PatternEvent::new(PatternKind::MultipleTop, first, last, Direction::Bearish, s));
        }
    }
    for group in lows.windows(touches) {
        let (first, last) = (group[0], group[touches - 1]);
        let level = mean(group.iter().map(|&i| bars[i].low));
        let depth = (highest_high(&bars[first..=last]) - level) / level;
        let troughs = group.iter().map(|&i| bars[i].low);
        if let Some(s) = multiple_strength(troughs, level, depth, config) {
            out.push(PatternEvent::new(
                PatternKind::MultipleBottom,
                first,
                last,
                Direction::Bullish,
                s,
            ));
        }
    }

    out.extend(channel(bars, &highs, &lows, config));
    out
}

/// Fits a line through the most recent pivot highs and another through the
/// most recent pivot lows. Parallel lines sloping the same way form a channel
/// whose strength is the weaker of the two correlations.
fn channel(bars: &[Bar], highs: &[usize], lows: &[usize], config: &PatternConfig) -> Option<PatternEvent> {
    let take = config.channel_pivots.max(2);
    let highs = &highs[highs.len().saturating_sub(take)..];
    let lows = &lows[lows.len().saturating_sub(take)..];
    if highs.len() < 2 || lows.len() < 2 {
        return None;
    }
    let upper = fit(highs.iter().map(|&i| (i as f64, bars[i].high)))?;
    let lower = fit(lows.iter().map(|&i| (i as f64, bars[i].low)))?;

    let price = mean(highs.iter().map(|&i| bars[i].high).chain(lows.iter().map(|&i| bars[i].low)));
    if (upper.slope - lower.slope).abs() / price > config.channel_slope_tolerance {
        return None;
    }
    let (kind, direction) = if upper.slope > 0.0 && lower.slope > 0.0 {
        (PatternKind::UpwardChannel, Direction::Bullish)
    } else if upper.slope < 0.0 && lower.slope < 0.0 {
        (PatternKind::DownwardChannel, Direction::Bearish)
    } else {
        return None;
    };
    let r = upper.r.abs().min(lower.r.abs());
    if r < config.channel_min_r {
        return None;
    }
    let start = highs[0].min(lows[0]);
    let end = highs[highs.len() - 1].max(lows[lows.len() - 1]);
    Some(PatternEvent::new(kind, start, end, direction, r))
}

struct Line {
    slope: f64,
    r: f64,
}

/// Least-squares line through `points` with its correlation coefficient.
/// `None` when either coordinate is constant.
fn fit(points: impl Iterator<Item = (f64, f64)> + Clone) -> Option<Line> {
    let n = points.clone().count() as f64;
    let mx = points.clone().map(|(x, _)| x).sum::<f64>() / n;
    let my = points.clone().map(|(_, y)| y).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in points {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
        syy += (y - my) * (y - my);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some(Line {
        slope: sxy / sxx,
        r: sxy / (sxx * syy).sqrt(),
    })
}

/// Pivots spread by at most `multiple_tolerance` around their mean, with
/// enough room between them. Tighter clusters score higher.
fn multiple_strength(
    prices: impl Iterator<Item = f64>,
    level: f64,
    depth: f64,
    config: &PatternConfig,
) -> Option<f64> {
    let (lo, hi) = prices.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p), hi.max(p)));
    let spread = (hi - lo) / level;
    if spread >= config.multiple_tolerance || depth < config.double_min_depth {
        return None;
    }
    Some(1.0 - spread / config.multiple_tolerance)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    sum / n as f64
}

/// Shared scoring for double tops and bottoms: peak symmetry times depth.
fn double_strength(a: f64, b: f64, depth: f64, config: &PatternConfig) -> Option<f64> {
    let diff = (a - b).abs() / a.max(b);
    if diff > config.double_tolerance || depth < config.double_min_depth {
        return None;
    }
    let symmetry = 1.0 - diff / config.double_tolerance;
    Some(symmetry * (depth / (2.0 * config.double_min_depth)).min(1.0))
}

fn lowest_low(bars: &[Bar]) -> f64 {
    bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min)
}

fn highest_high(bars: &[Bar]) -> f64 {
    bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max)
}
