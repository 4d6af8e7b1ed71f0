//! Bollinger Bands and Average True Range.

use crate::domain::Bar;

pub struct BollingerLines {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// SMA ± k · sample standard deviation over the same window.
pub fn bollinger(closes: &[f64], period: usize, k: f64) -> BollingerLines {
    let n = closes.len();
    let mut upper = vec![None; n];
    let mut middle = vec![None; n];
    let mut lower = vec![None; n];
    if period == 0 {
        return BollingerLines { upper, middle, lower };
    }

    for end in (period - 1)..n {
        let window = &closes[end + 1 - period..=end];
        let mean = window.iter().sum::<f64>() / period as f64;
        let sd = if period > 1 {
            let ss: f64 = window.iter().map(|x| (x - mean).powi(2)).sum();
            (ss / (period - 1) as f64).sqrt()
        } else {
            0.0
        };
        upper[end] = Some(mean + k * sd);
        middle[end] = Some(mean);
        lower[end] = Some(mean - k * sd);
    }
    BollingerLines { upper, middle, lower }
}

/// Wilder-smoothed true range, seeded with the mean of the first `period` ranges.
pub fn atr(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    if period == 0 || bars.len() < period {
        return out;
    }

    let tr: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, b)| b.true_range(i.checked_sub(1).map(|p| bars[p].close)))
        .collect();

    let p = period as f64;
    let mut value = tr[..period].iter().sum::<f64>() / p;
    out[period - 1] = Some(value);
    for i in period..tr.len() {
        value = (value * (p - 1.0) + tr[i]) / p;
        out[i] = Some(value);
    }
    out
}
