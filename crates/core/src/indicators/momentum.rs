//! RSI and the stochastic oscillator.

use super::trend::sma_opt;

/// Wilder RSI. First defined value at index `period`.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    let p = period as f64;
    for i in (period + 1)..closes.len() {
        let change = closes[i] - closes[i - 1];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        return if avg_gain <= 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

pub struct StochasticLines {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
}

pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> StochasticLines {
    let n = closes.len();
    let mut k = vec![None; n];
    if k_period > 0 {
        for end in (k_period.saturating_sub(1))..n {
            let start = end + 1 - k_period;
            let hh = highs[start..=end].iter().copied().fold(f64::MIN, f64::max);
            let ll = lows[start..=end].iter().copied().fold(f64::MAX, f64::min);
            let range = hh - ll;
            k[end] = Some(if range <= 0.0 {
                50.0
            } else {
                (100.0 * (closes[end] - ll) / range).clamp(0.0, 100.0)
            });
        }
    }
    let d = sma_opt(&k, d_period);
    StochasticLines { k, d }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_of_monotonic_rise_is_100() {
        let closes: Vec<f64> = (0..30).map(|i| 10.0 + i as f64).collect();
        let out = rsi(&closes, 14);
        assert!(out[..14].iter().all(Option::is_none));
        assert!(out[14..].iter().all(|v| *v == Some(100.0)));
    }

    #[test]
    fn rsi_flat_series_is_neutral() {
        let out = rsi(&[5.0; 20], 14);
        assert_eq!(out[19], Some(50.0));
    }

    #[test]
    fn rsi_uses_wilder_smoothing_after_seed() {
        // Seed window: changes +1, -1 -> avg gain 0.5, avg loss 0.5 -> 50.
        let closes = [10.0, 11.0, 10.0, 12.0];
        let out = rsi(&closes, 2);
        assert_eq!(out[2], Some(50.0));
        // Next change +2: gain (0.5 + 2) / 2 = 1.25, loss 0.25 -> rs 5.
        let expected = 100.0 - 100.0 / 6.0;
        assert!((out[3].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn rsi_stays_in_range_on_choppy_data() {
        let closes: Vec<f64> = (0..200)
            .map(|i| 50.0 + ((i * 37 % 17) as f64 - 8.0) * 0.7)
            .collect();
        for v in rsi(&closes, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn stochastic_k_and_d_lookbacks() {
        let closes: Vec<f64> = (0..10).map(|i| i as f64 + 1.0).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 0.5).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 0.5).collect();
        let lines = stochastic(&highs, &lows, &closes, 3, 2);
        assert_eq!(lines.k.iter().position(Option::is_some), Some(2));
        assert_eq!(lines.d.iter().position(Option::is_some), Some(3));
        // close 3, LL 0.5, HH 3.5
        assert!((lines.k[2].unwrap() - 250.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn stochastic_flat_window_is_midpoint() {
        let lines = stochastic(&[1.0; 5], &[1.0; 5], &[1.0; 5], 3, 1);
        assert_eq!(lines.k[4], Some(50.0));
    }
}
