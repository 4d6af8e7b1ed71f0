//! On-balance volume and volume-weighted moving average.

/// Running volume total signed by close-to-close direction, starting at zero.
pub fn obv(closes: &[f64], volumes: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(closes.len());
    let mut total = 0.0;
    for i in 0..closes.len() {
        if i > 0 {
            if closes[i] > closes[i - 1] {
                total += volumes[i];
            } else if closes[i] < closes[i - 1] {
                total -= volumes[i];
            }
        }
        out.push(Some(total));
    }
    out
}

/// Σ(close · volume) / Σ volume; a window without volume averages closes.
pub fn vwma(closes: &[f64], volumes: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = closes.len();
    let mut out = vec![None; n];
    if period == 0 {
        return out;
    }
    for end in (period - 1)..n {
        let start = end + 1 - period;
        let vol: f64 = volumes[start..=end].iter().sum();
        out[end] = Some(if vol > 0.0 {
            closes[start..=end]
                .iter()
                .zip(&volumes[start..=end])
                .map(|(c, v)| c * v)
                .sum::<f64>()
                / vol
        } else {
            closes[start..=end].iter().sum::<f64>() / period as f64
        });
    }
    out
}
