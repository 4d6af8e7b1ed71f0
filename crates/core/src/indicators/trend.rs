//! Moving averages and MACD.

/// Simple moving average; the first `period - 1` positions are undefined.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let opt: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    sma_opt(&opt, period)
}

/// SMA over a series that may itself carry undefined positions. A window is
/// defined only when every value in it is defined.
pub fn sma_opt(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    for end in (period - 1)..values.len() {
        let window = &values[end + 1 - period..=end];
        let mut sum = 0.0;
        let mut complete = true;
        for v in window {
            match v {
                Some(x) => sum += x,
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            out[end] = Some(sum / period as f64);
        }
    }
    out
}

pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let opt: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    ema_opt(&opt, period)
}

/// EMA seeded with the SMA of the first `period` defined values.
///
/// Leading undefined positions are skipped; an undefined value after the seed
/// resets the average so the result never bridges a hole.
pub fn ema_opt(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    let alpha = 2.0 / (period as f64 + 1.0);

    let mut run: Vec<f64> = Vec::with_capacity(period);
    let mut prev: Option<f64> = None;
    for (i, v) in values.iter().enumerate() {
        let Some(x) = *v else {
            run.clear();
            prev = None;
            continue;
        };
        match prev {
            Some(p) => {
                let next = alpha * x + (1.0 - alpha) * p;
                out[i] = Some(next);
                prev = Some(next);
            }
            None => {
                run.push(x);
                if run.len() == period {
                    let seed = run.iter().sum::<f64>() / period as f64;
                    out[i] = Some(seed);
                    prev = Some(seed);
                }
            }
        }
    }
    out
}

pub struct MacdLines {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdLines {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let macd: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = ema_opt(&macd, signal);
    let histogram = macd
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| Some((*m)? - (*s)?))
        .collect();
    MacdLines {
        macd,
        signal: signal_line,
        histogram,
    }
}
