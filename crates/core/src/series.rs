use crate::domain::{Bar, BarInterval, RawBar};
use crate::error::{AnalysisError, Result};
use crate::time::MarketCalendar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesOptions {
    /// Sort out-of-order input instead of rejecting it. Duplicates are always rejected.
    pub sort: bool,
    /// Minimum number of bars; the pipeline raises this to the largest indicator lookback.
    pub min_len: usize,
    /// Treat a missing bar as a data error instead of recording it.
    pub reject_gaps: bool,
    /// Extra non-trading days for daily gap detection.
    pub holidays: Vec<NaiveDate>,
}

impl Default for SeriesOptions {
    fn default() -> Self {
        Self {
            sort: false,
            min_len: 1,
            reject_gaps: false,
            holidays: Vec::new(),
        }
    }
}

/// Validated, strictly time-ordered bars for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    symbol: String,
    interval: BarInterval,
    bars: Vec<Bar>,
    gaps: Vec<usize>,
}

impl Series {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> BarInterval {
        self.interval
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Indices preceded by at least one missing bar.
    pub fn gaps(&self) -> &[usize] {
        &self.gaps
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.bars.len().saturating_sub(1)
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume as f64).collect()
    }

    /// Prefix view used when replaying history bar by bar.
    pub fn truncated(&self, len: usize) -> Series {
        let len = len.min(self.bars.len());
        Series {
            symbol: self.symbol.clone(),
            interval: self.interval,
            bars: self.bars[..len].to_vec(),
            gaps: self.gaps.iter().copied().filter(|&g| g < len).collect(),
        }
    }
}

/// Builds a [`Series`] from raw collaborator bars.
pub fn build(
    symbol: &str,
    interval: BarInterval,
    raw_bars: Vec<RawBar>,
    options: &SeriesOptions,
) -> Result<Series> {
    let symbol = symbol.trim().to_string();
    if symbol.is_empty() {
        return Err(AnalysisError::InvalidParameter {
            indicator: "series".to_string(),
            parameter: "symbol",
            value: String::new(),
            reason: "symbol must be non-empty".to_string(),
        });
    }

    let mut bars = Vec::with_capacity(raw_bars.len());
    for (index, raw) in raw_bars.into_iter().enumerate() {
        bars.push(raw.validate_and_into_bar(index)?);
    }

    if options.sort {
        bars.sort_by_key(|b| b.timestamp);
    }

    for (i, pair) in bars.windows(2).enumerate() {
        let (prev, cur) = (&pair[0], &pair[1]);
        if cur.timestamp == prev.timestamp {
            return Err(AnalysisError::data(
                i + 1,
                format!("duplicate timestamp {}", cur.timestamp),
            ));
        }
        if cur.timestamp < prev.timestamp {
            return Err(AnalysisError::data(
                i + 1,
                format!(
                    "timestamp {} is before previous bar {}",
                    cur.timestamp, prev.timestamp
                ),
            ));
        }
    }

    let required = options.min_len.max(1);
    if bars.len() < required {
        return Err(AnalysisError::InsufficientData {
            required,
            available: bars.len(),
            context: format!("series {symbol}"),
        });
    }

    let calendar = MarketCalendar::new(options.holidays.iter().copied());
    let gaps = calendar.find_gaps(interval, &bars);
    if !gaps.is_empty() {
        if options.reject_gaps {
            return Err(AnalysisError::data(
                gaps[0],
                format!("missing {} bar before this index", interval.as_str()),
            ));
        }
        tracing::warn!(
            %symbol,
            interval = interval.as_str(),
            gaps = gaps.len(),
            first_gap = gaps[0],
            "series has missing bars"
        );
    }

    tracing::debug!(%symbol, bars = bars.len(), "series built");

    Ok(Series {
        symbol,
        interval,
        bars,
        gaps,
    })
}
