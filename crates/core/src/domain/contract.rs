use crate::domain::bar::Bar;
use crate::error::{AnalysisError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bar as delivered by the market-data collaborator, before any checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl RawBar {
    pub fn validate_and_into_bar(self, index: usize) -> Result<Bar> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() {
                return Err(AnalysisError::data(index, format!("{field} is not finite")));
            }
            if value <= 0.0 {
                return Err(AnalysisError::data(
                    index,
                    format!("{field} must be positive (got {value})"),
                ));
            }
        }

        let body_top = self.open.max(self.close);
        let body_bottom = self.open.min(self.close);
        if self.high < body_top || self.high < self.low {
            return Err(AnalysisError::data(
                index,
                format!(
                    "high {} is below max(open, close, low) {}",
                    self.high,
                    body_top.max(self.low)
                ),
            ));
        }
        if self.low > body_bottom {
            return Err(AnalysisError::data(
                index,
                format!("low {} is above min(open, close) {body_bottom}", self.low),
            ));
        }

        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(AnalysisError::data(
                index,
                format!("volume must be non-negative (got {})", self.volume),
            ));
        }
        if self.volume.fract() != 0.0 {
            return Err(AnalysisError::data(
                index,
                format!("volume must be a whole number (got {})", self.volume),
            ));
        }

        Ok(Bar {
            timestamp: self.timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume as u64,
        })
    }
}
