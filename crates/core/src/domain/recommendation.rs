use crate::domain::pattern::Direction;
use crate::error::{ensure_within, AnalysisError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the rationale trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    /// Human-readable label, e.g. "MACD bullish" or "RSI oversold".
    pub source: String,
    /// Indicator result name or pattern label the factor was read from.
    pub origin: String,
    pub direction: Direction,
    /// Positive for bullish votes, negative for bearish, zero for neutral.
    pub weight: f64,
    /// The observed value the vote was derived from, if any.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: Action,
    /// In [0, 1].
    pub confidence: f64,
    /// Net signed weight divided by total absolute weight, in [-1, 1].
    pub score: f64,
    pub factors: Vec<Factor>,
}

impl Recommendation {
    pub fn has_factor(&self, source: &str) -> bool {
        self.factors.iter().any(|f| f.source == source)
    }

    pub fn total_weight(&self) -> f64 {
        self.factors.iter().map(|f| f.weight.abs()).sum()
    }

    pub fn net_weight(&self) -> f64 {
        self.factors.iter().map(|f| f.weight).sum()
    }

    /// Checks the invariants a recommendation built by `decide` always
    /// holds. Used on recommendations that arrive from outside.
    pub fn validate(&self) -> Result<()> {
        ensure_within("recommendation", "confidence", self.confidence, (0.0, 1.0))?;
        ensure_within("recommendation", "score", self.score, (-1.0, 1.0))?;
        let invalid = |parameter: &'static str, value: f64, reason: &str| {
            Err(AnalysisError::InvalidParameter {
                indicator: "recommendation".to_string(),
                parameter,
                value: value.to_string(),
                reason: reason.to_string(),
            })
        };
        if (self.score.abs() - self.confidence).abs() > 1e-9 {
            return invalid("confidence", self.confidence, "must equal the absolute score");
        }
        match self.action {
            Action::Buy if self.score <= 0.0 => invalid("score", self.score, "must be positive for BUY"),
            Action::Sell if self.score >= 0.0 => invalid("score", self.score, "must be negative for SELL"),
            _ => match self.factors.iter().find(|f| !f.weight.is_finite()) {
                Some(f) => invalid("factors", f.weight, "factor weights must be finite"),
                None => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(action: Action, score: f64) -> Recommendation {
        Recommendation {
            action,
            confidence: score.abs(),
            score,
            factors: vec![Factor {
                source: "RSI oversold".to_string(),
                origin: "rsi_14".to_string(),
                direction: Direction::Bullish,
                weight: 1.0,
                value: Some(25.0),
            }],
        }
    }

    #[test]
    fn consistent_recommendations_pass() {
        assert!(rec(Action::Buy, 0.7).validate().is_ok());
        assert!(rec(Action::Sell, -0.4).validate().is_ok());
        assert!(rec(Action::Hold, 0.02).validate().is_ok());
    }

    #[test]
    fn inconsistent_recommendations_are_rejected() {
        let mut r = rec(Action::Buy, 0.7);
        r.confidence = 1.5;
        assert_eq!(r.validate().unwrap_err().kind(), "invalid_parameter");

        let mut r = rec(Action::Buy, 0.7);
        r.confidence = 0.2;
        assert!(r.validate().is_err());

        let mut r = rec(Action::Buy, 0.7);
        r.score = f64::NAN;
        assert!(r.validate().is_err());

        assert!(rec(Action::Buy, -0.3).validate().is_err());
        assert!(rec(Action::Sell, 0.3).validate().is_err());

        let mut r = rec(Action::Hold, 0.0);
        r.factors[0].weight = f64::INFINITY;
        assert!(r.validate().is_err());
    }
}
