//! Qualitative labels shown next to a recommendation.

use crate::domain::{Direction, IndicatorKind, IndicatorSet, Recommendation};
use crate::series::Series;
use serde::{Deserialize, Serialize};

const WINDOW: usize = 20;
const HIGH_RISK_RATIO: f64 = 1.5;
const LOW_RISK_RATIO: f64 = 0.7;
const STRONG_TREND: f64 = 0.6;
const MODERATE_TREND: f64 = 0.3;
const BULLISH_SHARE: f64 = 0.7;
const BEARISH_SHARE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStrength {
    Strong,
    Moderate,
    Weak,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Bullish,
    Neutral,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub risk: RiskLevel,
    pub trend_strength: TrendStrength,
    pub sentiment: Sentiment,
}

pub fn assess(series: &Series, indicators: &IndicatorSet, recommendation: &Recommendation) -> Assessment {
    Assessment {
        risk: risk(series, indicators),
        trend_strength: trend_strength(&series.closes()),
        sentiment: sentiment(recommendation),
    }
}

/// Current ATR against its mean over the last 20 bars. Medium without an ATR.
pub fn risk(series: &Series, indicators: &IndicatorSet) -> RiskLevel {
    let last = series.last_index();
    let Some(atr) = indicators.first_of_kind(IndicatorKind::Atr) else {
        return RiskLevel::Medium;
    };
    let Some(current) = atr.primary_at(last) else {
        return RiskLevel::Medium;
    };
    let recent: Vec<f64> = atr.primary()[(last + 1).saturating_sub(WINDOW)..=last]
        .iter()
        .flatten()
        .copied()
        .collect();
    let mean = recent.iter().sum::<f64>() / recent.len() as f64;
    if mean <= 0.0 {
        return RiskLevel::Medium;
    }
    let ratio = current / mean;
    if ratio > HIGH_RISK_RATIO {
        RiskLevel::High
    } else if ratio < LOW_RISK_RATIO {
        RiskLevel::Low
    } else {
        RiskLevel::Medium
    }
}

/// How lopsided up-closes are among the last 20 bars.
pub fn trend_strength(closes: &[f64]) -> TrendStrength {
    if closes.len() < WINDOW {
        return TrendStrength::InsufficientData;
    }
    let recent = &closes[closes.len() - WINDOW..];
    let up = recent.windows(2).filter(|w| w[1] > w[0]).count() as f64;
    let half = WINDOW as f64 / 2.0;
    let consistency = (up - half).abs() / half;
    if consistency > STRONG_TREND {
        TrendStrength::Strong
    } else if consistency > MODERATE_TREND {
        TrendStrength::Moderate
    } else {
        TrendStrength::Weak
    }
}

/// Share of bullish votes among the factors that voted at all.
pub fn sentiment(recommendation: &Recommendation) -> Sentiment {
    let (mut bullish, mut directional) = (0usize, 0usize);
    for f in recommendation.factors.iter().filter(|f| f.weight != 0.0) {
        directional += 1;
        if f.direction == Direction::Bullish {
            bullish += 1;
        }
    }
    if directional == 0 {
        return Sentiment::Neutral;
    }
    let share = bullish as f64 / directional as f64;
    if share > BULLISH_SHARE {
        Sentiment::Bullish
    } else if share < BEARISH_SHARE {
        Sentiment::Bearish
    } else {
        Sentiment::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, Factor};

    fn factor(direction: Direction, weight: f64) -> Factor {
        Factor {
            source: "x".into(),
            origin: "x".into(),
            direction,
            weight,
            value: None,
        }
    }

    #[test]
    fn trend_strength_counts_up_closes() {
        let rising: Vec<f64> = (0..25).map(|i| i as f64).collect();
        assert_eq!(trend_strength(&rising), TrendStrength::Strong);

        let choppy: Vec<f64> = (0..25).map(|i| (i % 2) as f64).collect();
        assert_eq!(trend_strength(&choppy), TrendStrength::Weak);

        assert_eq!(trend_strength(&[1.0, 2.0]), TrendStrength::InsufficientData);
    }

    #[test]
    fn sentiment_ignores_neutral_factors() {
        let rec = Recommendation {
            action: Action::Buy,
            confidence: 0.5,
            score: 0.5,
            factors: vec![
                factor(Direction::Bullish, 1.0),
                factor(Direction::Bullish, 0.5),
                factor(Direction::Bullish, 0.2),
                factor(Direction::Neutral, 0.0),
                factor(Direction::Neutral, 0.0),
            ],
        };
        assert_eq!(sentiment(&rec), Sentiment::Bullish);

        let mixed = Recommendation {
            factors: vec![factor(Direction::Bullish, 1.0), factor(Direction::Bearish, -1.0)],
            ..rec.clone()
        };
        assert_eq!(sentiment(&mixed), Sentiment::Neutral);

        let empty = Recommendation {
            factors: Vec::new(),
            ..rec
        };
        assert_eq!(sentiment(&empty), Sentiment::Neutral);
    }
}
