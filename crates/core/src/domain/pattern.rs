use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    /// +1 for bullish, -1 for bearish, 0 for neutral.
    pub fn sign(self) -> f64 {
        match self {
            Self::Bullish => 1.0,
            Self::Bearish => -1.0,
            Self::Neutral => 0.0,
        }
    }
}

/// Every pattern the recognizer knows. Declaration order breaks ties between
/// events that start on the same bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Doji,
    Hammer,
    ShootingStar,
    BullishEngulfing,
    BearishEngulfing,
    MorningStar,
    EveningStar,
    GoldenCross,
    DeathCross,
    MacdBullishCross,
    MacdBearishCross,
    BullishDivergence,
    BearishDivergence,
    DoubleTop,
    DoubleBottom,
    HeadAndShoulders,
    UpwardChannel,
    DownwardChannel,
    MultipleTop,
    MultipleBottom,
}

impl PatternKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Doji => "Doji",
            Self::Hammer => "Hammer",
            Self::ShootingStar => "Shooting star",
            Self::BullishEngulfing => "Bullish engulfing",
            Self::BearishEngulfing => "Bearish engulfing",
            Self::MorningStar => "Morning star",
            Self::EveningStar => "Evening star",
            Self::GoldenCross => "Golden cross",
            Self::DeathCross => "Death cross",
            Self::MacdBullishCross => "MACD bullish cross",
            Self::MacdBearishCross => "MACD bearish cross",
            Self::BullishDivergence => "RSI bullish divergence",
            Self::BearishDivergence => "RSI bearish divergence",
            Self::DoubleTop => "Double top",
            Self::DoubleBottom => "Double bottom",
            Self::HeadAndShoulders => "Head and shoulders",
            Self::UpwardChannel => "Upward channel",
            Self::DownwardChannel => "Downward channel",
            Self::MultipleTop => "Multiple top",
            Self::MultipleBottom => "Multiple bottom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternEvent {
    pub kind: PatternKind,
    pub start: usize,
    pub end: usize,
    pub direction: Direction,
    /// In [0, 1].
    pub strength: f64,
}

impl PatternEvent {
    pub fn new(kind: PatternKind, start: usize, end: usize, direction: Direction, strength: f64) -> Self {
        debug_assert!(end >= start);
        Self {
            kind,
            start,
            end,
            direction,
            strength: strength.clamp(0.0, 1.0),
        }
    }

    pub fn key(&self) -> (usize, PatternKind, usize) {
        (self.start, self.kind, self.end)
    }
}
