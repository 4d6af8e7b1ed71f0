use crate::domain::recommendation::{Action, Recommendation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertReason {
    ActionChanged { from: Action, to: Action },
    ConfidenceRose { threshold: f64 },
    ConfidenceFell { threshold: f64 },
    /// The close fell to the stop loss watched since the previous analysis.
    StopLossHit { stop_loss: f64, price: f64 },
    /// The close reached a watched target; `long_term` for the farther one.
    TargetHit {
        target: f64,
        price: f64,
        long_term: bool,
    },
}

impl std::fmt::Display for AlertReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ActionChanged { from, to } => write!(f, "action changed {from} -> {to}"),
            Self::ConfidenceRose { threshold } => {
                write!(f, "confidence rose above {threshold}")
            }
            Self::ConfidenceFell { threshold } => {
                write!(f, "confidence fell below {threshold}")
            }
            Self::StopLossHit { stop_loss, price } => {
                write!(f, "price {price} hit stop loss {stop_loss}")
            }
            Self::TargetHit {
                target,
                price,
                long_term,
            } => {
                let which = if *long_term { "long-term" } else { "short-term" };
                write!(f, "price {price} reached {which} target {target}")
            }
        }
    }
}

/// Handed to the notification collaborator; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub symbol: String,
    pub previous: Recommendation,
    pub current: Recommendation,
    pub reason: AlertReason,
}
