//! Per-symbol alerting on recommendation changes and watched price levels.

use crate::domain::{AlertEvent, AlertReason, Recommendation};
use crate::error::{ensure_within, Result};
use crate::levels::TradeLevels;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Crossing this confidence in either direction raises an alert even when
    /// the action is unchanged.
    pub confidence_threshold: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_within("alert", "confidence_threshold", self.confidence_threshold, (0.0, 1.0))
    }
}

/// Prices watched until the next analysis of the same symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchLevels {
    pub stop_loss: Option<f64>,
    pub short_term_target: Option<f64>,
    pub long_term_target: Option<f64>,
}

impl WatchLevels {
    /// Keeps the stop only when it is below `close` and targets only when
    /// they are above it, so fresh levels never trigger on their own close.
    pub fn around(close: f64, trade: &TradeLevels) -> Self {
        Self {
            stop_loss: trade.stop_loss.filter(|&s| s < close),
            short_term_target: trade.short_term_target.filter(|&t| t > close),
            long_term_target: trade.long_term_target.filter(|&t| t > close),
        }
    }

    /// The stop wins over targets, the farther target over the nearer one.
    pub fn hit(&self, price: f64) -> Option<AlertReason> {
        if let Some(stop_loss) = self.stop_loss.filter(|&s| price <= s) {
            return Some(AlertReason::StopLossHit { stop_loss, price });
        }
        [(self.long_term_target, true), (self.short_term_target, false)]
            .into_iter()
            .find_map(|(target, long_term)| {
                let target = target.filter(|&t| price >= t)?;
                Some(AlertReason::TargetHit {
                    target,
                    price,
                    long_term,
                })
            })
    }
}

/// A close together with the trade levels derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceUpdate {
    pub close: f64,
    pub watch: WatchLevels,
}

impl PriceUpdate {
    pub fn new(close: f64, trade: &TradeLevels) -> Self {
        Self {
            close,
            watch: WatchLevels::around(close, trade),
        }
    }
}

/// What the evaluator remembers about one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertState {
    pub recommendation: Recommendation,
    pub watch: WatchLevels,
}

/// Alert state per symbol. One lock guards the whole map so a
/// compare-and-replace never interleaves with another caller.
#[derive(Debug, Default)]
pub struct AlertStore {
    states: Mutex<HashMap<String, AlertState>>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, AlertState>> {
        // The map holds plain values; a panic elsewhere cannot leave it torn.
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands the stored state to `f` and stores the state it returns, all
    /// under one lock.
    pub fn update<R>(
        &self,
        symbol: &str,
        f: impl FnOnce(Option<&AlertState>) -> (AlertState, R),
    ) -> R {
        let mut states = self.lock();
        let (next, out) = f(states.get(symbol));
        states.insert(symbol.to_string(), next);
        out
    }

    pub fn get(&self, symbol: &str) -> Option<AlertState> {
        self.lock().get(symbol).cloned()
    }

    pub fn reset(&self, symbol: &str) -> bool {
        self.lock().remove(symbol).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Symbols are compared the way the series store normalizes them.
fn key(symbol: &str) -> &str {
    symbol.trim()
}

#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    store: Arc<AlertStore>,
    config: AlertConfig,
}

impl AlertEvaluator {
    pub fn new(store: Arc<AlertStore>, config: AlertConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<AlertStore> {
        &self.store
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Records `current` for `symbol` and reports whether it differs from the
    /// previous recommendation enough to alert. The first call for a symbol
    /// never alerts. Watched levels are left as they were.
    pub fn evaluate(&self, symbol: &str, current: &Recommendation) -> Option<AlertEvent> {
        self.evaluate_with(symbol, current, None, &self.config)
    }

    /// Like [`evaluate`](Self::evaluate), with an explicit config and an
    /// optional price update. When no recommendation alert fires, the close
    /// is checked against the levels watched since the previous call; the
    /// update's levels are watched from now on.
    pub fn evaluate_with(
        &self,
        symbol: &str,
        current: &Recommendation,
        price: Option<PriceUpdate>,
        config: &AlertConfig,
    ) -> Option<AlertEvent> {
        let symbol = key(symbol);
        let (previous, reason) = self.store.update(symbol, |stored| {
            let watch = match (price, stored) {
                (Some(p), _) => p.watch,
                (None, Some(s)) => s.watch,
                (None, None) => WatchLevels::default(),
            };
            let found = stored.and_then(|s| {
                let reason = change(&s.recommendation, current, config)
                    .or_else(|| s.watch.hit(price?.close))?;
                Some((s.recommendation.clone(), reason))
            });
            let next = AlertState {
                recommendation: current.clone(),
                watch,
            };
            (next, found)
        })?;

        tracing::info!(%symbol, %reason, "alert raised");
        Some(AlertEvent {
            symbol: symbol.to_string(),
            previous,
            current: current.clone(),
            reason,
        })
    }

    pub fn reset(&self, symbol: &str) {
        let symbol = key(symbol);
        if self.store.reset(symbol) {
            tracing::debug!(%symbol, "alert state reset");
        }
    }
}

fn change(previous: &Recommendation, current: &Recommendation, config: &AlertConfig) -> Option<AlertReason> {
    if previous.action != current.action {
        return Some(AlertReason::ActionChanged {
            from: previous.action,
            to: current.action,
        });
    }
    let threshold = config.confidence_threshold;
    let (was, is) = (previous.confidence >= threshold, current.confidence >= threshold);
    match (was, is) {
        (false, true) => Some(AlertReason::ConfidenceRose { threshold }),
        (true, false) => Some(AlertReason::ConfidenceFell { threshold }),
        _ => None,
    }
}
