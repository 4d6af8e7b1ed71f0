use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_band_width() -> f64 {
    2.0
}

/// Closed set of indicator families. Declaration order is the canonical
/// evaluation order used by the decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Macd,
    Rsi,
    Stochastic,
    Bollinger,
    Atr,
    Obv,
    Vwma,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 9] = [
        Self::Sma,
        Self::Ema,
        Self::Macd,
        Self::Rsi,
        Self::Stochastic,
        Self::Bollinger,
        Self::Atr,
        Self::Obv,
        Self::Vwma,
    ];
}

/// A requested indicator together with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorSpec {
    Sma {
        period: usize,
    },
    Ema {
        period: usize,
    },
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Rsi {
        period: usize,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
    Bollinger {
        period: usize,
        #[serde(default = "default_band_width")]
        k: f64,
    },
    Atr {
        period: usize,
    },
    Obv,
    Vwma {
        period: usize,
    },
}

impl IndicatorSpec {
    pub fn kind(&self) -> IndicatorKind {
        match self {
            Self::Sma { .. } => IndicatorKind::Sma,
            Self::Ema { .. } => IndicatorKind::Ema,
            Self::Macd { .. } => IndicatorKind::Macd,
            Self::Rsi { .. } => IndicatorKind::Rsi,
            Self::Stochastic { .. } => IndicatorKind::Stochastic,
            Self::Bollinger { .. } => IndicatorKind::Bollinger,
            Self::Atr { .. } => IndicatorKind::Atr,
            Self::Obv => IndicatorKind::Obv,
            Self::Vwma { .. } => IndicatorKind::Vwma,
        }
    }

    /// Canonical result key, e.g. `sma_20`, `macd_12_26_9`, `bb_20_2`.
    pub fn name(&self) -> String {
        match *self {
            Self::Sma { period } => format!("sma_{period}"),
            Self::Ema { period } => format!("ema_{period}"),
            Self::Macd { fast, slow, signal } => format!("macd_{fast}_{slow}_{signal}"),
            Self::Rsi { period } => format!("rsi_{period}"),
            Self::Stochastic { k_period, d_period } => format!("stoch_{k_period}_{d_period}"),
            Self::Bollinger { period, k } => format!("bb_{period}_{k}"),
            Self::Atr { period } => format!("atr_{period}"),
            Self::Obv => "obv".to_string(),
            Self::Vwma { period } => format!("vwma_{period}"),
        }
    }

    /// Number of bars needed before the last output line is defined.
    pub fn lookback(&self) -> usize {
        match *self {
            Self::Sma { period }
            | Self::Ema { period }
            | Self::Bollinger { period, .. }
            | Self::Atr { period }
            | Self::Vwma { period } => period,
            Self::Macd { slow, signal, .. } => slow + signal.saturating_sub(1),
            Self::Rsi { period } => period + 1,
            Self::Stochastic { k_period, d_period } => k_period + d_period.saturating_sub(1),
            Self::Obv => 1,
        }
    }

    /// Every window-length parameter, for validation.
    pub fn periods(&self) -> Vec<(&'static str, usize)> {
        match *self {
            Self::Sma { period }
            | Self::Ema { period }
            | Self::Rsi { period }
            | Self::Bollinger { period, .. }
            | Self::Atr { period }
            | Self::Vwma { period } => vec![("period", period)],
            Self::Macd { fast, slow, signal } => {
                vec![("fast", fast), ("slow", slow), ("signal", signal)]
            }
            Self::Stochastic { k_period, d_period } => {
                vec![("k_period", k_period), ("d_period", d_period)]
            }
            Self::Obv => Vec::new(),
        }
    }

    /// Window length used to order results of the same kind (fast before slow).
    pub fn primary_period(&self) -> usize {
        match *self {
            Self::Macd { fast, .. } => fast,
            Self::Stochastic { k_period, .. } => k_period,
            Self::Obv => 0,
            _ => self.periods().first().map(|(_, p)| *p).unwrap_or(0),
        }
    }
}

/// One named output series, aligned 1:1 with the series index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorLine {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub name: String,
    pub spec: IndicatorSpec,
    pub lookback: usize,
    pub lines: Vec<IndicatorLine>,
}

impl IndicatorResult {
    pub fn kind(&self) -> IndicatorKind {
        self.spec.kind()
    }

    /// The first line (the value line for single-output indicators).
    pub fn primary(&self) -> &[Option<f64>] {
        self.lines
            .first()
            .map(|l| l.values.as_slice())
            .unwrap_or(&[])
    }

    pub fn line(&self, name: &str) -> Option<&[Option<f64>]> {
        self.lines
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.values.as_slice())
    }

    pub fn value_at(&self, line: &str, index: usize) -> Option<f64> {
        self.line(line)?.get(index).copied().flatten()
    }

    pub fn primary_at(&self, index: usize) -> Option<f64> {
        self.primary().get(index).copied().flatten()
    }
}

/// All results computed for one series, keyed by canonical name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorSet {
    results: BTreeMap<String, IndicatorResult>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, result: IndicatorResult) {
        self.results.insert(result.name.clone(), result);
    }

    pub fn get(&self, name: &str) -> Option<&IndicatorResult> {
        self.results.get(name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results of one kind ordered by their primary window (fastest first).
    pub fn of_kind(&self, kind: IndicatorKind) -> Vec<&IndicatorResult> {
        let mut out: Vec<_> = self.results.values().filter(|r| r.kind() == kind).collect();
        out.sort_by(|a, b| {
            a.spec
                .primary_period()
                .cmp(&b.spec.primary_period())
                .then_with(|| a.name.cmp(&b.name))
        });
        out
    }

    pub fn first_of_kind(&self, kind: IndicatorKind) -> Option<&IndicatorResult> {
        self.of_kind(kind).into_iter().next()
    }

    /// All results in canonical order: kind, then primary window, then name.
    pub fn ordered(&self) -> Vec<&IndicatorResult> {
        let mut out: Vec<_> = self.results.values().collect();
        out.sort_by(|a, b| {
            a.kind()
                .cmp(&b.kind())
                .then_with(|| a.spec.primary_period().cmp(&b.spec.primary_period()))
                .then_with(|| a.name.cmp(&b.name))
        });
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndicatorResult)> {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_names_and_lookbacks() {
        let macd = IndicatorSpec::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        };
        assert_eq!(macd.name(), "macd_12_26_9");
        assert_eq!(macd.lookback(), 34);
        assert_eq!(IndicatorSpec::Rsi { period: 14 }.lookback(), 15);
        assert_eq!(
            IndicatorSpec::Bollinger { period: 20, k: 2.0 }.name(),
            "bb_20_2"
        );
        assert_eq!(
            IndicatorSpec::Stochastic {
                k_period: 14,
                d_period: 3
            }
            .lookback(),
            16
        );
        assert_eq!(IndicatorSpec::Obv.lookback(), 1);
    }

    #[test]
    fn specs_deserialize_from_tagged_json() {
        let specs: Vec<IndicatorSpec> = serde_json::from_value(json!([
            {"kind": "sma", "period": 20},
            {"kind": "bollinger", "period": 20},
            {"kind": "obv"},
        ]))
        .unwrap();
        assert_eq!(specs[0], IndicatorSpec::Sma { period: 20 });
        assert_eq!(specs[1], IndicatorSpec::Bollinger { period: 20, k: 2.0 });
        assert_eq!(specs[2], IndicatorSpec::Obv);
    }

    #[test]
    fn of_kind_orders_by_window_not_name() {
        let mut set = IndicatorSet::new();
        for period in [100, 20, 5] {
            let spec = IndicatorSpec::Sma { period };
            set.insert(IndicatorResult {
                name: spec.name(),
                spec,
                lookback: period,
                lines: vec![],
            });
        }
        let names: Vec<_> = set
            .of_kind(IndicatorKind::Sma)
            .iter()
            .map(|r| r.name.clone())
            .collect();
        assert_eq!(names, ["sma_5", "sma_20", "sma_100"]);
    }
}
