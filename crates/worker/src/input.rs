use anyhow::Context;
use chartsignal_core::decision::ExternalSignals;
use chartsignal_core::domain::{BarInterval, RawBar};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// One symbol's history as handed over by the market-data collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolInput {
    pub symbol: String,
    #[serde(default)]
    pub interval: BarInterval,
    /// Sentiment and fundamental scores, when the collaborator has them.
    #[serde(default)]
    pub signals: ExternalSignals,
    pub bars: Vec<RawBar>,
}

pub fn load_inputs(path: &Path) -> anyhow::Result<Vec<SymbolInput>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read input file {}", path.display()))?;
    parse_inputs(&raw).with_context(|| format!("invalid input file {}", path.display()))
}

pub fn parse_inputs(raw: &str) -> anyhow::Result<Vec<SymbolInput>> {
    let inputs: Vec<SymbolInput> = serde_json::from_str(raw).context("expected a JSON array of symbols")?;

    // Alert state is keyed by symbol; two entries would race on it.
    let mut seen = HashSet::new();
    for input in &inputs {
        let symbol = input.symbol.trim();
        anyhow::ensure!(
            seen.insert(symbol.to_string()),
            "symbol {symbol} appears more than once"
        );
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_symbols_with_default_interval() {
        let raw = json!([
            {"symbol": "AAA", "bars": [
                {"timestamp": "2026-01-05T00:00:00Z", "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 10}
            ]},
            {"symbol": "BBB", "interval": "hour", "bars": []}
        ])
        .to_string();
        let inputs = parse_inputs(&raw).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].interval, BarInterval::Daily);
        assert_eq!(inputs[0].bars.len(), 1);
        assert_eq!(inputs[1].interval, BarInterval::Hour);
        assert_eq!(inputs[0].signals, ExternalSignals::default());
    }

    #[test]
    fn reads_optional_signals() {
        let raw = json!([
            {"symbol": "AAA", "signals": {"fundamental": 0.25}, "bars": []}
        ])
        .to_string();
        let inputs = parse_inputs(&raw).unwrap();
        assert_eq!(inputs[0].signals.fundamental, Some(0.25));
        assert_eq!(inputs[0].signals.sentiment, None);
    }

    #[test]
    fn rejects_duplicate_symbols() {
        let raw = json!([
            {"symbol": "AAA", "bars": []},
            {"symbol": " AAA", "bars": []}
        ])
        .to_string();
        let err = parse_inputs(&raw).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
