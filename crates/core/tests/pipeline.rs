use chartsignal_core::alert::{AlertConfig, AlertStore};
use chartsignal_core::decision::{self, DecisionConfig};
use chartsignal_core::domain::{
    Action, AlertReason, BarInterval, IndicatorLine, IndicatorResult, IndicatorSet, IndicatorSpec,
    RawBar,
};
use chartsignal_core::series::{self, SeriesOptions};
use chartsignal_core::{AnalysisConfig, Analyzer};
use chrono::{Datelike, Duration, TimeZone, Utc, Weekday};
use std::sync::Arc;

/// 60 business days of closes rising by one per day on shrinking volume.
fn rising_bars() -> Vec<RawBar> {
    let mut day = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
    let mut bars = Vec::new();
    for i in 0..60 {
        while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            day += Duration::days(1);
        }
        let close = 100.0 + i as f64;
        let open = close - 0.5;
        bars.push(RawBar {
            timestamp: day,
            open,
            high: close + 0.25,
            low: open - 0.25,
            close,
            volume: 10_000.0 - 100.0 * i as f64,
        });
        day += Duration::days(1);
    }
    bars
}

fn analyzer() -> Analyzer {
    Analyzer::new(Arc::new(AlertStore::new()), AlertConfig::default())
}

#[test]
fn steady_uptrend_is_a_confident_buy() {
    let analysis = analyzer()
        .analyze(
            "UP",
            BarInterval::Daily,
            rising_bars(),
            &AnalysisConfig::default(),
        )
        .unwrap();

    assert!(analysis.series.gaps.is_empty());

    let sma20 = analysis.indicators.get("sma_20").unwrap().primary();
    assert!(sma20[..19].iter().all(Option::is_none));
    for pair in sma20[19..].windows(2) {
        assert!(pair[1].unwrap() > pair[0].unwrap());
    }

    let macd = analysis.indicators.get("macd_12_26_9").unwrap();
    assert!(macd.value_at("macd", 59).unwrap() > 0.0);

    let rec = &analysis.recommendation;
    assert_eq!(rec.action, Action::Buy);
    assert!(rec.confidence > 0.5, "confidence {}", rec.confidence);
    assert!(rec.has_factor("MACD bullish"));
    assert!(rec.has_factor("RSI overbought"));
    assert!((rec.net_weight() / rec.total_weight() - rec.score).abs() < 1e-12);
}

#[test]
fn analysis_is_reproducible() {
    let config = AnalysisConfig::default();
    let a = analyzer()
        .analyze("UP", BarInterval::Daily, rising_bars(), &config)
        .unwrap();
    let b = analyzer()
        .analyze("UP", BarInterval::Daily, rising_bars(), &config)
        .unwrap();
    assert_eq!(a, b);
}

fn static_indicators(rsi: f64, len: usize) -> IndicatorSet {
    let constant = |spec: IndicatorSpec, lines: &[(&str, f64)]| IndicatorResult {
        name: spec.name(),
        spec,
        lookback: spec.lookback(),
        lines: lines
            .iter()
            .map(|(name, v)| IndicatorLine {
                name: name.to_string(),
                values: vec![Some(*v); len],
            })
            .collect(),
    };
    let mut set = IndicatorSet::new();
    set.insert(constant(IndicatorSpec::Rsi { period: 14 }, &[("value", rsi)]));
    set.insert(constant(
        IndicatorSpec::Bollinger { period: 20, k: 2.0 },
        &[("upper", 170.0), ("middle", 159.0), ("lower", 150.0)],
    ));
    set
}

#[test]
fn rsi_dropping_into_oversold_alerts_once() {
    let series = series::build(
        "ALRT",
        BarInterval::Daily,
        rising_bars(),
        &SeriesOptions::default(),
    )
    .unwrap();
    let config = DecisionConfig {
        min_factors: 2,
        ..DecisionConfig::default()
    };
    let analyzer = analyzer();

    let before = decision::decide(&series, &static_indicators(35.0, series.len()), &[], &config)
        .unwrap();
    assert_eq!(before.action, Action::Hold);
    assert!(analyzer.check_alert("ALRT", &before).is_none());

    let after = decision::decide(&series, &static_indicators(22.0, series.len()), &[], &config)
        .unwrap();
    assert_eq!(after.action, Action::Buy);

    let event = analyzer.check_alert("ALRT", &after).unwrap();
    assert_eq!(event.symbol, "ALRT");
    assert_eq!(
        event.reason,
        AlertReason::ActionChanged {
            from: Action::Hold,
            to: Action::Buy,
        }
    );
    assert!(analyzer.check_alert("ALRT", &after).is_none());

    analyzer.reset_alert_state("ALRT");
    assert!(analyzer.check_alert("ALRT", &before).is_none());
}

#[test]
fn replaying_prefixes_reuses_one_series() {
    let config = AnalysisConfig::default();
    let analyzer = analyzer();
    let series = series::build(
        "UP",
        BarInterval::Daily,
        rising_bars(),
        &SeriesOptions {
            min_len: config.min_len(),
            ..SeriesOptions::default()
        },
    )
    .unwrap();

    let mut alerts = 0;
    for len in config.min_len()..=series.len() {
        let analysis = analyzer
            .analyze_series(&series.truncated(len), &config)
            .unwrap();
        if analyzer
            .check_alert("UP", &analysis.recommendation)
            .is_some()
        {
            alerts += 1;
        }
    }
    // A clean uptrend never flips to another action.
    assert_eq!(alerts, 0);
}
