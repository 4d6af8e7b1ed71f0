use crate::input::SymbolInput;
use chartsignal_core::domain::AlertEvent;
use chartsignal_core::pipeline::build_series;
use chartsignal_core::{Analysis, AnalysisConfig, AnalysisError, Analyzer};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub concurrency: usize,
    /// Walk each series bar by bar from the minimum length, checking alerts.
    pub replay: bool,
    /// Only build and validate the series.
    pub dry_run: bool,
}

/// One line of worker output.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputLine {
    Validated {
        symbol: String,
        bars: usize,
        gaps: usize,
    },
    Analysis {
        symbol: String,
        analysis: Box<Analysis>,
    },
    Alert {
        /// Number of bars seen when the alert fired.
        bars: usize,
        event: AlertEvent,
    },
    Error {
        symbol: String,
        kind: &'static str,
        error: String,
    },
}

/// Processes every input on the blocking pool, at most `concurrency` at a
/// time. Output keeps input order; within one symbol, lines keep the order
/// they were produced in.
pub async fn run(
    inputs: Vec<SymbolInput>,
    config: Arc<AnalysisConfig>,
    analyzer: Analyzer,
    options: RunOptions,
) -> anyhow::Result<Vec<OutputLine>> {
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, input) in inputs.into_iter().enumerate() {
        let permit = semaphore.clone().acquire_owned().await?;
        let config = config.clone();
        let analyzer = analyzer.clone();
        tasks.spawn_blocking(move || {
            let _permit = permit;
            (index, process(input, &config, &analyzer, options))
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        results.push(joined?);
    }
    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().flat_map(|(_, lines)| lines).collect())
}

fn process(
    input: SymbolInput,
    config: &AnalysisConfig,
    analyzer: &Analyzer,
    options: RunOptions,
) -> Vec<OutputLine> {
    let symbol = input.symbol.clone();
    match process_symbol(input, config, analyzer, options) {
        Ok(lines) => lines,
        Err(err) => {
            tracing::warn!(%symbol, error = %err, kind = err.kind(), "symbol skipped");
            vec![OutputLine::Error {
                symbol,
                kind: err.kind(),
                error: err.to_string(),
            }]
        }
    }
}

fn process_symbol(
    input: SymbolInput,
    config: &AnalysisConfig,
    analyzer: &Analyzer,
    options: RunOptions,
) -> Result<Vec<OutputLine>, AnalysisError> {
    let min_len = config.min_len();
    let signals = input.signals;
    let series = build_series(&input.symbol, input.interval, input.bars, config)?;
    let symbol = series.symbol().to_string();

    if options.dry_run {
        return Ok(vec![OutputLine::Validated {
            symbol,
            bars: series.len(),
            gaps: series.gaps().len(),
        }]);
    }

    let mut lines = Vec::new();
    if options.replay {
        analyzer.reset_alert_state(&symbol);
        for len in min_len..series.len() {
            let step = analyzer.analyze_series_with(&series.truncated(len), &signals, config)?;
            if let Some(event) = analyzer.check_analysis(&step, &config.alert) {
                lines.push(OutputLine::Alert { bars: len, event });
            }
        }
    }

    let analysis = analyzer.analyze_series_with(&series, &signals, config)?;
    if options.replay {
        if let Some(event) = analyzer.check_analysis(&analysis, &config.alert) {
            lines.push(OutputLine::Alert {
                bars: series.len(),
                event,
            });
        }
    }
    lines.push(OutputLine::Analysis {
        symbol,
        analysis: Box::new(analysis),
    });
    Ok(lines)
}
