use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chartsignal_core::alert::AlertStore;
use chartsignal_core::{AnalysisConfig, Analyzer};

mod batch;
mod input;

#[derive(Debug, Parser)]
#[command(name = "chartsignal_worker")]
struct Args {
    /// JSON array of {symbol, interval?, bars}.
    #[arg(long)]
    input: PathBuf,

    /// Analysis config JSON. Defaults to ANALYSIS_CONFIG_PATH, then built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Symbols analyzed at the same time.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Walk each series bar by bar and report alerts along the way.
    #[arg(long)]
    replay: bool,

    /// Validate the input without analyzing it.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = chartsignal_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run(&args, &settings).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "worker run failed");
    }
    result
}

async fn run(args: &Args, settings: &chartsignal_core::config::Settings) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => settings.apply_overrides(AnalysisConfig::from_json_file(path)?)?,
        None => settings.analysis_config()?,
    };
    let inputs = input::load_inputs(&args.input)?;
    tracing::info!(
        symbols = inputs.len(),
        concurrency = args.concurrency,
        replay = args.replay,
        dry_run = args.dry_run,
        "worker run started"
    );

    let analyzer = Analyzer::new(Arc::new(AlertStore::new()), config.alert.clone());
    let lines = batch::run(
        inputs,
        Arc::new(config),
        analyzer,
        batch::RunOptions {
            concurrency: args.concurrency,
            replay: args.replay,
            dry_run: args.dry_run,
        },
    )
    .await?;

    let failed = lines
        .iter()
        .filter(|l| matches!(l, batch::OutputLine::Error { .. }))
        .count();
    for line in &lines {
        println!(
            "{}",
            serde_json::to_string(line).context("failed to encode output line")?
        );
    }

    tracing::info!(lines = lines.len(), failed, "worker run finished");
    Ok(())
}

fn init_sentry(settings: &chartsignal_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
