use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use chartsignal_core::alert::AlertStore;
use chartsignal_core::decision::ExternalSignals;
use chartsignal_core::domain::{AlertEvent, BarInterval, RawBar, Recommendation};
use chartsignal_core::{Analysis, AnalysisConfig, AnalysisError, Analyzer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = chartsignal_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let config = settings.analysis_config()?;
    let state = AppState::new(config);

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/analyze", post(analyze))
        .route("/alerts/check", post(check_alert))
        .route("/alerts/:symbol", delete(reset_alert))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    analyzer: Analyzer,
    config: Arc<AnalysisConfig>,
}

impl AppState {
    fn new(config: AnalysisConfig) -> Self {
        Self {
            analyzer: Analyzer::new(Arc::new(AlertStore::new()), config.alert.clone()),
            config: Arc::new(config),
        }
    }
}

enum ApiError {
    Analysis(AnalysisError),
    Internal(anyhow::Error),
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        Self::Analysis(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Analysis(err) => {
                tracing::info!(error = %err, kind = err.kind(), "analysis rejected");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(ErrorBody {
                        error: err.to_string(),
                        kind: err.kind(),
                    }),
                )
                    .into_response()
            }
            Self::Internal(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    symbol: String,
    #[serde(default)]
    interval: BarInterval,
    bars: Vec<RawBar>,
    /// Replaces the server's analysis config for this request only.
    #[serde(default)]
    config: Option<AnalysisConfig>,
    /// Optional sentiment and fundamental scores in [-1, 1].
    #[serde(default)]
    signals: ExternalSignals,
    /// Also feed the recommendation to the alert evaluator.
    #[serde(default)]
    check_alert: bool,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    run_id: Uuid,
    analysis: Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    alert: Option<AlertEvent>,
}

async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let run_id = Uuid::new_v4();
    let AnalyzeRequest {
        symbol,
        interval,
        bars,
        config,
        signals,
        check_alert,
    } = req;
    let config = config
        .map(Arc::new)
        .unwrap_or_else(|| state.config.clone());
    let analyzer = state.analyzer.clone();

    tracing::info!(%run_id, %symbol, bars = bars.len(), "analyze requested");

    let analysis = tokio::task::spawn_blocking({
        let config = config.clone();
        move || analyzer.analyze_with_signals(&symbol, interval, bars, &signals, &config)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("analysis task panicked")))??;

    let alert = if check_alert {
        state.analyzer.check_analysis(&analysis, &config.alert)
    } else {
        None
    };

    Ok(Json(AnalyzeResponse {
        run_id,
        analysis,
        alert,
    }))
}

#[derive(Debug, Deserialize)]
struct CheckAlertRequest {
    symbol: String,
    recommendation: Recommendation,
}

async fn check_alert(
    State(state): State<AppState>,
    Json(req): Json<CheckAlertRequest>,
) -> Result<Response, ApiError> {
    req.recommendation.validate()?;
    Ok(match state.analyzer.check_alert(&req.symbol, &req.recommendation) {
        Some(event) => Json(event).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn reset_alert(State(state): State<AppState>, Path(symbol): Path<String>) -> StatusCode {
    state.analyzer.reset_alert_state(&symbol);
    StatusCode::NO_CONTENT
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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

#[cfg(test)]
mod tests {
    use super::*;
    use chartsignal_core::domain::{Action, AlertReason};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn bars(n: usize) -> Vec<RawBar> {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = 50.0 + i as f64 * 0.5;
                RawBar {
                    timestamp: start + Duration::hours(i as i64),
                    open: close - 0.2,
                    high: close + 0.3,
                    low: close - 0.4,
                    close,
                    volume: 100.0,
                }
            })
            .collect()
    }

    fn request(n: usize, check_alert: bool) -> AnalyzeRequest {
        AnalyzeRequest {
            symbol: "API".to_string(),
            interval: BarInterval::Hour,
            bars: bars(n),
            config: None,
            signals: ExternalSignals::default(),
            check_alert,
        }
    }

    fn rec(action: Action, confidence: f64) -> Recommendation {
        Recommendation {
            action,
            confidence,
            score: confidence,
            factors: Vec::new(),
        }
    }

    async fn check(state: &AppState, symbol: &str, recommendation: Recommendation) -> StatusCode {
        match check_alert(
            State(state.clone()),
            Json(CheckAlertRequest {
                symbol: symbol.into(),
                recommendation,
            }),
        )
        .await
        {
            Ok(resp) => resp.status(),
            Err(err) => err.into_response().status(),
        }
    }

    #[tokio::test]
    async fn analyze_returns_analysis() {
        let state = AppState::new(AnalysisConfig::default());
        let Ok(Json(resp)) = analyze(State(state), Json(request(80, true))).await else {
            panic!("analysis failed");
        };
        assert_eq!(resp.analysis.series.bars, 80);
        assert!(resp.alert.is_none());
    }

    #[tokio::test]
    async fn short_series_is_unprocessable() {
        let state = AppState::new(AnalysisConfig::default());
        let Err(err) = analyze(State(state), Json(request(10, false))).await else {
            panic!("expected an error");
        };
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let req: AnalyzeRequest = serde_json::from_value(json!({
            "symbol": "X",
            "bars": [],
        }))
        .unwrap();
        assert_eq!(req.interval, BarInterval::Daily);
        assert!(!req.check_alert);
        assert!(req.config.is_none());
        assert_eq!(req.signals, ExternalSignals::default());

        let req: AnalyzeRequest = serde_json::from_value(json!({
            "symbol": "X",
            "bars": [],
            "signals": {"sentiment": 0.4},
        }))
        .unwrap();
        assert_eq!(req.signals.sentiment, Some(0.4));
        assert_eq!(req.signals.fundamental, None);
    }

    #[tokio::test]
    async fn padded_symbol_state_is_reset_by_its_trimmed_name() {
        let state = AppState::new(AnalysisConfig::default());
        let mut req = request(80, true);
        req.symbol = " AAPL ".to_string();
        let Ok(Json(resp)) = analyze(State(state.clone()), Json(req)).await else {
            panic!("analysis failed");
        };
        assert_eq!(resp.analysis.series.symbol, "AAPL");
        assert_eq!(state.analyzer.alerts().store().len(), 1);

        reset_alert(State(state.clone()), Path("AAPL".to_string())).await;
        assert!(state.analyzer.alerts().store().is_empty());
    }

    #[tokio::test]
    async fn per_request_alert_threshold_is_honored() {
        let state = AppState::new(AnalysisConfig::default());
        let Ok(Json(resp)) = analyze(State(state.clone()), Json(request(80, false))).await else {
            panic!("analysis failed");
        };
        let current = resp.analysis.recommendation;
        assert!(current.confidence > 0.0);

        // Same action at half the confidence, then a threshold between the two.
        let mut seed = current.clone();
        seed.confidence /= 2.0;
        seed.score /= 2.0;
        assert!(state.analyzer.check_alert("API", &seed).is_none());

        let threshold = current.confidence * 0.75;
        let mut config = AnalysisConfig::default();
        config.alert.confidence_threshold = threshold;
        let mut req = request(80, true);
        req.config = Some(config);
        let Ok(Json(resp)) = analyze(State(state.clone()), Json(req)).await else {
            panic!("analysis failed");
        };
        let alert = resp.alert.expect("alert under the request threshold");
        assert_eq!(alert.reason, AlertReason::ConfidenceRose { threshold });
    }

    #[tokio::test]
    async fn invalid_recommendation_is_unprocessable() {
        let state = AppState::new(AnalysisConfig::default());
        let mut bad = rec(Action::Buy, 0.9);
        bad.confidence = 1.4;
        assert_eq!(check(&state, "A", bad).await, StatusCode::UNPROCESSABLE_ENTITY);

        let mut bad = rec(Action::Buy, 0.9);
        bad.score = f64::NAN;
        assert_eq!(check(&state, "A", bad).await, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(state.analyzer.alerts().store().is_empty());
    }

    #[tokio::test]
    async fn alert_endpoints_follow_state() {
        let state = AppState::new(AnalysisConfig::default());
        assert_eq!(check(&state, "A", rec(Action::Buy, 0.9)).await, StatusCode::NO_CONTENT);
        assert_eq!(check(&state, "A", rec(Action::Hold, 0.9)).await, StatusCode::OK);

        let status = reset_alert(State(state.clone()), Path("A".to_string())).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.analyzer.alerts().store().is_empty());
    }
}
