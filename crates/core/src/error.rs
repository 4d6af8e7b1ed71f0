use thiserror::Error;

/// Failures surfaced by the analysis pipeline.
///
/// Every variant is a deterministic function of the input shape, so callers
/// either fix the input (more history, other parameters) or give up. The core
/// never substitutes a default result for any of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("invalid bar at index {index}: {reason}")]
    Data { index: usize, reason: String },

    #[error("insufficient data for {context}: required {required} bars, got {available}")]
    InsufficientData {
        required: usize,
        available: usize,
        context: String,
    },

    #[error("invalid parameter {indicator}.{parameter} = {value}: {reason}")]
    InvalidParameter {
        indicator: String,
        parameter: &'static str,
        value: String,
        reason: String,
    },

    #[error(
        "incomplete analysis: {evaluated} factors evaluated, at least {required} required (undefined: {})",
        .skipped.join(", ")
    )]
    IncompleteAnalysis {
        evaluated: usize,
        required: usize,
        skipped: Vec<String>,
    },
}

impl AnalysisError {
    pub fn data(index: usize, reason: impl Into<String>) -> Self {
        Self::Data {
            index,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable tag, used by the HTTP layer.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Data { .. } => "data_error",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::IncompleteAnalysis { .. } => "incomplete_analysis",
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Rejects a tunable that is zero, negative or not finite.
pub(crate) fn ensure_positive(section: &str, parameter: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }
    Err(AnalysisError::InvalidParameter {
        indicator: section.to_string(),
        parameter,
        value: value.to_string(),
        reason: "must be a positive finite number".to_string(),
    })
}

pub(crate) fn ensure_non_negative(section: &str, parameter: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }
    Err(AnalysisError::InvalidParameter {
        indicator: section.to_string(),
        parameter,
        value: value.to_string(),
        reason: "must be a non-negative finite number".to_string(),
    })
}

pub(crate) fn ensure_within(
    section: &str,
    parameter: &'static str,
    value: f64,
    (lo, hi): (f64, f64),
) -> Result<()> {
    if value.is_finite() && value >= lo && value <= hi {
        return Ok(());
    }
    Err(AnalysisError::InvalidParameter {
        indicator: section.to_string(),
        parameter,
        value: value.to_string(),
        reason: format!("must be within [{lo}, {hi}]"),
    })
}
