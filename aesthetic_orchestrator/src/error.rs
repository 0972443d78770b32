use std::path::PathBuf;
use thiserror::Error;

/// Failures that end a run.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(
        "Selected predictor names are invalid: {unknown:?}. Predictor names must be one of {known:?}"
    )]
    InvalidSelection {
        unknown: Vec<String>,
        known: Vec<String>,
    },
    #[error("Predictor {predictor} did not become ready after {attempts} probe(s)")]
    ReadinessTimeout { predictor: String, attempts: u32 },
    #[error("Staging directory {path:?} is unavailable: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write report to {path:?}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode report: {0}")]
    ReportEncoding(#[from] serde_json::Error),
    #[error("Failed to build predictor client: {0}")]
    Client(#[source] PredictorError),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

/// Failure of a single call to a predictor. Never fatal: the caller logs it
/// and records the outcome as absent.
#[derive(Error, Debug)]
pub enum PredictorError {
    #[error("Request to predictor failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Predictor answered with HTTP status {0}")]
    Status(u16),
    #[error("Predictor response is not valid JSON: {0}")]
    Decode(String),
    #[error("Predictor returned an empty payload")]
    EmptyPayload,
}

impl PredictorError {
    /// Short label used as a metric attribute.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictorError::Transport(_) => "transport",
            PredictorError::Status(_) => "status",
            PredictorError::Decode(_) => "decode",
            PredictorError::EmptyPayload => "empty",
        }
    }
}
