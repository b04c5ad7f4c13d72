//! Error types for the governance simulation
//!
//! None of these are fatal to a run. The driver turns each one into a
//! fallback, a skipped action, a skipped round, or an empty metrics report.

use thiserror::Error;

/// Top-level error for the binary and for setup
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration loading and lookup errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown city: {0}")]
    UnknownCity(String),

    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),

    #[error("Invalid area weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid value {value} for {field}")]
    InvalidParameter { field: String, value: f64 },
}

/// Decision Provider failures; always recovered with a default decision
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DecisionError {
    #[error("provider failed: {0}")]
    Failed(String),

    #[error("provider timed out after {0} ms")]
    Timeout(u64),

    #[error("decision is missing action or target")]
    Malformed,

    #[error("could not parse decision: {0}")]
    Parse(String),
}

/// Unexpected failure while processing a round
#[derive(Debug, Error)]
pub enum RoundError {
    #[error("invalid state in round {round}: {reason}")]
    InvalidState { round: u32, reason: String },

    #[error("round logger failed: {0}")]
    Logger(#[from] std::io::Error),
}

/// Metrics computation failure
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MetricsError {
    #[error("metric {0} is not finite")]
    NonFinite(String),
}
