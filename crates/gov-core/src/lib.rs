//! Digital Governance Simulation Engine
//!
//! An agent-based model of a city government, its enterprises, and its
//! residents. Each round every agent decides, the decisions turn into
//! interactions, interaction outcomes feed back into agent state and the
//! shared environment, and the recorded rounds are scored for efficiency,
//! fairness, resilience, stakeholder status, and collaboration.

pub mod components;
pub mod config;
pub mod decision;
pub mod error;
pub mod interventions;
pub mod metrics;
pub mod output;
pub mod runner;
pub mod setup;
pub mod systems;

pub use config::{SimConfig, SimulationConfig};
pub use decision::{default_decision, DecisionContext, DecisionProvider, OfflineProvider};
pub use error::{ConfigError, DecisionError, MetricsError, RoundError, SimError};
pub use metrics::{compute_metrics, MetricsReport};
pub use output::{compare_runs, RoundLogger, RunResult, RunStatus};
pub use runner::{CancellationToken, Simulation};
