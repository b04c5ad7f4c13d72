//! Output
//!
//! The JSONL round log and the JSON result files.

pub mod logger;
pub mod results;

pub use logger::{AgentCounts, LogEntry, LogLine, RoundLogger};
pub use results::{
    compare_runs, write_json, write_results, CityComparison, ComparisonReport, MetricComparison,
    RunResult, RunStatus, DEFAULT_OUTPUT_DIR,
};
