//! Run Results
//!
//! The outcome of one simulation run, the two-city comparison, and the JSON
//! writers for both.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use gov_events::RoundRecord;
use serde::Serialize;

use crate::interventions::PolicyEffects;
use crate::metrics::MetricsReport;

/// Default directory for result files
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Interrupted,
}

/// Everything a finished (or interrupted) run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub city: String,
    pub num_rounds: u32,
    pub rounds_completed: usize,
    pub failed_rounds: usize,
    pub status: RunStatus,
    pub policy_interventions: Vec<String>,
    pub policy_effects: PolicyEffects,
    /// `None` when the metrics could not be computed
    pub metrics: Option<MetricsReport>,
    /// Policies suggested by the final metrics, excluding those already applied
    pub recommended_policies: Vec<String>,
    /// Raw round records; kept in memory only, the round log has them on disk
    #[serde(skip)]
    pub records: Vec<RoundRecord>,
}

/// One metric compared across cities
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricComparison {
    pub metric: String,
    pub values: BTreeMap<String, f64>,
    /// City with the lower value
    pub winner: String,
}

/// Head-to-head summary of two runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityComparison {
    pub efficiency_comparison: MetricComparison,
    pub fairness_comparison: MetricComparison,
}

/// Both runs plus their comparison, as written by `govsim compare`
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub runs: Vec<RunResult>,
    pub comparison_summary: Option<CityComparison>,
}

fn lower_wins(metric: &str, a: (&str, f64), b: (&str, f64)) -> MetricComparison {
    // Ties go to the second city
    let winner = if a.1 < b.1 { a.0 } else { b.0 };
    MetricComparison {
        metric: metric.to_string(),
        values: BTreeMap::from([(a.0.to_string(), a.1), (b.0.to_string(), b.1)]),
        winner: winner.to_string(),
    }
}

/// Compare two runs on response time and service access inequality.
///
/// Lower is better for both. Returns `None` if either run has no metrics.
pub fn compare_runs(a: &RunResult, b: &RunResult) -> Option<CityComparison> {
    let (ma, mb) = (a.metrics.as_ref()?, b.metrics.as_ref()?);
    Some(CityComparison {
        efficiency_comparison: lower_wins(
            "avg_response_time",
            (&a.city, ma.efficiency.avg_response_time),
            (&b.city, mb.efficiency.avg_response_time),
        ),
        fairness_comparison: lower_wins(
            "service_access_gini",
            (&a.city, ma.fairness.service_access_gini),
            (&b.city, mb.fairness.service_access_gini),
        ),
    })
}

/// Write any result value as pretty JSON into `dir/file_name`, creating the
/// directory if needed.
pub fn write_json<T: Serialize>(value: &T, dir: impl AsRef<Path>, file_name: &str) -> std::io::Result<PathBuf> {
    let dir = dir.as_ref();
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    let path = dir.join(file_name);
    fs::write(&path, json)?;
    Ok(path)
}

/// Write a run result as `<city>_results.json`
pub fn write_results(result: &RunResult, dir: impl AsRef<Path>) -> std::io::Result<PathBuf> {
    write_json(result, dir, &format!("{}_results.json", result.city))
}
