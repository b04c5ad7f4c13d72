//! Resilience Metrics
//!
//! How quickly the system recovers from emergencies, how often service is
//! disrupted, whether it improves over the run, and how stable it is.

use gov_events::{InteractionType, RoundRecord};
use serde::{Deserialize, Serialize};

use super::{mean, variance};

/// Recovery speed reported when no emergency was responded to
pub const DEFAULT_RECOVERY_SPEED: f64 = 0.8;
/// Recovery time treated as a complete failure to recover
pub const MAX_RECOVERY_TIME: f64 = 10.0;
/// Recovery time assumed for a response that did not report one
pub const DEFAULT_RECOVERY_TIME: f64 = 5.0;
/// Availability below which a round counts as disrupted
pub const DISRUPTION_THRESHOLD: f64 = 0.8;
/// Runs shorter than this report the neutral adaptive capacity
pub const MIN_ROUNDS_FOR_ADAPTATION: usize = 10;
pub const NEUTRAL_ADAPTIVE_CAPACITY: f64 = 0.5;
/// Normalized satisfaction used for rounds with no residents
pub const DEFAULT_NORMALIZED_SATISFACTION: f64 = 0.6;
/// Variance multiplier in the stability index
pub const STABILITY_SCALE: f64 = 10.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResilienceMetrics {
    pub system_recovery_speed: f64,
    pub service_disruption_rate: f64,
    pub adaptive_capacity: f64,
    pub stability_index: f64,
}

pub fn calculate_resilience(records: &[RoundRecord]) -> ResilienceMetrics {
    if records.is_empty() {
        return ResilienceMetrics::default();
    }
    ResilienceMetrics {
        system_recovery_speed: recovery_speed(records),
        service_disruption_rate: disruption_rate(records),
        adaptive_capacity: adaptive_capacity(records),
        stability_index: stability_index(records),
    }
}

fn recovery_speed(records: &[RoundRecord]) -> f64 {
    let times: Vec<f64> = records
        .iter()
        .flat_map(|r| r.interactions.iter())
        .filter(|i| i.interaction_type == InteractionType::EmergencyResponse)
        .map(|i| i.recovery_time.unwrap_or(DEFAULT_RECOVERY_TIME))
        .collect();
    if times.is_empty() {
        return DEFAULT_RECOVERY_SPEED;
    }
    (1.0 - mean(&times) / MAX_RECOVERY_TIME).max(0.0)
}

fn disruption_rate(records: &[RoundRecord]) -> f64 {
    let disrupted = records
        .iter()
        .filter(|r| r.environment.service_availability < DISRUPTION_THRESHOLD)
        .count();
    disrupted as f64 / records.len() as f64
}

/// Late-run success rate minus early-run success rate, centered on 0.5.
///
/// The early window is the first `n / 3` rounds (rounded down); the late
/// window is the last `n / 3` rounds rounded up.
fn adaptive_capacity(records: &[RoundRecord]) -> f64 {
    let n = records.len();
    if n < MIN_ROUNDS_FOR_ADAPTATION {
        return NEUTRAL_ADAPTIVE_CAPACITY;
    }
    let early = &records[..n / 3];
    let late = &records[n - n.div_ceil(3)..];
    let improvement = period_success_rate(late) - period_success_rate(early);
    (NEUTRAL_ADAPTIVE_CAPACITY + improvement).clamp(0.0, 1.0)
}

/// Mean success rate over rounds that had any interactions.
fn period_success_rate(records: &[RoundRecord]) -> f64 {
    let rates: Vec<f64> = records.iter().filter_map(RoundRecord::success_rate).collect();
    mean(&rates)
}

fn stability_index(records: &[RoundRecord]) -> f64 {
    if records.len() < 2 {
        return 1.0;
    }
    let availability: Vec<f64> = records.iter().map(|r| r.environment.service_availability).collect();
    let satisfaction: Vec<f64> = records
        .iter()
        .map(|r| {
            let residents = &r.agents.residents;
            if residents.is_empty() {
                DEFAULT_NORMALIZED_SATISFACTION
            } else {
                mean(&residents.iter().map(|res| res.satisfaction).collect::<Vec<_>>()) / 5.0
            }
        })
        .collect();

    let total_variance = (variance(&availability) + variance(&satisfaction)) / 2.0;
    (1.0 - total_variance * STABILITY_SCALE).clamp(0.0, 1.0)
}
