//! Governance efficiency: response, resolution, utilization, policy cost.

use gov_events::{Interaction, InteractionStatus, InteractionType};
use serde::{Deserialize, Serialize};

use super::mean;

/// Response time assumed when no service requests were made
pub const DEFAULT_RESPONSE_TIME: f64 = 1.0;
/// Resolution rate assumed when no service requests were made
pub const DEFAULT_RESOLUTION_RATE: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyMetrics {
    pub avg_response_time: f64,
    pub resolution_rate: f64,
    pub resource_utilization: f64,
    pub policy_cost: f64,
}

pub fn calculate_efficiency(interactions: &[&Interaction]) -> EfficiencyMetrics {
    if interactions.is_empty() {
        return EfficiencyMetrics::default();
    }

    let requests: Vec<&Interaction> = interactions
        .iter()
        .copied()
        .filter(|i| i.interaction_type == InteractionType::ServiceRequest)
        .collect();

    let (avg_response_time, resolution_rate) = if requests.is_empty() {
        (DEFAULT_RESPONSE_TIME, DEFAULT_RESOLUTION_RATE)
    } else {
        let times: Vec<f64> = requests
            .iter()
            .map(|r| r.response_time.unwrap_or(DEFAULT_RESPONSE_TIME))
            .collect();
        let resolved: Vec<f64> = requests
            .iter()
            .map(|r| if r.resolved.unwrap_or(false) { 1.0 } else { 0.0 })
            .collect();
        (mean(&times), mean(&resolved))
    };

    EfficiencyMetrics {
        avg_response_time,
        resolution_rate,
        resource_utilization: resource_usage(interactions),
        policy_cost: policy_implementation_cost(interactions),
    }
}

/// Fraction of interactions whose resources are still committed.
fn resource_usage(interactions: &[&Interaction]) -> f64 {
    if interactions.is_empty() {
        return 0.0;
    }
    let active = interactions
        .iter()
        .filter(|i| i.status == Some(InteractionStatus::Active))
        .count();
    (active as f64 / interactions.len() as f64).min(1.0)
}

fn policy_implementation_cost(interactions: &[&Interaction]) -> f64 {
    let costs: Vec<f64> = interactions
        .iter()
        .filter(|i| i.interaction_type == InteractionType::PolicyImplementation)
        .map(|i| i.cost.unwrap_or(0.0))
        .collect();
    mean(&costs)
}
