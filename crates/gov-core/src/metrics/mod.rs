//! Evaluation Metrics
//!
//! Five independent calculators over the round history and the final agent
//! snapshot. Each is pure and total: empty input yields documented defaults,
//! never an error.

pub mod agent_status;
pub mod collaboration;
pub mod efficiency;
pub mod fairness;
pub mod resilience;

pub use agent_status::{
    calculate_agent_status, herfindahl_index, AgentStatusMetrics, EnterpriseMetrics,
    GovernmentMetrics, OverallStatus, ResidentMetrics,
};
pub use collaboration::{calculate_collaboration, CollaborationMetrics, StakeholderEngagement};
pub use efficiency::{calculate_efficiency, EfficiencyMetrics};
pub use fairness::{calculate_fairness, gini_coefficient, FairnessMetrics};
pub use resilience::{calculate_resilience, ResilienceMetrics};

use gov_events::{AgentsSnapshot, Interaction, RoundRecord};
use serde::{Deserialize, Serialize};

use crate::error::MetricsError;

/// All five metric groups, keyed the way results are persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub efficiency: EfficiencyMetrics,
    pub fairness: FairnessMetrics,
    pub resilience: ResilienceMetrics,
    pub agent_status: AgentStatusMetrics,
    pub collaboration: CollaborationMetrics,
}

impl MetricsReport {
    /// Every reported number, flattened to dotted names.
    pub fn values(&self) -> Vec<(String, f64)> {
        let mut out = Vec::new();
        if let Ok(serde_json::Value::Object(groups)) = serde_json::to_value(self) {
            for (group, value) in groups {
                flatten_numbers(&group, &value, &mut out);
            }
        }
        out
    }

    /// Reject reports containing NaN or infinite values.
    pub fn validate(&self) -> Result<(), MetricsError> {
        // serde_json writes non-finite floats as null, so check the fields directly
        for (name, value) in self.raw_values() {
            if !value.is_finite() {
                return Err(MetricsError::NonFinite(name.to_string()));
            }
        }
        Ok(())
    }

    fn raw_values(&self) -> Vec<(&'static str, f64)> {
        let e = &self.efficiency;
        let f = &self.fairness;
        let r = &self.resilience;
        let a = &self.agent_status;
        let c = &self.collaboration;
        vec![
            ("efficiency.avg_response_time", e.avg_response_time),
            ("efficiency.resolution_rate", e.resolution_rate),
            ("efficiency.resource_utilization", e.resource_utilization),
            ("efficiency.policy_cost", e.policy_cost),
            ("fairness.service_access_gini", f.service_access_gini),
            ("fairness.usage_depth_gini", f.usage_depth_gini),
            ("fairness.satisfaction_gini", f.satisfaction_gini),
            ("fairness.digital_divide_index", f.digital_divide_index),
            ("resilience.system_recovery_speed", r.system_recovery_speed),
            ("resilience.service_disruption_rate", r.service_disruption_rate),
            ("resilience.adaptive_capacity", r.adaptive_capacity),
            ("resilience.stability_index", r.stability_index),
            ("agent_status.resident_metrics.avg_satisfaction", a.resident_metrics.avg_satisfaction),
            ("agent_status.resident_metrics.avg_trust", a.resident_metrics.avg_trust),
            ("agent_status.resident_metrics.satisfaction_std", a.resident_metrics.satisfaction_std),
            ("agent_status.resident_metrics.trust_std", a.resident_metrics.trust_std),
            ("agent_status.resident_metrics.digital_adoption_rate", a.resident_metrics.digital_adoption_rate),
            ("agent_status.enterprise_metrics.avg_market_share", a.enterprise_metrics.avg_market_share),
            ("agent_status.enterprise_metrics.avg_innovation_level", a.enterprise_metrics.avg_innovation_level),
            ("agent_status.enterprise_metrics.avg_compliance_rate", a.enterprise_metrics.avg_compliance_rate),
            ("agent_status.enterprise_metrics.market_concentration", a.enterprise_metrics.market_concentration),
            ("agent_status.government_metrics.goal_achievement_rate", a.government_metrics.goal_achievement_rate),
            ("agent_status.government_metrics.policy_effectiveness", a.government_metrics.policy_effectiveness),
            ("agent_status.government_metrics.resource_utilization", a.government_metrics.resource_utilization),
            ("agent_status.government_metrics.financial_efficiency", a.government_metrics.financial_efficiency),
            ("agent_status.government_metrics.transparency_level", a.government_metrics.transparency_level),
            ("agent_status.overall_status.system_health", a.overall_status.system_health),
            ("agent_status.overall_status.stakeholder_balance", a.overall_status.stakeholder_balance),
            ("agent_status.overall_status.sustainability", a.overall_status.sustainability),
            ("collaboration.cross_department_sharing_frequency", c.cross_department_sharing_frequency),
            ("collaboration.joint_action_rate", c.joint_action_rate),
            ("collaboration.conflict_rate", c.conflict_rate),
            ("collaboration.cooperation_index", c.cooperation_index),
            ("collaboration.trust_network_density", c.trust_network_density),
            ("collaboration.stakeholder_engagement.government_engagement", c.stakeholder_engagement.government_engagement),
            ("collaboration.stakeholder_engagement.enterprise_engagement", c.stakeholder_engagement.enterprise_engagement),
            ("collaboration.stakeholder_engagement.resident_engagement", c.stakeholder_engagement.resident_engagement),
        ]
    }
}

fn flatten_numbers(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, f64)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, inner) in map {
                flatten_numbers(&format!("{}.{}", prefix, key), inner, out);
            }
        }
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_f64() {
                out.push((prefix.to_string(), v));
            }
        }
        _ => {}
    }
}

/// Compute every metric group over the collected rounds and final agents.
///
/// The calculators themselves never fail; the report is validated so that a
/// non-finite value surfaces as an error the driver can turn into "no metrics".
pub fn compute_metrics(records: &[RoundRecord], agents: &AgentsSnapshot) -> Result<MetricsReport, MetricsError> {
    let interactions: Vec<&Interaction> = records.iter().flat_map(|r| r.interactions.iter()).collect();

    let report = MetricsReport {
        efficiency: calculate_efficiency(&interactions),
        fairness: calculate_fairness(&agents.residents),
        resilience: calculate_resilience(records),
        agent_status: calculate_agent_status(agents),
        collaboration: calculate_collaboration(records),
    };
    report.validate()?;
    Ok(report)
}

/// Arithmetic mean; 0 for an empty slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance; 0 for an empty slice.
pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_helpers() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert!((variance(&[1.0, 2.0, 3.0]) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(std_dev(&[4.0, 4.0]), 0.0);
    }

    #[test]
    fn test_empty_run_metrics() {
        let report = compute_metrics(&[], &AgentsSnapshot::default()).unwrap();
        assert_eq!(report.efficiency.avg_response_time, 0.0);
        assert_eq!(report.fairness.service_access_gini, 0.0);
        assert_eq!(report.resilience.system_recovery_speed, 0.0);
        assert_eq!(report.collaboration.cooperation_index, 0.0);
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut report = MetricsReport::default();
        assert!(report.validate().is_ok());
        report.resilience.stability_index = f64::NAN;
        assert_eq!(
            report.validate(),
            Err(MetricsError::NonFinite("resilience.stability_index".to_string()))
        );
    }

    #[test]
    fn test_values_flattened_with_group_prefix() {
        let report = MetricsReport::default();
        let values = report.values();
        assert!(values.iter().any(|(k, _)| k == "fairness.digital_divide_index"));
        assert!(values
            .iter()
            .any(|(k, _)| k == "agent_status.overall_status.system_health"));
    }
}
