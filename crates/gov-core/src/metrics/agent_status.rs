//! Agent Status Metrics
//!
//! Per-role descriptive statistics and an overall status triple. The
//! composite weights are fixed.

use gov_events::{AgentsSnapshot, EnterpriseSnapshot, GovernmentSnapshot, ResidentSnapshot};
use serde::{Deserialize, Serialize};

use super::{mean, std_dev};

/// Weights and scales used by the composites
pub mod status_weights {
    /// Goal achievement discount for imperfect policy alignment
    pub const POLICY_ALIGNMENT: f64 = 0.8;
    /// Toolkit size treated as complete
    pub const FULL_TOOLKIT: f64 = 5.0;
    pub const TOOLKIT_WEIGHT: f64 = 0.3;
    pub const TRANSPARENCY_WEIGHT: f64 = 0.3;
    pub const REGULATION_WEIGHT: f64 = 0.4;

    pub const HEALTH_SATISFACTION: f64 = 0.3;
    pub const HEALTH_INNOVATION: f64 = 0.3;
    pub const HEALTH_GOALS: f64 = 0.4;

    pub const SUSTAIN_UTILIZATION: f64 = 0.4;
    pub const SUSTAIN_COMPLIANCE: f64 = 0.3;
    pub const SUSTAIN_ADOPTION: f64 = 0.3;

    /// Usage frequency above which a resident with access counts as adopted
    pub const ADOPTION_USAGE: f64 = 2.0;
}

use status_weights::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResidentMetrics {
    pub avg_satisfaction: f64,
    pub avg_trust: f64,
    pub satisfaction_std: f64,
    pub trust_std: f64,
    pub digital_adoption_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnterpriseMetrics {
    pub avg_market_share: f64,
    pub avg_innovation_level: f64,
    pub avg_compliance_rate: f64,
    /// Herfindahl index of market shares
    pub market_concentration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernmentMetrics {
    pub goal_achievement_rate: f64,
    pub policy_effectiveness: f64,
    pub resource_utilization: f64,
    pub financial_efficiency: f64,
    pub transparency_level: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallStatus {
    pub system_health: f64,
    pub stakeholder_balance: f64,
    pub sustainability: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStatusMetrics {
    pub resident_metrics: ResidentMetrics,
    pub enterprise_metrics: EnterpriseMetrics,
    pub government_metrics: GovernmentMetrics,
    pub overall_status: OverallStatus,
}

pub fn calculate_agent_status(agents: &AgentsSnapshot) -> AgentStatusMetrics {
    let resident_metrics = resident_metrics(&agents.residents);
    let enterprise_metrics = enterprise_metrics(&agents.enterprises);
    let government_metrics = agents
        .government
        .as_ref()
        .map(government_metrics)
        .unwrap_or_default();
    let overall_status = overall_status(&resident_metrics, &enterprise_metrics, &government_metrics);

    AgentStatusMetrics {
        resident_metrics,
        enterprise_metrics,
        government_metrics,
        overall_status,
    }
}

fn resident_metrics(residents: &[ResidentSnapshot]) -> ResidentMetrics {
    if residents.is_empty() {
        return ResidentMetrics::default();
    }
    let satisfaction: Vec<f64> = residents.iter().map(|r| r.satisfaction).collect();
    let trust: Vec<f64> = residents.iter().map(|r| r.trust_in_government).collect();
    let adopters = residents
        .iter()
        .filter(|r| r.digital_access && r.service_usage_frequency > ADOPTION_USAGE)
        .count();

    ResidentMetrics {
        avg_satisfaction: mean(&satisfaction),
        avg_trust: mean(&trust),
        satisfaction_std: std_dev(&satisfaction),
        trust_std: std_dev(&trust),
        digital_adoption_rate: adopters as f64 / residents.len() as f64,
    }
}

fn enterprise_metrics(enterprises: &[EnterpriseSnapshot]) -> EnterpriseMetrics {
    if enterprises.is_empty() {
        return EnterpriseMetrics::default();
    }
    let shares: Vec<f64> = enterprises.iter().map(|e| e.market_share).collect();
    let innovation: Vec<f64> = enterprises.iter().map(|e| e.innovation_level).collect();
    let compliance: Vec<f64> = enterprises.iter().map(|e| e.data_usage_compliance).collect();

    EnterpriseMetrics {
        avg_market_share: mean(&shares),
        avg_innovation_level: mean(&innovation),
        avg_compliance_rate: mean(&compliance),
        market_concentration: herfindahl_index(&shares),
    }
}

/// Herfindahl-Hirschman index over shares normalized to sum to 1.
///
/// Equal shares give `1/n`; a single actor gives 1. Empty input or a zero
/// total gives 0.
pub fn herfindahl_index(shares: &[f64]) -> f64 {
    let total: f64 = shares.iter().sum();
    if shares.is_empty() || total == 0.0 {
        return 0.0;
    }
    shares.iter().map(|s| (s / total).powi(2)).sum()
}

fn government_metrics(government: &GovernmentSnapshot) -> GovernmentMetrics {
    let goal_achievement_rate =
        ((government.financial_resources + government.technical_capability) / 200.0 * POLICY_ALIGNMENT).min(1.0);

    let toolkit_score = (government.policy_toolkit.len() as f64 / FULL_TOOLKIT).min(1.0);
    let policy_effectiveness = toolkit_score * TOOLKIT_WEIGHT
        + government.information_transparency / 100.0 * TRANSPARENCY_WEIGHT
        + government.platform_regulation / 100.0 * REGULATION_WEIGHT;

    GovernmentMetrics {
        goal_achievement_rate,
        policy_effectiveness,
        resource_utilization: government.resource_utilization,
        financial_efficiency: government.financial_resources / 100.0,
        transparency_level: government.information_transparency / 100.0,
    }
}

fn overall_status(
    residents: &ResidentMetrics,
    enterprises: &EnterpriseMetrics,
    government: &GovernmentMetrics,
) -> OverallStatus {
    let role_scores = [
        residents.avg_satisfaction / 5.0,
        enterprises.avg_innovation_level / 100.0,
        government.goal_achievement_rate,
    ];

    OverallStatus {
        system_health: role_scores[0] * HEALTH_SATISFACTION
            + role_scores[1] * HEALTH_INNOVATION
            + role_scores[2] * HEALTH_GOALS,
        stakeholder_balance: 1.0 - std_dev(&role_scores).min(1.0),
        sustainability: government.resource_utilization * SUSTAIN_UTILIZATION
            + enterprises.avg_compliance_rate / 100.0 * SUSTAIN_COMPLIANCE
            + residents.digital_adoption_rate * SUSTAIN_ADOPTION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn government() -> GovernmentSnapshot {
        GovernmentSnapshot {
            id: "government".to_string(),
            information_transparency: 70.0,
            platform_regulation: 90.0,
            financial_resources: 100.0,
            technical_capability: 80.0,
            governance_preference: "fairness".to_string(),
            policy_toolkit: vec!["regulation".into(), "subsidy".into()],
            resource_utilization: 0.7,
        }
    }

    #[test]
    fn test_hhi_equal_shares() {
        for n in 1..=10 {
            let shares = vec![0.1; n];
            assert!((herfindahl_index(&shares) - 1.0 / n as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn test_hhi_single_actor() {
        assert_eq!(herfindahl_index(&[1.0]), 1.0);
        assert_eq!(herfindahl_index(&[0.0, 0.7, 0.0]), 1.0);
        assert_eq!(herfindahl_index(&[]), 0.0);
        assert_eq!(herfindahl_index(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_government_composites() {
        let metrics = government_metrics(&government());
        assert!((metrics.goal_achievement_rate - 0.72).abs() < 1e-12);
        let expected = 0.4 * 0.3 + 0.7 * 0.3 + 0.9 * 0.4;
        assert!((metrics.policy_effectiveness - expected).abs() < 1e-12);
        assert_eq!(metrics.financial_efficiency, 1.0);
    }

    #[test]
    fn test_degenerate_population() {
        let agents = AgentsSnapshot {
            government: Some(government()),
            enterprises: Vec::new(),
            residents: Vec::new(),
        };
        let status = calculate_agent_status(&agents);
        assert_eq!(status.resident_metrics, ResidentMetrics::default());
        assert_eq!(status.enterprise_metrics, EnterpriseMetrics::default());
        assert!((status.overall_status.system_health - 0.72 * 0.4).abs() < 1e-12);
        assert!((status.overall_status.sustainability - 0.7 * 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_adoption_requires_access_and_usage() {
        let base = ResidentSnapshot {
            id: "resident_0".to_string(),
            area: gov_events::Area::CoreArea,
            information_literacy: 60.0,
            income_level: 5000.0,
            technology_acceptance: 70.0,
            trust_in_government: 50.0,
            satisfaction: 3.0,
            digital_access: true,
            service_usage_frequency: 5.0,
        };
        let no_access = ResidentSnapshot { digital_access: false, ..base.clone() };
        let low_usage = ResidentSnapshot { service_usage_frequency: 2.0, ..base.clone() };
        let metrics = resident_metrics(&[base, no_access, low_usage]);
        assert!((metrics.digital_adoption_rate - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(metrics.satisfaction_std, 0.0);
    }
}
