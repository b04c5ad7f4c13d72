//! Collaboration Metrics
//!
//! Sharing frequency, joint action, conflict, cooperation, trust-network
//! density and per-role engagement over the whole round history.

use std::collections::{BTreeSet, HashSet};

use gov_events::{AgentKind, Interaction, RoundRecord};
use serde::{Deserialize, Serialize};

use super::mean;

/// Score given to a round with no interactions
pub const NEUTRAL_ROUND_SCORE: f64 = 0.5;
/// Bonus for cooperative interaction types
pub const COOPERATIVE_BONUS: f64 = 0.2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StakeholderEngagement {
    pub government_engagement: f64,
    pub enterprise_engagement: f64,
    pub resident_engagement: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollaborationMetrics {
    /// Information sharing events per round
    pub cross_department_sharing_frequency: f64,
    pub joint_action_rate: f64,
    pub conflict_rate: f64,
    pub cooperation_index: f64,
    pub trust_network_density: f64,
    pub stakeholder_engagement: StakeholderEngagement,
}

pub fn calculate_collaboration(records: &[RoundRecord]) -> CollaborationMetrics {
    if records.is_empty() {
        return CollaborationMetrics::default();
    }
    let interactions: Vec<&Interaction> = records.iter().flat_map(|r| r.interactions.iter()).collect();

    CollaborationMetrics {
        cross_department_sharing_frequency: sharing_frequency(records),
        joint_action_rate: fraction(&interactions, |i| i.participants.len() > 1 && i.interaction_type.is_joint_action()),
        conflict_rate: fraction(&interactions, |i| i.outcome.is_conflict() || i.is_compliance_failure()),
        cooperation_index: cooperation_index(records),
        trust_network_density: trust_network_density(&interactions),
        stakeholder_engagement: stakeholder_engagement(records),
    }
}

fn sharing_frequency(records: &[RoundRecord]) -> f64 {
    let events = records
        .iter()
        .flat_map(|r| r.interactions.iter())
        .filter(|i| i.interaction_type.is_information_sharing())
        .count();
    events as f64 / records.len() as f64
}

/// Fraction of interactions matching `pred`. Each interaction counts once.
fn fraction(interactions: &[&Interaction], pred: impl Fn(&Interaction) -> bool) -> f64 {
    if interactions.is_empty() {
        return 0.0;
    }
    let hits = interactions.iter().filter(|i| pred(i)).count();
    hits as f64 / interactions.len() as f64
}

fn interaction_score(interaction: &Interaction) -> f64 {
    let base = interaction.outcome.cooperation_score();
    if interaction.interaction_type.is_cooperative() {
        (base + COOPERATIVE_BONUS).min(1.0)
    } else {
        base
    }
}

/// Mean over rounds of the mean interaction score in each round.
fn cooperation_index(records: &[RoundRecord]) -> f64 {
    let round_scores: Vec<f64> = records
        .iter()
        .map(|r| {
            if r.interactions.is_empty() {
                NEUTRAL_ROUND_SCORE
            } else {
                mean(&r.interactions.iter().map(interaction_score).collect::<Vec<_>>())
            }
        })
        .collect();
    mean(&round_scores)
}

fn trust_network_density(interactions: &[&Interaction]) -> f64 {
    let mut agents: HashSet<&str> = HashSet::new();
    let mut edges: BTreeSet<(&str, &str)> = BTreeSet::new();

    for interaction in interactions {
        agents.extend(interaction.participants.iter().map(String::as_str));
        if let [a, b] = interaction.participants.as_slice() {
            if interaction.outcome.is_positive() {
                edges.insert((a.as_str(), b.as_str()));
                edges.insert((b.as_str(), a.as_str()));
            }
        }
    }

    let n = agents.len();
    if n < 2 {
        return 0.0;
    }
    edges.len() as f64 / (n * (n - 1)) as f64
}

/// Role of a participant id, read from the prefix before the first `_`.
fn participant_kind(id: &str) -> Option<AgentKind> {
    match id.split('_').next()? {
        "government" => Some(AgentKind::Government),
        "enterprise" => Some(AgentKind::Enterprise),
        "resident" => Some(AgentKind::Resident),
        _ => None,
    }
}

fn stakeholder_engagement(records: &[RoundRecord]) -> StakeholderEngagement {
    let mut government = Vec::with_capacity(records.len());
    let mut enterprise = Vec::with_capacity(records.len());
    let mut resident = Vec::with_capacity(records.len());

    for record in records {
        let total = record.interactions.len();
        let (mut g, mut e, mut r) = (0usize, 0usize, 0usize);
        for id in record.interactions.iter().flat_map(|i| i.participants.iter()) {
            match participant_kind(id) {
                Some(AgentKind::Government) => g += 1,
                Some(AgentKind::Enterprise) => e += 1,
                Some(AgentKind::Resident) => r += 1,
                None => {}
            }
        }
        let rate = |count: usize| if total == 0 { 0.0 } else { count as f64 / total as f64 };
        government.push(rate(g));
        enterprise.push(rate(e));
        resident.push(rate(r));
    }

    StakeholderEngagement {
        government_engagement: mean(&government),
        enterprise_engagement: mean(&enterprise),
        resident_engagement: mean(&resident),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gov_events::{
        AgentsSnapshot, AreaLevels, DecisionSample, EnvironmentSnapshot, InteractionType, Outcome,
        Utilization,
    };

    fn record(round: u32, interactions: Vec<Interaction>) -> RoundRecord {
        RoundRecord {
            round,
            interactions,
            environment: EnvironmentSnapshot {
                digital_infrastructure: AreaLevels::new(90.0, 70.0, 50.0),
                physical_infrastructure: AreaLevels::new(85.0, 65.0, 45.0),
                service_availability: 1.0,
                system_load: 0.5,
                emergency_status: false,
                service_quality: AreaLevels::new(0.9, 0.7, 0.6),
                infrastructure_utilization: Utilization::default(),
                update_count: 1,
            },
            agents: AgentsSnapshot::default(),
            decisions_sample: DecisionSample::default(),
        }
    }

    #[test]
    fn test_empty_records() {
        assert_eq!(calculate_collaboration(&[]), CollaborationMetrics::default());
    }

    #[test]
    fn test_quiet_rounds_are_neutral() {
        let records = vec![record(0, Vec::new()), record(1, Vec::new())];
        let metrics = calculate_collaboration(&records);
        assert_eq!(metrics.cooperation_index, NEUTRAL_ROUND_SCORE);
        assert_eq!(metrics.joint_action_rate, 0.0);
        assert_eq!(metrics.trust_network_density, 0.0);
        assert_eq!(metrics.stakeholder_engagement, StakeholderEngagement::default());
    }

    #[test]
    fn test_sharing_frequency_per_round() {
        let share = Interaction::between(InteractionType::DataSharing, "government", "enterprise_0", Outcome::Success);
        let gossip = Interaction::between(InteractionType::InformationSharing, "resident_0", "resident_1", Outcome::Success);
        let records = vec![record(0, vec![share, gossip]), record(1, Vec::new())];
        assert_eq!(calculate_collaboration(&records).cross_department_sharing_frequency, 1.0);
    }

    #[test]
    fn test_conflict_counted_once_per_interaction() {
        let both = Interaction::between(InteractionType::Regulation, "government", "enterprise_0", Outcome::Conflict)
            .with_compliance(false);
        let fine = Interaction::between(InteractionType::Regulation, "government", "enterprise_1", Outcome::Success)
            .with_compliance(true);
        let metrics = calculate_collaboration(&[record(0, vec![both, fine])]);
        assert_eq!(metrics.conflict_rate, 0.5);
    }

    #[test]
    fn test_joint_action_needs_multiple_participants() {
        let joint = Interaction::between(InteractionType::Partnership, "government", "enterprise_0", Outcome::Success);
        let solo = Interaction::new(InteractionType::JointProject, vec!["enterprise_0".into()], Outcome::Success);
        let metrics = calculate_collaboration(&[record(0, vec![joint, solo])]);
        assert_eq!(metrics.joint_action_rate, 0.5);
    }

    #[test]
    fn test_cooperation_bonus_is_capped() {
        let shared = Interaction::between(InteractionType::DataSharing, "government", "enterprise_0", Outcome::Success);
        let failed = Interaction::between(InteractionType::DataSharing, "government", "enterprise_0", Outcome::Failed);
        assert_eq!(interaction_score(&shared), 1.0);
        assert!((interaction_score(&failed) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_trust_density() {
        // Three agents, one positive pair -> 2 of 6 directed edges
        let positive = Interaction::between(InteractionType::ServiceProvision, "government", "resident_0", Outcome::Success);
        let negative = Interaction::between(InteractionType::DemandResponse, "resident_1", "government", Outcome::Ignored);
        let repeat = positive.clone();
        let metrics = calculate_collaboration(&[record(0, vec![positive, negative, repeat])]);
        assert!((metrics.trust_network_density - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_engagement_by_prefix() {
        let a = Interaction::between(InteractionType::ServiceRequest, "resident_0", "government", Outcome::Success);
        let b = Interaction::new(InteractionType::ServiceUse, vec!["resident_1".into()], Outcome::Failed);
        let metrics = calculate_collaboration(&[record(0, vec![a, b]), record(1, Vec::new())]);
        let engagement = metrics.stakeholder_engagement;
        assert_eq!(engagement.resident_engagement, 0.5);
        assert_eq!(engagement.government_engagement, 0.25);
        assert_eq!(engagement.enterprise_engagement, 0.0);
    }
}
