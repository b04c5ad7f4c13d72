//! Snapshot Types
//!
//! Serialization structs for end-of-round state.
//!
//! Snapshots capture the environment and every agent at the close of a round.
//! They are what the round logger persists and what the metrics read.

use serde::{Deserialize, Serialize};

use crate::area::{Area, AreaLevels};
use crate::decision::DecisionSample;
use crate::interaction::Interaction;

/// Share of interactions delivered through each channel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Utilization {
    pub digital: f64,
    pub physical: f64,
}

/// Environment state at the end of a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub digital_infrastructure: AreaLevels,
    pub physical_infrastructure: AreaLevels,
    pub service_availability: f64,
    pub system_load: f64,
    pub emergency_status: bool,
    pub service_quality: AreaLevels,
    pub infrastructure_utilization: Utilization,
    pub update_count: u64,
}

/// Government agent snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernmentSnapshot {
    pub id: String,
    pub information_transparency: f64,
    pub platform_regulation: f64,
    pub financial_resources: f64,
    pub technical_capability: f64,
    pub governance_preference: String,
    #[serde(default)]
    pub policy_toolkit: Vec<String>,
    pub resource_utilization: f64,
}

/// Enterprise agent snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnterpriseSnapshot {
    pub id: String,
    pub data_usage_compliance: f64,
    pub data_sharing_willingness: f64,
    pub technology_type: String,
    pub data_collection_strategy: String,
    pub innovation_level: f64,
    pub market_share: f64,
}

/// Resident agent snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentSnapshot {
    pub id: String,
    pub area: Area,
    pub information_literacy: f64,
    pub income_level: f64,
    pub technology_acceptance: f64,
    pub trust_in_government: f64,
    pub satisfaction: f64,
    pub digital_access: bool,
    pub service_usage_frequency: f64,
}

/// All agents at the end of a round
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentsSnapshot {
    #[serde(default)]
    pub government: Option<GovernmentSnapshot>,
    #[serde(default)]
    pub enterprises: Vec<EnterpriseSnapshot>,
    #[serde(default)]
    pub residents: Vec<ResidentSnapshot>,
}

/// One round of the simulation, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub interactions: Vec<Interaction>,
    pub environment: EnvironmentSnapshot,
    pub agents: AgentsSnapshot,
    pub decisions_sample: DecisionSample,
}

impl RoundRecord {
    /// Fraction of this round's interactions that succeeded, if any happened.
    pub fn success_rate(&self) -> Option<f64> {
        if self.interactions.is_empty() {
            return None;
        }
        let successes = self
            .interactions
            .iter()
            .filter(|i| i.outcome.is_success())
            .count();
        Some(successes as f64 / self.interactions.len() as f64)
    }
}
