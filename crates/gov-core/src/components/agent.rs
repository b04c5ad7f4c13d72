//! Agent Components
//!
//! Typed attributes and state for the three agent roles.
//!
//! Attributes are slow-changing capabilities (literacy, compliance,
//! transparency). State is the fast-changing part that interaction
//! outcomes fold into every round. Every numeric field has declared
//! bounds and every update goes through them.

use gov_events::{
    AgentKind, Area, Decision, EnterpriseSnapshot, GovernmentSnapshot, ResidentSnapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::environment::EnvironmentContext;

/// Closed numeric range a field is kept within
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Declared bounds for agent fields
pub mod bounds {
    use super::Bounds;

    /// Percent-style capabilities (literacy, compliance, transparency, trust)
    pub const PERCENT: Bounds = Bounds::new(0.0, 100.0);
    /// Resident satisfaction score
    pub const SATISFACTION: Bounds = Bounds::new(1.0, 5.0);
    /// Ratios (market share, willingness, resource utilization)
    pub const UNIT: Bounds = Bounds::new(0.0, 1.0);
    /// Service usage frequency
    pub const USAGE: Bounds = Bounds::new(0.0, 10.0);
    /// Monthly income
    pub const INCOME: Bounds = Bounds::new(0.0, 1_000_000.0);
}

/// What the government optimizes for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernancePreference {
    #[default]
    Fairness,
    Efficiency,
}

impl GovernancePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            GovernancePreference::Fairness => "fairness",
            GovernancePreference::Efficiency => "efficiency",
        }
    }
}

/// Where an enterprise's technology comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechnologyType {
    GovernmentProject,
    #[default]
    MarketDriven,
}

impl TechnologyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TechnologyType::GovernmentProject => "government_project",
            TechnologyType::MarketDriven => "market_driven",
        }
    }
}

/// How an enterprise collects user data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCollectionStrategy {
    #[default]
    Compliant,
    Flexible,
}

impl DataCollectionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataCollectionStrategy::Compliant => "compliant",
            DataCollectionStrategy::Flexible => "flexible",
        }
    }
}

/// Government capabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernmentAttributes {
    pub information_transparency: f64,
    pub platform_regulation: f64,
    pub financial_resources: f64,
    pub technical_capability: f64,
    pub governance_preference: GovernancePreference,
    pub policy_toolkit: Vec<String>,
}

impl Default for GovernmentAttributes {
    fn default() -> Self {
        Self {
            information_transparency: 70.0,
            platform_regulation: 90.0,
            financial_resources: 100.0,
            technical_capability: 80.0,
            governance_preference: GovernancePreference::Fairness,
            policy_toolkit: vec![
                "regulation".to_string(),
                "subsidy".to_string(),
                "procurement".to_string(),
                "data_governance".to_string(),
            ],
        }
    }
}

impl GovernmentAttributes {
    pub fn field_mut(&mut self, name: &str) -> Option<(&mut f64, Bounds)> {
        match name {
            "information_transparency" => Some((&mut self.information_transparency, bounds::PERCENT)),
            "platform_regulation" => Some((&mut self.platform_regulation, bounds::PERCENT)),
            "financial_resources" => Some((&mut self.financial_resources, bounds::PERCENT)),
            "technical_capability" => Some((&mut self.technical_capability, bounds::PERCENT)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernmentState {
    pub resource_utilization: f64,
}

impl Default for GovernmentState {
    fn default() -> Self {
        Self {
            resource_utilization: 0.7,
        }
    }
}

/// Enterprise capabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnterpriseAttributes {
    pub data_usage_compliance: f64,
    pub data_sharing_willingness: f64,
    pub technology_type: TechnologyType,
    pub data_collection_strategy: DataCollectionStrategy,
}

impl Default for EnterpriseAttributes {
    fn default() -> Self {
        Self {
            data_usage_compliance: 90.0,
            data_sharing_willingness: 0.5,
            technology_type: TechnologyType::MarketDriven,
            data_collection_strategy: DataCollectionStrategy::Compliant,
        }
    }
}

impl EnterpriseAttributes {
    pub fn field_mut(&mut self, name: &str) -> Option<(&mut f64, Bounds)> {
        match name {
            "data_usage_compliance" => Some((&mut self.data_usage_compliance, bounds::PERCENT)),
            "data_sharing_willingness" => Some((&mut self.data_sharing_willingness, bounds::UNIT)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnterpriseState {
    pub innovation_level: f64,
    pub market_share: f64,
}

impl Default for EnterpriseState {
    fn default() -> Self {
        Self {
            innovation_level: 50.0,
            market_share: 0.1,
        }
    }
}

/// Resident capabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResidentAttributes {
    pub information_literacy: f64,
    pub income_level: f64,
    pub technology_acceptance: f64,
    pub trust_in_government: f64,
}

impl Default for ResidentAttributes {
    fn default() -> Self {
        Self {
            information_literacy: 60.0,
            income_level: 5000.0,
            technology_acceptance: 70.0,
            trust_in_government: 50.0,
        }
    }
}

impl ResidentAttributes {
    pub fn field_mut(&mut self, name: &str) -> Option<(&mut f64, Bounds)> {
        match name {
            "information_literacy" => Some((&mut self.information_literacy, bounds::PERCENT)),
            "income_level" => Some((&mut self.income_level, bounds::INCOME)),
            "technology_acceptance" => Some((&mut self.technology_acceptance, bounds::PERCENT)),
            "trust_in_government" => Some((&mut self.trust_in_government, bounds::PERCENT)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResidentState {
    pub satisfaction: f64,
    pub digital_access: bool,
    pub service_usage_frequency: f64,
}

impl Default for ResidentState {
    fn default() -> Self {
        Self {
            satisfaction: 3.0,
            digital_access: true,
            service_usage_frequency: 5.0,
        }
    }
}

/// One entry in an agent's decision history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub round: u32,
    pub context: EnvironmentContext,
    pub decision: Decision,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Behavior shared by all agent roles
pub trait Agent {
    fn id(&self) -> &str;
    fn kind(&self) -> AgentKind;

    /// Typed attribute lookup by name, with the field's bounds.
    fn attribute_field(&mut self, name: &str) -> Option<(&mut f64, Bounds)>;

    fn extra_mut(&mut self) -> &mut BTreeMap<String, f64>;
    fn history(&self) -> &[HistoryEntry];
    fn history_mut(&mut self) -> &mut Vec<HistoryEntry>;

    /// Add `delta` to a named attribute and clamp it.
    ///
    /// Typed fields use their own bounds; existing `extra` entries are kept
    /// within 0-100. Returns `(old, new)`, or `None` if the agent has no such
    /// attribute.
    fn adjust_attribute(&mut self, name: &str, delta: f64) -> Option<(f64, f64)> {
        if let Some((value, bounds)) = self.attribute_field(name) {
            let old = *value;
            *value = bounds.clamp(old + delta);
            return Some((old, *value));
        }
        let value = self.extra_mut().get_mut(name)?;
        let old = *value;
        *value = bounds::PERCENT.clamp(old + delta);
        Some((old, *value))
    }

    fn record_decision(&mut self, entry: HistoryEntry) {
        self.history_mut().push(entry);
    }
}

/// The single government agent
#[derive(Debug, Clone, PartialEq)]
pub struct Government {
    pub id: String,
    pub attributes: GovernmentAttributes,
    pub state: GovernmentState,
    pub extra: BTreeMap<String, f64>,
    pub history: Vec<HistoryEntry>,
}

impl Government {
    pub const ID: &'static str = "government";

    pub fn new(attributes: GovernmentAttributes, state: GovernmentState) -> Self {
        Self {
            id: Self::ID.to_string(),
            attributes,
            state,
            extra: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> GovernmentSnapshot {
        GovernmentSnapshot {
            id: self.id.clone(),
            information_transparency: self.attributes.information_transparency,
            platform_regulation: self.attributes.platform_regulation,
            financial_resources: self.attributes.financial_resources,
            technical_capability: self.attributes.technical_capability,
            governance_preference: self.attributes.governance_preference.as_str().to_string(),
            policy_toolkit: self.attributes.policy_toolkit.clone(),
            resource_utilization: self.state.resource_utilization,
        }
    }
}

impl Agent for Government {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Government
    }

    fn attribute_field(&mut self, name: &str) -> Option<(&mut f64, Bounds)> {
        self.attributes.field_mut(name)
    }

    fn extra_mut(&mut self) -> &mut BTreeMap<String, f64> {
        &mut self.extra
    }

    fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    fn history_mut(&mut self) -> &mut Vec<HistoryEntry> {
        &mut self.history
    }
}

/// A platform or service enterprise
#[derive(Debug, Clone, PartialEq)]
pub struct Enterprise {
    pub id: String,
    pub attributes: EnterpriseAttributes,
    pub state: EnterpriseState,
    pub extra: BTreeMap<String, f64>,
    pub history: Vec<HistoryEntry>,
}

impl Enterprise {
    pub fn new(index: usize, attributes: EnterpriseAttributes, state: EnterpriseState) -> Self {
        Self {
            id: format!("enterprise_{}", index),
            attributes,
            state,
            extra: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> EnterpriseSnapshot {
        EnterpriseSnapshot {
            id: self.id.clone(),
            data_usage_compliance: self.attributes.data_usage_compliance,
            data_sharing_willingness: self.attributes.data_sharing_willingness,
            technology_type: self.attributes.technology_type.as_str().to_string(),
            data_collection_strategy: self.attributes.data_collection_strategy.as_str().to_string(),
            innovation_level: self.state.innovation_level,
            market_share: self.state.market_share,
        }
    }
}

impl Agent for Enterprise {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Enterprise
    }

    fn attribute_field(&mut self, name: &str) -> Option<(&mut f64, Bounds)> {
        self.attributes.field_mut(name)
    }

    fn extra_mut(&mut self) -> &mut BTreeMap<String, f64> {
        &mut self.extra
    }

    fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    fn history_mut(&mut self) -> &mut Vec<HistoryEntry> {
        &mut self.history
    }
}

/// A resident, fixed to one area for the whole run
#[derive(Debug, Clone, PartialEq)]
pub struct Resident {
    pub id: String,
    pub area: Area,
    pub attributes: ResidentAttributes,
    pub state: ResidentState,
    pub extra: BTreeMap<String, f64>,
    pub history: Vec<HistoryEntry>,
}

impl Resident {
    pub fn new(index: usize, area: Area, attributes: ResidentAttributes, state: ResidentState) -> Self {
        Self {
            id: format!("resident_{}", index),
            area,
            attributes,
            state,
            extra: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> ResidentSnapshot {
        ResidentSnapshot {
            id: self.id.clone(),
            area: self.area,
            information_literacy: self.attributes.information_literacy,
            income_level: self.attributes.income_level,
            technology_acceptance: self.attributes.technology_acceptance,
            trust_in_government: self.attributes.trust_in_government,
            satisfaction: self.state.satisfaction,
            digital_access: self.state.digital_access,
            service_usage_frequency: self.state.service_usage_frequency,
        }
    }
}

impl Agent for Resident {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Resident
    }

    fn attribute_field(&mut self, name: &str) -> Option<(&mut f64, Bounds)> {
        self.attributes.field_mut(name)
    }

    fn extra_mut(&mut self) -> &mut BTreeMap<String, f64> {
        &mut self.extra
    }

    fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    fn history_mut(&mut self) -> &mut Vec<HistoryEntry> {
        &mut self.history
    }
}

/// The full agent population, owned by the driver
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    pub government: Government,
    pub enterprises: Vec<Enterprise>,
    pub residents: Vec<Resident>,
}

impl Roster {
    pub fn agent_count(&self) -> usize {
        1 + self.enterprises.len() + self.residents.len()
    }

    pub fn snapshot(&self) -> gov_events::AgentsSnapshot {
        gov_events::AgentsSnapshot {
            government: Some(self.government.snapshot()),
            enterprises: self.enterprises.iter().map(Enterprise::snapshot).collect(),
            residents: self.residents.iter().map(Resident::snapshot).collect(),
        }
    }
}
