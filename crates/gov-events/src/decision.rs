//! Decision Types
//!
//! What an agent chose to do in a round, and the sampled view of those
//! choices that goes into each round record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::area::AgentKind;

/// Number of enterprise decisions kept in a round sample
pub const SAMPLE_ENTERPRISES: usize = 5;
/// Number of resident decisions kept in a round sample
pub const SAMPLE_RESIDENTS: usize = 10;

/// A single agent decision.
///
/// `action` and `target` are required; any type-specific fields the
/// provider returns are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub target: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Decision {
    pub fn new(action: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            target: target.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// A decision is usable only when it names both an action and a target.
    pub fn is_well_formed(&self) -> bool {
        !self.action.trim().is_empty() && !self.target.trim().is_empty()
    }

    pub fn is_action(&self, action: &str) -> bool {
        self.action == action
    }

    /// True when the target names the given role (singular, plural, or short form).
    pub fn targets(&self, kind: AgentKind) -> bool {
        self.target
            .parse::<AgentKind>()
            .map(|k| k == kind)
            .unwrap_or(false)
    }
}

/// A decision as recorded for one agent in one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEntry {
    pub agent_id: String,
    pub kind: AgentKind,
    pub decision: Decision,
    pub is_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Sample of decisions recorded with each round
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionSample {
    #[serde(default)]
    pub government: Option<DecisionEntry>,
    #[serde(default)]
    pub enterprises: Vec<DecisionEntry>,
    #[serde(default)]
    pub residents: Vec<DecisionEntry>,
}

impl DecisionSample {
    /// Build a sample from the full decision lists.
    pub fn from_entries(
        government: Option<&DecisionEntry>,
        enterprises: &[DecisionEntry],
        residents: &[DecisionEntry],
    ) -> Self {
        Self {
            government: government.cloned(),
            enterprises: enterprises.iter().take(SAMPLE_ENTERPRISES).cloned().collect(),
            residents: residents.iter().take(SAMPLE_RESIDENTS).cloned().collect(),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &DecisionEntry> {
        self.government
            .iter()
            .chain(self.enterprises.iter())
            .chain(self.residents.iter())
    }
}
