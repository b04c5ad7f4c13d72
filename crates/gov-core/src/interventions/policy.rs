//! Policy Definitions
//!
//! Declarative policy tables as loaded from config, and the modifiers they
//! install for later interaction resolution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The class of entity a policy acts on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PolicyTarget {
    Resident,
    Government,
    Enterprise,
    GovernmentEnterprise,
    Environment,
    /// Anything else; applying it changes nothing
    Unknown(String),
}

impl PolicyTarget {
    pub fn as_str(&self) -> &str {
        match self {
            PolicyTarget::Resident => "resident",
            PolicyTarget::Government => "government",
            PolicyTarget::Enterprise => "enterprise",
            PolicyTarget::GovernmentEnterprise => "government_enterprise",
            PolicyTarget::Environment => "environment",
            PolicyTarget::Unknown(s) => s,
        }
    }
}

impl From<String> for PolicyTarget {
    fn from(s: String) -> Self {
        match s.as_str() {
            "resident" => PolicyTarget::Resident,
            "government" => PolicyTarget::Government,
            "enterprise" => PolicyTarget::Enterprise,
            "government_enterprise" => PolicyTarget::GovernmentEnterprise,
            "environment" => PolicyTarget::Environment,
            _ => PolicyTarget::Unknown(s),
        }
    }
}

impl From<PolicyTarget> for String {
    fn from(target: PolicyTarget) -> Self {
        target.as_str().to_string()
    }
}

impl fmt::Display for PolicyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signed delta, either a bare number or a string like "+20" or "-0.3"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeltaSpec {
    Number(f64),
    Text(String),
}

impl DeltaSpec {
    /// The numeric delta, or `None` if it is not a finite number.
    pub fn parse(&self) -> Option<f64> {
        let value = match self {
            DeltaSpec::Number(n) => *n,
            DeltaSpec::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<&str> for DeltaSpec {
    fn from(s: &str) -> Self {
        DeltaSpec::Text(s.to_string())
    }
}

impl From<f64> for DeltaSpec {
    fn from(n: f64) -> Self {
        DeltaSpec::Number(n)
    }
}

/// An attribute change: one delta, or a per-key table of deltas
/// (used for per-area infrastructure changes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeValue {
    Delta(DeltaSpec),
    Table(BTreeMap<String, DeltaSpec>),
}

/// A named, one-time intervention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDefinition {
    pub target: PolicyTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attribute_change: BTreeMap<String, ChangeValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub behavior_change: BTreeMap<String, DeltaSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rule_change: BTreeMap<String, BTreeMap<String, DeltaSpec>>,
}

impl PolicyDefinition {
    pub fn new(target: PolicyTarget) -> Self {
        Self {
            target,
            description: None,
            attribute_change: BTreeMap::new(),
            behavior_change: BTreeMap::new(),
            rule_change: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_attribute(mut self, name: &str, delta: impl Into<DeltaSpec>) -> Self {
        self.attribute_change
            .insert(name.to_string(), ChangeValue::Delta(delta.into()));
        self
    }

    /// Per-area deltas for an infrastructure table.
    pub fn with_area_deltas(mut self, table: &str, deltas: &[(&str, &str)]) -> Self {
        let per_area = deltas
            .iter()
            .map(|(area, delta)| (area.to_string(), DeltaSpec::from(*delta)))
            .collect();
        self.attribute_change
            .insert(table.to_string(), ChangeValue::Table(per_area));
        self
    }

    pub fn with_behavior(mut self, name: &str, delta: impl Into<DeltaSpec>) -> Self {
        self.behavior_change.insert(name.to_string(), delta.into());
        self
    }

    pub fn with_rule(mut self, rule: &str, param: &str, delta: impl Into<DeltaSpec>) -> Self {
        self.rule_change
            .entry(rule.to_string())
            .or_default()
            .insert(param.to_string(), delta.into());
        self
    }
}

/// Modifiers installed by policies and consulted during interaction
/// resolution. Owned by the driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyModifiers {
    /// Rule name -> parameter -> delta
    #[serde(default)]
    pub rules: BTreeMap<String, BTreeMap<String, f64>>,
    /// Behavior name -> delta
    #[serde(default)]
    pub behaviors: BTreeMap<String, f64>,
}

impl PolicyModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rule(&mut self, rule: &str, param: &str, value: f64) {
        self.rules
            .entry(rule.to_string())
            .or_default()
            .insert(param.to_string(), value);
    }

    pub fn set_behavior(&mut self, name: &str, value: f64) {
        self.behaviors.insert(name.to_string(), value);
    }

    pub fn rule(&self, rule: &str, param: &str) -> f64 {
        self.rules
            .get(rule)
            .and_then(|params| params.get(param))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn behavior(&self, name: &str) -> f64 {
        self.behaviors.get(name).copied().unwrap_or(0.0)
    }

    /// Base rule probability shifted by any installed modifier, kept in [0, 1].
    pub fn adjusted_probability(&self, rule: &str, base: f64) -> f64 {
        (base + self.rule(rule, "probability")).clamp(0.0, 1.0)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.behaviors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_parsing() {
        assert_eq!(DeltaSpec::from("+20").parse(), Some(20.0));
        assert_eq!(DeltaSpec::from(" -10 ").parse(), Some(-10.0));
        assert_eq!(DeltaSpec::from("+0.3").parse(), Some(0.3));
        assert_eq!(DeltaSpec::Number(5.0).parse(), Some(5.0));
        assert_eq!(DeltaSpec::from("a lot").parse(), None);
        assert_eq!(DeltaSpec::from("NaN").parse(), None);
    }

    #[test]
    fn test_policy_from_toml() {
        let toml_str = r#"
            target = "environment"
            description = "Close the infrastructure gap"

            [attribute_change.digital_infrastructure]
            rural = "+25"
            urban_rural_fringe = 15
        "#;
        let policy: PolicyDefinition = toml::from_str(toml_str).unwrap();
        assert_eq!(policy.target, PolicyTarget::Environment);
        let ChangeValue::Table(per_area) = &policy.attribute_change["digital_infrastructure"] else {
            panic!("expected a per-area table");
        };
        assert_eq!(per_area["rural"].parse(), Some(25.0));
        assert_eq!(per_area["urban_rural_fringe"].parse(), Some(15.0));
    }

    #[test]
    fn test_unknown_target_is_preserved() {
        let policy: PolicyDefinition = toml::from_str(r#"target = "martians""#).unwrap();
        assert_eq!(policy.target, PolicyTarget::Unknown("martians".to_string()));
    }

    #[test]
    fn test_modifiers_clamp_probability() {
        let mut modifiers = PolicyModifiers::new();
        assert_eq!(modifiers.adjusted_probability("data_sharing", 0.3), 0.3);

        modifiers.set_rule("data_sharing", "probability", 0.9);
        assert_eq!(modifiers.adjusted_probability("data_sharing", 0.3), 1.0);

        modifiers.set_rule("regulation", "probability", -2.0);
        assert_eq!(modifiers.adjusted_probability("regulation", 0.9), 0.0);
        assert!(!modifiers.is_empty());
    }
}
