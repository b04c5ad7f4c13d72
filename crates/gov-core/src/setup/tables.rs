//! Built-in Tables
//!
//! Cities, interaction rules, and policies used when the config file does
//! not provide its own.

use std::collections::BTreeMap;

use gov_events::AreaLevels;
use serde::{Deserialize, Serialize};

use crate::components::{
    CityEnvironment, DataCollectionStrategy, GovernancePreference, TechnologyType,
};
use crate::interventions::{PolicyDefinition, PolicyTarget};
use crate::systems::{rule_pairs, InteractionRule, RuleBook, RuleTable};

use super::agents::{AgentTemplates, CityOverrides};

/// One city: its environment and its agent overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityConfig {
    pub environment: CityEnvironment,
    #[serde(default)]
    pub overrides: CityOverrides,
}

pub fn default_templates() -> AgentTemplates {
    AgentTemplates::default()
}

pub fn default_cities() -> BTreeMap<String, CityConfig> {
    let mut cities = BTreeMap::new();

    cities.insert(
        "beijing".to_string(),
        CityConfig {
            environment: CityEnvironment {
                digital_infrastructure: AreaLevels::new(95.0, 75.0, 55.0),
                physical_infrastructure: AreaLevels::new(90.0, 70.0, 50.0),
                policy_environment: BTreeMap::from([
                    ("regulation_style".to_string(), "strict".to_string()),
                    ("data_governance".to_string(), "centralized".to_string()),
                ]),
            },
            overrides: CityOverrides {
                governance_preference: Some(GovernancePreference::Fairness),
                platform_regulation: Some(95.0),
                technology_type: Some(TechnologyType::GovernmentProject),
                data_collection_strategy: Some(DataCollectionStrategy::Compliant),
                ..CityOverrides::default()
            },
        },
    );

    cities.insert(
        "shenzhen".to_string(),
        CityConfig {
            environment: CityEnvironment {
                digital_infrastructure: AreaLevels::new(98.0, 85.0, 65.0),
                physical_infrastructure: AreaLevels::new(85.0, 70.0, 50.0),
                policy_environment: BTreeMap::from([
                    ("regulation_style".to_string(), "flexible".to_string()),
                    ("data_governance".to_string(), "market_oriented".to_string()),
                ]),
            },
            overrides: CityOverrides {
                governance_preference: Some(GovernancePreference::Efficiency),
                information_transparency: Some(85.0),
                technology_type: Some(TechnologyType::MarketDriven),
                data_collection_strategy: Some(DataCollectionStrategy::Flexible),
                ..CityOverrides::default()
            },
        },
    );

    cities
}

pub fn default_rules() -> RuleBook {
    let table = |rules: Vec<(&str, InteractionRule)>| -> RuleTable {
        rules.into_iter().map(|(name, rule)| (name.to_string(), rule)).collect()
    };

    let mut book = RuleBook::new();
    book.insert(
        rule_pairs::GOVERNMENT_ENTERPRISE.to_string(),
        table(vec![
            ("procurement_cooperation", InteractionRule::new(0.7, "innovation_boost")),
            ("regulation", InteractionRule::new(0.9, "compliance_check")),
            ("data_sharing", InteractionRule::new(0.3, "information_flow")),
        ]),
    );
    book.insert(
        rule_pairs::GOVERNMENT_RESIDENT.to_string(),
        table(vec![
            ("service_provision", InteractionRule::new(0.8, "service_delivery")),
            ("demand_response", InteractionRule::new(0.7, "policy_feedback")),
            ("service_request", InteractionRule::new(0.85, "request_handling")),
            ("emergency_response", InteractionRule::new(0.8, "crisis_management")),
            ("policy_adjustment", InteractionRule::new(1.0, "policy_change").with_cost(10.0)),
        ]),
    );
    book.insert(
        rule_pairs::ENTERPRISE_RESIDENT.to_string(),
        table(vec![("service_supply", InteractionRule::new(0.8, "market_service"))]),
    );
    book
}

pub fn default_policies() -> BTreeMap<String, PolicyDefinition> {
    let mut policies = BTreeMap::new();

    policies.insert(
        "digital_literacy_training".to_string(),
        PolicyDefinition::new(PolicyTarget::Resident)
            .with_description("Digital skills courses for residents with low information literacy")
            .with_attribute("information_literacy", "+20")
            .with_attribute("technology_acceptance", "+15")
            .with_behavior("digital_service_usage", "+0.3"),
    );
    policies.insert(
        "inclusive_infrastructure".to_string(),
        PolicyDefinition::new(PolicyTarget::Environment)
            .with_description("Network and service point build-out outside the core area")
            .with_area_deltas("digital_infrastructure", &[("urban_rural_fringe", "+15"), ("rural", "+25")])
            .with_area_deltas("physical_infrastructure", &[("rural", "+10")]),
    );
    policies.insert(
        "data_open_sharing".to_string(),
        PolicyDefinition::new(PolicyTarget::GovernmentEnterprise)
            .with_description("Open public data to compliant enterprises")
            .with_rule("data_sharing", "probability", "+0.3"),
    );
    policies.insert(
        "algorithm_regulation".to_string(),
        PolicyDefinition::new(PolicyTarget::GovernmentEnterprise)
            .with_description("Audits of platform algorithms and data use")
            .with_rule("regulation", "probability", "+0.05"),
    );
    policies.insert(
        "transparency_reform".to_string(),
        PolicyDefinition::new(PolicyTarget::Government)
            .with_description("Publish decisions and service performance data")
            .with_attribute("information_transparency", "+10")
            .with_attribute("platform_regulation", "+5"),
    );
    policies.insert(
        "enterprise_compliance_incentive".to_string(),
        PolicyDefinition::new(PolicyTarget::Enterprise)
            .with_description("Procurement preference for enterprises with clean data records")
            .with_attribute("data_usage_compliance", "+5"),
    );

    policies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interventions::ChangeValue;

    #[test]
    fn test_default_cities() {
        let cities = default_cities();
        assert_eq!(cities.len(), 2);
        assert_eq!(cities["beijing"].overrides.platform_regulation, Some(95.0));
        assert_eq!(cities["shenzhen"].overrides.information_transparency, Some(85.0));
    }

    #[test]
    fn test_default_rules_cover_generators() {
        let rules = default_rules();
        for (pair, name) in [
            (rule_pairs::GOVERNMENT_ENTERPRISE, "regulation"),
            (rule_pairs::GOVERNMENT_RESIDENT, "service_request"),
            (rule_pairs::ENTERPRISE_RESIDENT, "service_supply"),
        ] {
            let rule = &rules[pair][name];
            assert!((0.0..=1.0).contains(&rule.probability));
        }
        assert!(rules[rule_pairs::GOVERNMENT_RESIDENT]["policy_adjustment"].cost.is_some());
    }

    #[test]
    fn test_default_policies_parse() {
        let policies = default_policies();
        assert_eq!(policies.len(), 6);
        for (name, policy) in &policies {
            for change in policy.attribute_change.values() {
                match change {
                    ChangeValue::Delta(d) => assert!(d.parse().is_some(), "{}", name),
                    ChangeValue::Table(t) => assert!(t.values().all(|d| d.parse().is_some()), "{}", name),
                }
            }
        }
        let infra = &policies["inclusive_infrastructure"];
        let ChangeValue::Table(digital) = &infra.attribute_change["digital_infrastructure"] else {
            panic!("expected per-area table");
        };
        assert!(!digital.contains_key("core_area"));
    }
}
