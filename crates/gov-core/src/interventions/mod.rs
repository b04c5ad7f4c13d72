//! Policy Intervention System
//!
//! Applies named, pre-declared policies to agents, to the environment, or to
//! the interaction rules. Tracking is idempotent (a policy is listed once in
//! `applied_policies`) but state is not: applying a policy twice applies its
//! deltas twice.

mod policy;

pub use policy::{ChangeValue, DeltaSpec, PolicyDefinition, PolicyModifiers, PolicyTarget};

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::components::{Agent, DataCollectionStrategy, Environment, Roster};
use crate::error::ConfigError;
use crate::metrics::MetricsReport;

/// Policies with engine-level special cases
pub mod policy_names {
    pub const DIGITAL_LITERACY_TRAINING: &str = "digital_literacy_training";
    pub const INCLUSIVE_INFRASTRUCTURE: &str = "inclusive_infrastructure";
    pub const DATA_OPEN_SHARING: &str = "data_open_sharing";
    pub const ALGORITHM_REGULATION: &str = "algorithm_regulation";
}

/// Constants for the special-cased policies
pub mod policy_constants {
    /// Digital literacy training only reaches residents below this literacy
    pub const LITERACY_TRAINING_THRESHOLD: f64 = 70.0;
    /// Sharing willingness set for compliant enterprises under open data sharing
    pub const OPEN_SHARING_WILLINGNESS: f64 = 0.8;
    /// Compliance raise under algorithm regulation
    pub const ALGORITHM_COMPLIANCE_RAISE: f64 = 5.0;

    /// Recommendation thresholds
    pub const DIGITAL_DIVIDE_THRESHOLD: f64 = 0.3;
    pub const ACCESS_GINI_THRESHOLD: f64 = 0.4;
    pub const RESOURCE_UTILIZATION_FLOOR: f64 = 0.6;
    pub const CONFLICT_RATE_THRESHOLD: f64 = 0.2;
}

use policy_constants::*;
use policy_names::*;

/// One application of a policy
#[derive(Debug, Clone, Serialize)]
pub struct PolicyApplication {
    pub policy_name: String,
    pub target: PolicyTarget,
    pub config: PolicyDefinition,
    /// Number of individual values changed or modifiers installed
    pub adjustments: usize,
}

/// Summary of everything applied so far
#[derive(Debug, Clone, Serialize)]
pub struct PolicyEffects {
    pub applied_policies: Vec<String>,
    pub policy_count: usize,
    pub policy_history: Vec<PolicyApplication>,
}

/// Dry-run estimate of what a policy would touch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImpactEstimate {
    Residents {
        affected_residents: usize,
        attribute_improvements: Vec<String>,
    },
    Government {
        attribute_improvements: Vec<String>,
    },
    Enterprises {
        affected_enterprises: usize,
        attribute_improvements: Vec<String>,
    },
    RuleChanges {
        interaction_rule_changes: Vec<String>,
    },
    Infrastructure {
        infrastructure_improvements: BTreeMap<String, ChangeValue>,
    },
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyImpact {
    pub policy_name: String,
    pub target: PolicyTarget,
    pub estimated_effects: ImpactEstimate,
}

/// Engine for applying policy interventions
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    policies: BTreeMap<String, PolicyDefinition>,
    applied_policies: Vec<String>,
    policy_history: Vec<PolicyApplication>,
}

impl PolicyEngine {
    pub fn new(policies: BTreeMap<String, PolicyDefinition>) -> Self {
        Self {
            policies,
            applied_policies: Vec::new(),
            policy_history: Vec::new(),
        }
    }

    pub fn policy(&self, name: &str) -> Option<&PolicyDefinition> {
        self.policies.get(name)
    }

    pub fn policy_names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    pub fn applied_policies(&self) -> &[String] {
        &self.applied_policies
    }

    pub fn policy_history(&self) -> &[PolicyApplication] {
        &self.policy_history
    }

    /// Apply each named policy once. Unknown names are skipped.
    ///
    /// Returns the number of policies that were found and applied.
    pub fn apply<S: AsRef<str>>(
        &mut self,
        names: &[S],
        roster: &mut Roster,
        environment: &mut Environment,
        modifiers: &mut PolicyModifiers,
    ) -> usize {
        let mut applied = 0;
        for name in names {
            let name = name.as_ref();
            let Some(policy) = self.policies.get(name).cloned() else {
                warn!(policy = name, "unknown policy intervention; skipped");
                continue;
            };

            let adjustments = apply_single(name, &policy, roster, environment, modifiers);
            self.policy_history.push(PolicyApplication {
                policy_name: name.to_string(),
                target: policy.target.clone(),
                config: policy,
                adjustments,
            });

            if !self.applied_policies.iter().any(|p| p == name) {
                self.applied_policies.push(name.to_string());
            }
            info!(policy = name, adjustments, "applied policy intervention");
            applied += 1;
        }
        applied
    }

    pub fn effects(&self) -> PolicyEffects {
        PolicyEffects {
            applied_policies: self.applied_policies.clone(),
            policy_count: self.applied_policies.len(),
            policy_history: self.policy_history.clone(),
        }
    }

    /// Estimate a policy's reach without applying it.
    pub fn simulate_policy_impact(&self, name: &str, roster: &Roster) -> Result<PolicyImpact, ConfigError> {
        let policy = self
            .policies
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPolicy(name.to_string()))?;
        let attributes: Vec<String> = policy.attribute_change.keys().cloned().collect();

        let estimated_effects = match &policy.target {
            PolicyTarget::Resident => ImpactEstimate::Residents {
                affected_residents: roster
                    .residents
                    .iter()
                    .filter(|r| name != DIGITAL_LITERACY_TRAINING || r.attributes.information_literacy < LITERACY_TRAINING_THRESHOLD)
                    .count(),
                attribute_improvements: attributes,
            },
            PolicyTarget::Government => ImpactEstimate::Government {
                attribute_improvements: attributes,
            },
            PolicyTarget::Enterprise => ImpactEstimate::Enterprises {
                affected_enterprises: roster.enterprises.len(),
                attribute_improvements: attributes,
            },
            PolicyTarget::GovernmentEnterprise => ImpactEstimate::RuleChanges {
                interaction_rule_changes: policy.rule_change.keys().cloned().collect(),
            },
            PolicyTarget::Environment => ImpactEstimate::Infrastructure {
                infrastructure_improvements: policy.attribute_change.clone(),
            },
            PolicyTarget::Unknown(_) => ImpactEstimate::Nothing,
        };

        Ok(PolicyImpact {
            policy_name: name.to_string(),
            target: policy.target.clone(),
            estimated_effects,
        })
    }

    /// Recommend policies from metric thresholds and explicit improvement
    /// targets, excluding policies already applied.
    pub fn recommend_policies(&self, metrics: &MetricsReport, targets: &[String]) -> Vec<String> {
        let wants = |t: &str| targets.iter().any(|x| x == t);
        let mut recommendations = Vec::new();

        if metrics.fairness.digital_divide_index > DIGITAL_DIVIDE_THRESHOLD || wants("digital_equity") {
            recommendations.push(DIGITAL_LITERACY_TRAINING);
        }
        if metrics.fairness.service_access_gini > ACCESS_GINI_THRESHOLD || wants("infrastructure") {
            recommendations.push(INCLUSIVE_INFRASTRUCTURE);
        }
        if metrics.efficiency.resource_utilization < RESOURCE_UTILIZATION_FLOOR || wants("efficiency") {
            recommendations.push(DATA_OPEN_SHARING);
        }
        if metrics.collaboration.conflict_rate > CONFLICT_RATE_THRESHOLD || wants("regulation") {
            recommendations.push(ALGORITHM_REGULATION);
        }

        recommendations
            .into_iter()
            .filter(|p| !self.applied_policies.iter().any(|a| a == p))
            .map(str::to_string)
            .collect()
    }
}

fn apply_single(
    name: &str,
    policy: &PolicyDefinition,
    roster: &mut Roster,
    environment: &mut Environment,
    modifiers: &mut PolicyModifiers,
) -> usize {
    match &policy.target {
        PolicyTarget::Resident => {
            let mut adjustments = 0;
            for resident in roster.residents.iter_mut() {
                if name == DIGITAL_LITERACY_TRAINING
                    && resident.attributes.information_literacy >= LITERACY_TRAINING_THRESHOLD
                {
                    continue;
                }
                adjustments += apply_attribute_changes(name, policy, resident);
            }
            adjustments + install_behaviors(name, policy, modifiers)
        }
        PolicyTarget::Government => apply_attribute_changes(name, policy, &mut roster.government),
        PolicyTarget::Enterprise => roster
            .enterprises
            .iter_mut()
            .map(|e| apply_attribute_changes(name, policy, e))
            .sum(),
        PolicyTarget::GovernmentEnterprise => {
            let mut adjustments = install_rules(name, policy, modifiers);
            if name == DATA_OPEN_SHARING {
                for enterprise in roster.enterprises.iter_mut() {
                    if enterprise.attributes.data_collection_strategy == DataCollectionStrategy::Compliant {
                        enterprise.attributes.data_sharing_willingness = OPEN_SHARING_WILLINGNESS;
                        adjustments += 1;
                    }
                }
            } else if name == ALGORITHM_REGULATION {
                for enterprise in roster.enterprises.iter_mut() {
                    enterprise.adjust_attribute("data_usage_compliance", ALGORITHM_COMPLIANCE_RAISE);
                    adjustments += 1;
                }
            }
            adjustments
        }
        PolicyTarget::Environment => environment.apply_policy_intervention(name, policy),
        PolicyTarget::Unknown(target) => {
            warn!(policy = name, target = target.as_str(), "policy has an unknown target; nothing changed");
            0
        }
    }
}

fn apply_attribute_changes(name: &str, policy: &PolicyDefinition, agent: &mut impl Agent) -> usize {
    let mut adjustments = 0;
    for (attribute, change) in &policy.attribute_change {
        let ChangeValue::Delta(spec) = change else {
            warn!(policy = name, attribute = attribute.as_str(), "table change on an agent attribute; skipped");
            continue;
        };
        let Some(delta) = spec.parse() else {
            warn!(policy = name, attribute = attribute.as_str(), "unparsable delta; skipped");
            continue;
        };
        match agent.adjust_attribute(attribute, delta) {
            Some((old, new)) => {
                debug!(agent = agent.id(), attribute = attribute.as_str(), old, new, "attribute updated");
                adjustments += 1;
            }
            None => debug!(agent = agent.id(), attribute = attribute.as_str(), "no such attribute"),
        }
    }
    adjustments
}

fn install_behaviors(name: &str, policy: &PolicyDefinition, modifiers: &mut PolicyModifiers) -> usize {
    let mut installed = 0;
    for (behavior, spec) in &policy.behavior_change {
        match spec.parse() {
            Some(value) => {
                modifiers.set_behavior(behavior, value);
                installed += 1;
            }
            None => warn!(policy = name, behavior = behavior.as_str(), "unparsable behavior delta; skipped"),
        }
    }
    installed
}

fn install_rules(name: &str, policy: &PolicyDefinition, modifiers: &mut PolicyModifiers) -> usize {
    let mut installed = 0;
    for (rule, params) in &policy.rule_change {
        for (param, spec) in params {
            match spec.parse() {
                Some(value) => {
                    modifiers.set_rule(rule, param, value);
                    debug!(rule = rule.as_str(), param = param.as_str(), value, "modified rule");
                    installed += 1;
                }
                None => warn!(policy = name, rule = rule.as_str(), "unparsable rule delta; skipped"),
            }
        }
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        CityEnvironment, Enterprise, EnterpriseAttributes, EnterpriseState, Government,
        GovernmentAttributes, GovernmentState, Resident, ResidentAttributes, ResidentState,
    };
    use crate::setup::default_policies;
    use gov_events::{Area, AreaLevels};

    fn roster(literacies: &[f64]) -> Roster {
        let residents = literacies
            .iter()
            .enumerate()
            .map(|(i, &lit)| {
                let attributes = ResidentAttributes {
                    information_literacy: lit,
                    ..ResidentAttributes::default()
                };
                Resident::new(i, Area::Rural, attributes, ResidentState::default())
            })
            .collect();
        let mut flexible = EnterpriseAttributes::default();
        flexible.data_collection_strategy = DataCollectionStrategy::Flexible;
        Roster {
            government: Government::new(GovernmentAttributes::default(), GovernmentState::default()),
            enterprises: vec![
                Enterprise::new(0, EnterpriseAttributes::default(), EnterpriseState::default()),
                Enterprise::new(1, flexible, EnterpriseState::default()),
            ],
            residents,
        }
    }

    fn environment() -> Environment {
        Environment::new(&CityEnvironment {
            digital_infrastructure: AreaLevels::new(90.0, 70.0, 50.0),
            physical_infrastructure: AreaLevels::new(85.0, 65.0, 45.0),
            policy_environment: BTreeMap::new(),
        })
    }

    fn literacy_delta() -> f64 {
        let policies = default_policies();
        let ChangeValue::Delta(spec) = &policies[DIGITAL_LITERACY_TRAINING].attribute_change["information_literacy"] else {
            panic!("literacy training should carry a scalar delta");
        };
        spec.parse().unwrap()
    }

    #[test]
    fn test_literacy_training_compounds() {
        let mut engine = PolicyEngine::new(default_policies());
        let mut roster = roster(&[10.0, 25.0]);
        let mut env = environment();
        let mut modifiers = PolicyModifiers::new();
        let delta = literacy_delta();

        engine.apply(&[DIGITAL_LITERACY_TRAINING], &mut roster, &mut env, &mut modifiers);
        let once: Vec<f64> = roster.residents.iter().map(|r| r.attributes.information_literacy).collect();
        engine.apply(&[DIGITAL_LITERACY_TRAINING], &mut roster, &mut env, &mut modifiers);
        let twice: Vec<f64> = roster.residents.iter().map(|r| r.attributes.information_literacy).collect();

        assert_eq!(once, vec![10.0 + delta, 25.0 + delta]);
        assert_eq!(twice, vec![10.0 + 2.0 * delta, 25.0 + 2.0 * delta]);

        // Tracked once, applied twice
        assert_eq!(engine.applied_policies(), &[DIGITAL_LITERACY_TRAINING.to_string()]);
        assert_eq!(engine.policy_history().len(), 2);
        assert_eq!(engine.effects().policy_count, 1);
    }

    #[test]
    fn test_literacy_training_skips_literate_residents() {
        let mut engine = PolicyEngine::new(default_policies());
        let mut roster = roster(&[69.0, 70.0, 95.0]);
        let mut env = environment();
        let mut modifiers = PolicyModifiers::new();

        engine.apply(&[DIGITAL_LITERACY_TRAINING], &mut roster, &mut env, &mut modifiers);
        assert_eq!(roster.residents[0].attributes.information_literacy, (69.0 + literacy_delta()).min(100.0));
        assert_eq!(roster.residents[1].attributes.information_literacy, 70.0);
        assert_eq!(roster.residents[2].attributes.information_literacy, 95.0);
        assert!(modifiers.behavior("digital_service_usage") > 0.0);
    }

    #[test]
    fn test_open_sharing_only_compliant_enterprises() {
        let mut engine = PolicyEngine::new(default_policies());
        let mut roster = roster(&[]);
        let mut env = environment();
        let mut modifiers = PolicyModifiers::new();

        engine.apply(&[DATA_OPEN_SHARING], &mut roster, &mut env, &mut modifiers);
        assert_eq!(roster.enterprises[0].attributes.data_sharing_willingness, OPEN_SHARING_WILLINGNESS);
        assert_eq!(roster.enterprises[1].attributes.data_sharing_willingness, 0.5);
        assert!(modifiers.rule("data_sharing", "probability") > 0.0);
    }

    #[test]
    fn test_algorithm_regulation_clamps_compliance() {
        let mut engine = PolicyEngine::new(default_policies());
        let mut roster = roster(&[]);
        roster.enterprises[0].attributes.data_usage_compliance = 98.0;
        let mut env = environment();
        let mut modifiers = PolicyModifiers::new();

        engine.apply(&[ALGORITHM_REGULATION], &mut roster, &mut env, &mut modifiers);
        assert_eq!(roster.enterprises[0].attributes.data_usage_compliance, 100.0);
        assert_eq!(roster.enterprises[1].attributes.data_usage_compliance, 95.0);
    }

    #[test]
    fn test_environment_policy_delegates() {
        let mut engine = PolicyEngine::new(default_policies());
        let mut roster = roster(&[]);
        let mut env = environment();
        let before = env.digital_infrastructure.rural;
        let mut modifiers = PolicyModifiers::new();

        engine.apply(&[INCLUSIVE_INFRASTRUCTURE], &mut roster, &mut env, &mut modifiers);
        assert!(env.digital_infrastructure.rural > before);
        assert_eq!(env.digital_infrastructure.core_area, 90.0);
    }

    #[test]
    fn test_unknown_and_malformed_policies_are_skipped() {
        let mut policies = default_policies();
        policies.insert(
            "broken".to_string(),
            PolicyDefinition::new(PolicyTarget::Government)
                .with_attribute("information_transparency", "very much")
                .with_attribute("platform_regulation", "+3"),
        );
        let mut engine = PolicyEngine::new(policies);
        let mut roster = roster(&[]);
        let mut env = environment();
        let mut modifiers = PolicyModifiers::new();

        let applied = engine.apply(&["no_such_policy", "broken"], &mut roster, &mut env, &mut modifiers);
        assert_eq!(applied, 1);
        assert_eq!(roster.government.attributes.information_transparency, 70.0);
        assert_eq!(roster.government.attributes.platform_regulation, 93.0);
        assert_eq!(engine.policy_history()[0].adjustments, 1);
    }

    #[test]
    fn test_simulate_impact_does_not_mutate() {
        let engine = PolicyEngine::new(default_policies());
        let roster = roster(&[40.0, 80.0]);
        let impact = engine.simulate_policy_impact(DIGITAL_LITERACY_TRAINING, &roster).unwrap();
        match impact.estimated_effects {
            ImpactEstimate::Residents { affected_residents, .. } => assert_eq!(affected_residents, 1),
            other => panic!("unexpected estimate {:?}", other),
        }
        assert_eq!(roster.residents[0].attributes.information_literacy, 40.0);
        assert!(engine.simulate_policy_impact("nope", &roster).is_err());
    }

    #[test]
    fn test_recommendations_skip_applied() {
        let mut engine = PolicyEngine::new(default_policies());
        let mut metrics = MetricsReport::default();
        metrics.fairness.digital_divide_index = 0.5;
        metrics.efficiency.resource_utilization = 0.9;

        let recs = engine.recommend_policies(&metrics, &["regulation".to_string()]);
        assert_eq!(recs, vec![DIGITAL_LITERACY_TRAINING.to_string(), ALGORITHM_REGULATION.to_string()]);

        let mut roster = roster(&[30.0]);
        let mut env = environment();
        let mut modifiers = PolicyModifiers::new();
        engine.apply(&[DIGITAL_LITERACY_TRAINING], &mut roster, &mut env, &mut modifiers);
        let recs = engine.recommend_policies(&metrics, &[]);
        assert!(recs.is_empty());
    }
}
