//! Interaction Generation
//!
//! Turns one round of decisions into interaction records. Each generator
//! looks up its rule, adjusts the rule probability with the active policy
//! modifiers, and draws an outcome from the shared RNG. A missing rule or a
//! decision that does not apply produces nothing.

use std::collections::BTreeMap;

use gov_events::{
    AgentKind, Area, Decision, Interaction, InteractionStatus, InteractionType, Outcome,
    ServiceType,
};
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::components::{Enterprise, Environment, Government, Resident, Roster};
use crate::interventions::PolicyModifiers;

use super::folding::fold_outcomes;

/// Rule table names, one per agent pair
pub mod rule_pairs {
    pub const GOVERNMENT_ENTERPRISE: &str = "government_enterprise";
    pub const GOVERNMENT_RESIDENT: &str = "government_resident";
    pub const ENTERPRISE_RESIDENT: &str = "enterprise_resident";
}

/// Sampling sizes and fixed factors
pub mod interaction_constants {
    /// Residents reached by one round of government service provision
    pub const MAX_SERVICE_RECIPIENTS: usize = 20;
    /// Range of residents an enterprise service push reaches
    pub const MIN_SERVICE_REACH: usize = 5;
    pub const MAX_SERVICE_REACH: usize = 15;
    /// Resident pairs considered for information sharing
    pub const MAX_SHARING_ATTEMPTS: usize = 10;
    pub const SAME_AREA_SHARING: f64 = 0.3;
    pub const CROSS_AREA_SHARING: f64 = 0.1;
    /// Chance a government service is delivered digitally
    pub const DIGITAL_DELIVERY: f64 = 0.7;
    /// Random component of service request response time
    pub const RESPONSE_JITTER: f64 = 0.5;
}

use interaction_constants::*;
use rule_pairs::*;

/// Base parameters for one interaction type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRule {
    pub probability: f64,
    #[serde(default)]
    pub effect: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

impl InteractionRule {
    pub fn new(probability: f64, effect: impl Into<String>) -> Self {
        Self {
            probability,
            effect: effect.into(),
            cost: None,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }
}

/// Rules for one agent pair, keyed by interaction type name
pub type RuleTable = BTreeMap<String, InteractionRule>;
/// All rule tables, keyed by agent pair
pub type RuleBook = BTreeMap<String, RuleTable>;

/// Every agent's decision for one round, in roster order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundDecisions {
    pub government: Decision,
    pub enterprises: Vec<Decision>,
    pub residents: Vec<Decision>,
}

/// Resolves decisions into interactions and keeps an audit trail
#[derive(Debug, Clone, Default)]
pub struct InteractionEngine {
    rules: RuleBook,
    history: Vec<Interaction>,
}

impl InteractionEngine {
    pub fn new(rules: RuleBook) -> Self {
        Self {
            rules,
            history: Vec::new(),
        }
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    /// Every interaction generated so far, in order
    pub fn history(&self) -> &[Interaction] {
        &self.history
    }

    fn rule(&self, pair: &str, name: &str) -> Option<&InteractionRule> {
        self.rules.get(pair)?.get(name)
    }

    /// Probability for a rule after policy modifiers, or `None` if the rule
    /// is not configured.
    fn probability(&self, pair: &str, name: &str, modifiers: &PolicyModifiers) -> Option<f64> {
        let rule = self.rule(pair, name)?;
        Some(modifiers.adjusted_probability(name, rule.probability))
    }

    fn effect(&self, pair: &str, name: &str) -> Option<String> {
        self.rule(pair, name)
            .map(|r| r.effect.clone())
            .filter(|e| !e.is_empty())
    }

    /// Generate this round's interactions, record them, and fold their
    /// outcomes into agent state.
    pub fn process<R: Rng>(
        &mut self,
        roster: &mut Roster,
        decisions: &RoundDecisions,
        environment: &Environment,
        modifiers: &PolicyModifiers,
        rng: &mut R,
    ) -> Vec<Interaction> {
        let mut interactions = Vec::new();
        self.government_enterprise(roster, decisions, modifiers, rng, &mut interactions);
        self.government_resident(roster, decisions, environment, modifiers, rng, &mut interactions);
        self.enterprise_resident(roster, decisions, modifiers, rng, &mut interactions);
        resident_resident(&roster.residents, rng, &mut interactions);

        debug!(count = interactions.len(), "generated interactions");
        self.history.extend(interactions.iter().cloned());
        fold_outcomes(roster, &interactions);
        interactions
    }

    fn government_enterprise<R: Rng>(
        &self,
        roster: &Roster,
        decisions: &RoundDecisions,
        modifiers: &PolicyModifiers,
        rng: &mut R,
        out: &mut Vec<Interaction>,
    ) {
        let government = &roster.government;
        if decisions.government.targets(AgentKind::Enterprise) {
            for enterprise in &roster.enterprises {
                if let Some(interaction) =
                    self.government_to_enterprise(government, enterprise, &decisions.government, modifiers, rng)
                {
                    out.push(interaction);
                }
            }
        }

        for (enterprise, decision) in roster.enterprises.iter().zip(&decisions.enterprises) {
            if !decision.targets(AgentKind::Government) {
                continue;
            }
            if let Some(interaction) = self.enterprise_to_government(enterprise, decision, modifiers, rng) {
                out.push(interaction);
            }
        }
    }

    fn government_to_enterprise<R: Rng>(
        &self,
        government: &Government,
        enterprise: &Enterprise,
        decision: &Decision,
        modifiers: &PolicyModifiers,
        rng: &mut R,
    ) -> Option<Interaction> {
        let name = decision.action.as_str();
        let base = self.probability(GOVERNMENT_ENTERPRISE, name, modifiers)?;
        let effect = self.effect(GOVERNMENT_ENTERPRISE, name);

        let interaction = match name {
            "procurement_cooperation" => {
                let p = base * enterprise.state.innovation_level / 100.0;
                let outcome = Outcome::from_bool(rng.gen::<f64>() < p, Outcome::Failed);
                Interaction::between(InteractionType::ProcurementCooperation, &government.id, &enterprise.id, outcome)
                    .with_service_type(ServiceType::Digital)
            }
            "regulation" => {
                let p = base * enterprise.attributes.data_usage_compliance / 100.0;
                let compliant = rng.gen::<f64>() < p;
                Interaction::between(
                    InteractionType::Regulation,
                    &government.id,
                    &enterprise.id,
                    Outcome::from_bool(compliant, Outcome::Violation),
                )
                .with_compliance(compliant)
            }
            "data_sharing" => {
                let p = base * government.attributes.information_transparency / 100.0;
                let outcome = Outcome::from_bool(rng.gen::<f64>() < p, Outcome::Denied);
                Interaction::between(InteractionType::DataSharing, &government.id, &enterprise.id, outcome)
            }
            _ => return None,
        };
        Some(match effect {
            Some(effect) => interaction.with_effect(effect),
            None => interaction,
        })
    }

    fn enterprise_to_government<R: Rng>(
        &self,
        enterprise: &Enterprise,
        decision: &Decision,
        modifiers: &PolicyModifiers,
        rng: &mut R,
    ) -> Option<Interaction> {
        match decision.action.as_str() {
            "project_bidding" => {
                let p = (enterprise.state.innovation_level + enterprise.attributes.data_usage_compliance) / 200.0;
                let won = rng.gen::<f64>() < p;
                Some(
                    Interaction::between(
                        InteractionType::ProjectBidding,
                        &enterprise.id,
                        Government::ID,
                        Outcome::from_bool(won, Outcome::Failed),
                    )
                    .with_effect(if won { "contract_award" } else { "bid_rejected" }),
                )
            }
            "data_request" => {
                let base = self.probability(GOVERNMENT_ENTERPRISE, "data_sharing", modifiers)?;
                let p = base * enterprise.attributes.data_usage_compliance / 100.0;
                let approved = rng.gen::<f64>() < p;
                let outcome = if approved { Outcome::Approved } else { Outcome::Denied };
                Some(
                    Interaction::between(InteractionType::DataRequest, &enterprise.id, Government::ID, outcome)
                        .with_effect(if approved { "data_access" } else { "access_denied" }),
                )
            }
            _ => None,
        }
    }

    fn government_resident<R: Rng>(
        &self,
        roster: &Roster,
        decisions: &RoundDecisions,
        environment: &Environment,
        modifiers: &PolicyModifiers,
        rng: &mut R,
        out: &mut Vec<Interaction>,
    ) {
        let government = &roster.government;
        match decisions.government.action.as_str() {
            "service_provision" => self.service_provision(roster, modifiers, rng, out),
            "emergency_response" if environment.emergency_status => {
                if let Some(interaction) = self.emergency_response(government, environment, modifiers, rng) {
                    out.push(interaction);
                }
            }
            "policy_adjustment" => {
                if let Some(rule) = self.rule(GOVERNMENT_RESIDENT, "policy_adjustment") {
                    let cost = rule.cost.unwrap_or(0.0) * (1.0 + environment.system_load);
                    let mut interaction = Interaction::new(
                        InteractionType::PolicyImplementation,
                        vec![government.id.clone()],
                        Outcome::Success,
                    )
                    .with_cost(cost)
                    .with_status(InteractionStatus::Active);
                    if !rule.effect.is_empty() {
                        interaction = interaction.with_effect(rule.effect.clone());
                    }
                    out.push(interaction);
                }
            }
            _ => {}
        }

        for (resident, decision) in roster.residents.iter().zip(&decisions.residents) {
            let interaction = match decision.action.as_str() {
                "provide_feedback" if decision.targets(AgentKind::Government) => {
                    self.demand_response(government, resident, modifiers, rng)
                }
                "request_service" if decision.targets(AgentKind::Government) => {
                    self.service_request(resident, environment, modifiers, rng)
                }
                "use_service" => Some(service_use(resident, modifiers, rng)),
                _ => None,
            };
            if let Some(interaction) = interaction {
                out.push(interaction);
            }
        }
    }

    fn service_provision<R: Rng>(
        &self,
        roster: &Roster,
        modifiers: &PolicyModifiers,
        rng: &mut R,
        out: &mut Vec<Interaction>,
    ) {
        let Some(base) = self.probability(GOVERNMENT_RESIDENT, "service_provision", modifiers) else {
            return;
        };
        let effect = self.effect(GOVERNMENT_RESIDENT, "service_provision");
        let residents = &roster.residents;
        let reach = MAX_SERVICE_RECIPIENTS.min(residents.len());

        for i in index::sample(rng, residents.len(), reach).into_vec() {
            let resident = &residents[i];
            let p = base * area_service_factor(resident.area);
            let outcome = Outcome::from_bool(rng.gen::<f64>() < p, Outcome::Failed);
            let service_type = if rng.gen::<f64>() < DIGITAL_DELIVERY {
                ServiceType::Digital
            } else {
                ServiceType::Physical
            };
            let mut interaction =
                Interaction::between(InteractionType::ServiceProvision, Government::ID, &resident.id, outcome)
                    .with_area(resident.area)
                    .with_service_type(service_type);
            if let Some(effect) = &effect {
                interaction = interaction.with_effect(effect.clone());
            }
            out.push(interaction);
        }
    }

    fn emergency_response<R: Rng>(
        &self,
        government: &Government,
        environment: &Environment,
        modifiers: &PolicyModifiers,
        rng: &mut R,
    ) -> Option<Interaction> {
        let base = self.probability(GOVERNMENT_RESIDENT, "emergency_response", modifiers)?;
        let capability = government.attributes.technical_capability / 100.0;
        let outcome = Outcome::from_bool(rng.gen::<f64>() < base * capability, Outcome::Failed);
        let recovery_time = 10.0 * (1.0 - capability) + 2.0 * (1.0 - environment.service_availability);

        let mut interaction = Interaction::new(InteractionType::EmergencyResponse, vec![government.id.clone()], outcome)
            .with_response_time(1.0 + 2.0 * environment.system_load)
            .with_recovery_time(recovery_time);
        if let Some(effect) = self.effect(GOVERNMENT_RESIDENT, "emergency_response") {
            interaction = interaction.with_effect(effect);
        }
        Some(interaction)
    }

    fn demand_response<R: Rng>(
        &self,
        government: &Government,
        resident: &Resident,
        modifiers: &PolicyModifiers,
        rng: &mut R,
    ) -> Option<Interaction> {
        let base = self.probability(GOVERNMENT_RESIDENT, "demand_response", modifiers)?;
        let p = base * government.attributes.information_transparency / 100.0;
        let outcome = Outcome::from_bool(rng.gen::<f64>() < p, Outcome::Ignored);
        let mut interaction = Interaction::between(InteractionType::DemandResponse, &resident.id, Government::ID, outcome)
            .with_area(resident.area);
        if let Some(effect) = self.effect(GOVERNMENT_RESIDENT, "demand_response") {
            interaction = interaction.with_effect(effect);
        }
        Some(interaction)
    }

    fn service_request<R: Rng>(
        &self,
        resident: &Resident,
        environment: &Environment,
        modifiers: &PolicyModifiers,
        rng: &mut R,
    ) -> Option<Interaction> {
        let base = self.probability(GOVERNMENT_RESIDENT, "service_request", modifiers)?;
        let p = base * environment.service_quality.get(resident.area);
        let resolved = rng.gen::<f64>() < p;
        let response_time = 1.0 + 2.0 * environment.system_load + rng.gen_range(0.0..RESPONSE_JITTER);

        let mut interaction = Interaction::between(
            InteractionType::ServiceRequest,
            &resident.id,
            Government::ID,
            Outcome::from_bool(resolved, Outcome::Failed),
        )
        .with_area(resident.area)
        .with_service_type(ServiceType::Digital)
        .with_response_time(response_time)
        .with_resolved(resolved);
        if let Some(effect) = self.effect(GOVERNMENT_RESIDENT, "service_request") {
            interaction = interaction.with_effect(effect);
        }
        Some(interaction)
    }

    fn enterprise_resident<R: Rng>(
        &self,
        roster: &Roster,
        decisions: &RoundDecisions,
        modifiers: &PolicyModifiers,
        rng: &mut R,
        out: &mut Vec<Interaction>,
    ) {
        let Some(base) = self.probability(ENTERPRISE_RESIDENT, "service_supply", modifiers) else {
            return;
        };
        let effect = self.effect(ENTERPRISE_RESIDENT, "service_supply");
        let residents = &roster.residents;

        for (enterprise, decision) in roster.enterprises.iter().zip(&decisions.enterprises) {
            if !(decision.is_action("service_development") || decision.is_action("service_promotion")) {
                continue;
            }
            let reach = rng.gen_range(MIN_SERVICE_REACH..=MAX_SERVICE_REACH).min(residents.len());
            for i in index::sample(rng, residents.len(), reach).into_vec() {
                let resident = &residents[i];
                let p = base
                    * resident.attributes.technology_acceptance / 100.0
                    * enterprise.state.innovation_level / 100.0;
                let outcome = Outcome::from_bool(rng.gen::<f64>() < p, Outcome::Rejected);
                let mut interaction =
                    Interaction::between(InteractionType::ServiceSupply, &enterprise.id, &resident.id, outcome)
                        .with_area(resident.area);
                if let Some(effect) = &effect {
                    interaction = interaction.with_effect(effect.clone());
                }
                out.push(interaction);
            }
        }
    }
}

/// Service provision success factor by area.
fn area_service_factor(area: Area) -> f64 {
    match area {
        Area::CoreArea => 0.9,
        Area::UrbanRuralFringe => 0.7,
        Area::Rural => 0.5,
    }
}

/// A resident using a digital service on their own.
///
/// Requires digital access; the chance of success follows technology
/// acceptance plus any `digital_service_usage` behavior modifier.
fn service_use<R: Rng>(resident: &Resident, modifiers: &PolicyModifiers, rng: &mut R) -> Interaction {
    let p = (resident.attributes.technology_acceptance / 100.0 + modifiers.behavior("digital_service_usage"))
        .clamp(0.0, 1.0);
    let used = resident.state.digital_access && rng.gen::<f64>() < p;
    Interaction::new(
        InteractionType::ServiceUse,
        vec![resident.id.clone()],
        Outcome::from_bool(used, Outcome::Failed),
    )
    .with_area(resident.area)
    .with_service_type(ServiceType::Digital)
}

/// Information sharing between random resident pairs. Only successful
/// exchanges are recorded.
fn resident_resident<R: Rng>(residents: &[Resident], rng: &mut R, out: &mut Vec<Interaction>) {
    if residents.len() < 2 {
        return;
    }
    let attempts = MAX_SHARING_ATTEMPTS.min(residents.len() / 10);
    for _ in 0..attempts {
        let pair = index::sample(rng, residents.len(), 2);
        let (a, b) = (&residents[pair.index(0)], &residents[pair.index(1)]);
        let p = if a.area == b.area {
            SAME_AREA_SHARING
        } else {
            CROSS_AREA_SHARING
        };
        if rng.gen::<f64>() < p {
            out.push(
                Interaction::between(InteractionType::InformationSharing, &a.id, &b.id, Outcome::Success)
                    .with_effect("knowledge_transfer"),
            );
        }
    }
}
