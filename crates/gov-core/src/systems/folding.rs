//! Outcome Folding
//!
//! Applies each interaction's outcome to the state of every participant.
//! Deterministic: the same interactions in the same order always produce the
//! same state. All changes are clamped to the field bounds.

use std::collections::HashMap;

use gov_events::{Interaction, InteractionType, Outcome};

use crate::components::{bounds, Enterprise, Government, Resident, Roster};

/// Per-outcome state changes
pub mod folding_constants {
    pub const UTILIZATION_STEP: f64 = 0.01;
    pub const PROCUREMENT_INNOVATION_GAIN: f64 = 2.0;
    pub const SUPPLY_MARKET_SHARE_GAIN: f64 = 0.01;
    pub const SERVICE_SATISFACTION_GAIN: f64 = 0.1;
    pub const RESPONSE_TRUST_GAIN: f64 = 1.0;
    pub const SERVICE_USE_GAIN: f64 = 1.0;
    pub const FAILURE_SATISFACTION_LOSS: f64 = 0.05;
    pub const IGNORED_TRUST_LOSS: f64 = 2.0;
}

use folding_constants::*;

enum Slot {
    Enterprise(usize),
    Resident(usize),
}

/// Fold a round's interactions into the roster.
pub fn fold_outcomes(roster: &mut Roster, interactions: &[Interaction]) {
    let mut slots: HashMap<String, Slot> = HashMap::with_capacity(roster.agent_count());
    for (i, enterprise) in roster.enterprises.iter().enumerate() {
        slots.insert(enterprise.id.clone(), Slot::Enterprise(i));
    }
    for (i, resident) in roster.residents.iter().enumerate() {
        slots.insert(resident.id.clone(), Slot::Resident(i));
    }

    for interaction in interactions {
        for participant in &interaction.participants {
            if participant == &roster.government.id {
                fold_government(&mut roster.government, interaction);
                continue;
            }
            match slots.get(participant) {
                Some(Slot::Enterprise(i)) => fold_enterprise(&mut roster.enterprises[*i], interaction),
                Some(Slot::Resident(i)) => fold_resident(&mut roster.residents[*i], interaction),
                None => {}
            }
        }
    }
}

fn fold_government(government: &mut Government, interaction: &Interaction) {
    let delta = match interaction.outcome {
        Outcome::Success => UTILIZATION_STEP,
        Outcome::Failed | Outcome::Violation => -UTILIZATION_STEP,
        _ => return,
    };
    let utilization = &mut government.state.resource_utilization;
    *utilization = bounds::UNIT.clamp(*utilization + delta);
}

fn fold_enterprise(enterprise: &mut Enterprise, interaction: &Interaction) {
    if interaction.outcome != Outcome::Success {
        return;
    }
    let state = &mut enterprise.state;
    match interaction.interaction_type {
        InteractionType::ProcurementCooperation => {
            state.innovation_level = bounds::PERCENT.clamp(state.innovation_level + PROCUREMENT_INNOVATION_GAIN);
        }
        InteractionType::ServiceSupply => {
            state.market_share = bounds::UNIT.clamp(state.market_share + SUPPLY_MARKET_SHARE_GAIN);
        }
        _ => {}
    }
}

fn fold_resident(resident: &mut Resident, interaction: &Interaction) {
    let state = &mut resident.state;
    let trust = &mut resident.attributes.trust_in_government;

    if interaction.outcome == Outcome::Success {
        match interaction.interaction_type {
            InteractionType::ServiceProvision | InteractionType::ServiceRequest => {
                state.satisfaction = bounds::SATISFACTION.clamp(state.satisfaction + SERVICE_SATISFACTION_GAIN);
            }
            InteractionType::DemandResponse => {
                *trust = bounds::PERCENT.clamp(*trust + RESPONSE_TRUST_GAIN);
            }
            InteractionType::ServiceUse => {
                state.service_usage_frequency = bounds::USAGE.clamp(state.service_usage_frequency + SERVICE_USE_GAIN);
            }
            _ => {}
        }
    } else if interaction.outcome.is_negative() {
        state.satisfaction = bounds::SATISFACTION.clamp(state.satisfaction - FAILURE_SATISFACTION_LOSS);
        if interaction.interaction_type == InteractionType::DemandResponse {
            *trust = bounds::PERCENT.clamp(*trust - IGNORED_TRUST_LOSS);
        }
    }
}
