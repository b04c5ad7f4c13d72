//! Decision Providers
//!
//! The driver asks a [`DecisionProvider`] for every agent's decision each
//! round. Providers may fail; the driver then falls back to
//! [`default_decision`].
//!
//! Two providers ship with the crate:
//! - [`OfflineProvider`]: seeded rule-of-thumb choices, no I/O
//! - [`TextDecisionProvider`]: wraps any [`TextBackend`] that turns a prompt
//!   into free-form text, and extracts the JSON decision from the reply

use std::collections::BTreeMap;

use gov_events::{AgentKind, Decision};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::components::{AreaContext, EnvironmentContext};
use crate::error::DecisionError;

/// Everything a provider sees when deciding for one agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionContext {
    pub round: u32,
    pub agent_id: String,
    pub kind: AgentKind,
    pub environment: EnvironmentContext,
    /// Surroundings of a resident's area
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<AreaContext>,
    /// Behavior modifiers installed by policies
    pub behavior_modifiers: BTreeMap<String, f64>,
}

/// Source of agent decisions
pub trait DecisionProvider {
    fn decide(&mut self, ctx: &DecisionContext) -> Result<Decision, DecisionError>;

    fn name(&self) -> &str {
        "provider"
    }
}

const GOVERNMENT_FALLBACKS: [&str; 3] = ["service_provision", "policy_adjustment", "regulation"];
const ENTERPRISE_FALLBACKS: [&str; 3] = ["service_development", "market_expansion", "innovation"];
const RESIDENT_FALLBACKS: [&str; 3] = ["use_service", "provide_feedback", "seek_information"];

/// Role-specific fallback decision. `pick` selects the action (modulo the
/// number of choices), so callers control the randomness.
pub fn default_decision(kind: AgentKind, pick: usize) -> Decision {
    match kind {
        AgentKind::Government => Decision::new(GOVERNMENT_FALLBACKS[pick % 3], "residents")
            .with_field("reason", "Government default action")
            .with_field("expected_outcome", "maintain_stability"),
        AgentKind::Enterprise => Decision::new(ENTERPRISE_FALLBACKS[pick % 3], "residents")
            .with_field("data_usage", "compliant")
            .with_field("innovation_focus", "user_experience"),
        AgentKind::Resident => {
            Decision::new(RESIDENT_FALLBACKS[pick % 3], "government").with_field("concern", "service_quality")
        }
    }
}

/// Extract a decision from free-form model output.
///
/// Looks for a fenced ```json block first, then for the outermost braces.
/// A decision without both `action` and `target` is malformed.
pub fn parse_decision(raw: &str) -> Result<Decision, DecisionError> {
    let raw = raw.trim();
    let json = if let Some(start) = raw.find("```json") {
        let body = &raw[start + "```json".len()..];
        let end = body.find("```").unwrap_or(body.len());
        body[..end].trim()
    } else {
        match (raw.find('{'), raw.rfind('}')) {
            (Some(start), Some(end)) if end > start => &raw[start..=end],
            _ => return Err(DecisionError::Parse("no JSON object in response".to_string())),
        }
    };

    let decision: Decision = serde_json::from_str(json).map_err(|e| DecisionError::Parse(e.to_string()))?;
    if !decision.is_well_formed() {
        return Err(DecisionError::Malformed);
    }
    Ok(decision)
}

/// Rule-of-thumb decisions that need no external service
#[derive(Debug, Clone)]
pub struct OfflineProvider {
    rng: SmallRng,
}

impl OfflineProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn government(&mut self, ctx: &DecisionContext) -> Decision {
        let env = &ctx.environment;
        if env.emergency_status {
            return Decision::new("emergency_response", "residents").with_field("priority", "high");
        }
        if env.system_load > 0.7 {
            return Decision::new("policy_adjustment", "residents").with_field("reason", "high system load");
        }
        let (action, target) = *[
            ("service_provision", "residents"),
            ("service_provision", "residents"),
            ("regulation", "enterprises"),
            ("procurement_cooperation", "enterprises"),
            ("data_sharing", "enterprises"),
        ]
        .choose(&mut self.rng)
        .unwrap_or(&("service_provision", "residents"));
        Decision::new(action, target)
    }

    fn enterprise(&mut self) -> Decision {
        let (action, target) = *[
            ("service_development", "residents"),
            ("service_promotion", "residents"),
            ("project_bidding", "government"),
            ("data_request", "government"),
            ("innovation", "residents"),
        ]
        .choose(&mut self.rng)
        .unwrap_or(&("service_development", "residents"));
        Decision::new(action, target)
    }

    fn resident(&mut self, ctx: &DecisionContext) -> Decision {
        // Residents in well-served areas lean toward digital self-service
        let quality = ctx.area.map(|a| a.service_quality).unwrap_or(0.7);
        let lean = ctx.behavior_modifiers.get("digital_service_usage").copied().unwrap_or(0.0);
        let action = if self.rng.gen::<f64>() < (0.4 * quality + lean).clamp(0.0, 1.0) {
            "use_service"
        } else {
            *["request_service", "provide_feedback", "seek_information"]
                .choose(&mut self.rng)
                .unwrap_or(&"request_service")
        };
        Decision::new(action, "government")
    }
}

impl DecisionProvider for OfflineProvider {
    fn decide(&mut self, ctx: &DecisionContext) -> Result<Decision, DecisionError> {
        let decision = match ctx.kind {
            AgentKind::Government => self.government(ctx),
            AgentKind::Enterprise => self.enterprise(),
            AgentKind::Resident => self.resident(ctx),
        };
        Ok(decision)
    }

    fn name(&self) -> &str {
        "offline"
    }
}

/// Anything that answers a prompt with text
pub trait TextBackend {
    fn complete(&mut self, system: &str, prompt: &str) -> Result<String, DecisionError>;
}

/// Provider that prompts a text backend and parses the reply.
///
/// No backend ships with this crate. Callers supply their own, such as a
/// client for a hosted language model or a recorded transcript.
#[derive(Debug, Clone)]
pub struct TextDecisionProvider<B> {
    backend: B,
    city: String,
}

impl<B: TextBackend> TextDecisionProvider<B> {
    pub fn new(backend: B, city: impl Into<String>) -> Self {
        Self {
            backend,
            city: city.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn prompt(&self, ctx: &DecisionContext) -> Result<String, DecisionError> {
        let context = serde_json::to_string_pretty(ctx).map_err(|e| DecisionError::Failed(e.to_string()))?;
        Ok(format!(
            "You are a {} agent in {}. Current situation:\n{}\n\
             Reply with a JSON object containing at least \"action\" and \"target\".",
            ctx.kind, self.city, context
        ))
    }
}

impl<B: TextBackend> DecisionProvider for TextDecisionProvider<B> {
    fn decide(&mut self, ctx: &DecisionContext) -> Result<Decision, DecisionError> {
        let system = format!("You are a {} agent in a digital governance simulation.", ctx.kind);
        let prompt = self.prompt(ctx)?;
        let reply = self.backend.complete(&system, &prompt)?;
        debug!(agent = ctx.agent_id.as_str(), chars = reply.len(), "text backend replied");
        parse_decision(&reply)
    }

    fn name(&self) -> &str {
        "text"
    }
}
